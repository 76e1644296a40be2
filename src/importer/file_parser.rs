// ==========================================
// 菜单目录导入引擎 - 文件解析器实现
// ==========================================
// 职责: CSV → 原始行记录（HashMap<列名, 值>）
// 约定: 表头统一 trim + 小写,后续分类器/字段解析按小写列名匹配
// 红线: ZIP 压缩包与缺失文件在任何解析/落库前快速失败
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// ZIP 文件魔数（"PK\x03\x04"）
const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 解析 CSV 文件为原始行记录列表
    ///
    /// # 参数
    /// - file_path: CSV 文件路径
    ///
    /// # 返回
    /// - Ok(Vec<HashMap<String, String>>): 行记录列表（表头已小写化）
    /// - Err: 文件缺失 / ZIP 拒绝 / 格式错误
    pub fn parse_to_raw_records(
        &self,
        file_path: &Path,
    ) -> ImportResult<Vec<HashMap<String, String>>> {
        // 检查文件存在
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        // 检查扩展名（.zip 明确拒绝,其余非 .csv 拒绝）
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext == "zip" {
            return Err(ImportError::ZipNotSupported(
                file_path.display().to_string(),
            ));
        }
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let buffer = fs::read(file_path)?;
        self.parse_buffer(&buffer, &file_path.display().to_string())
    }

    /// 解析内存中的文件内容（上传场景: 调用方已持有文件缓冲区）
    ///
    /// # 参数
    /// - buffer: 文件内容（UTF-8 CSV）
    /// - source_name: 来源标识（文件名,仅用于错误信息）
    pub fn parse_buffer(
        &self,
        buffer: &[u8],
        source_name: &str,
    ) -> ImportResult<Vec<HashMap<String, String>>> {
        // 空缓冲区 = 上传缺失
        if buffer.is_empty() {
            return Err(ImportError::FileNotFound(source_name.to_string()));
        }

        // ZIP 魔数嗅探（防止改了扩展名的压缩包混入）
        if buffer.len() >= ZIP_MAGIC.len() && &buffer[..ZIP_MAGIC.len()] == ZIP_MAGIC {
            return Err(ImportError::ZipNotSupported(source_name.to_string()));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(buffer);

        // 读取表头: trim + 小写
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        // 读取所有行
        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row_map = HashMap::new();

            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    row_map.insert(header.clone(), value.trim().to_string());
                }
            }

            // 跳过完全空白的行
            if row_map.values().all(|v| v.is_empty()) {
                continue;
            }

            records.push(row_map);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_csv(content: &str) -> NamedTempFile {
        let mut temp_file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file
    }

    #[test]
    fn test_csv_parser_lowercases_headers() {
        let temp_file = temp_csv("Name,Display_Type,MIN_SELECT\nToppings,multi,0\n");

        let parser = CsvParser;
        let records = parser.parse_to_raw_records(temp_file.path()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("name"), Some(&"Toppings".to_string()));
        assert_eq!(records[0].get("display_type"), Some(&"multi".to_string()));
        assert_eq!(records[0].get("min_select"), Some(&"0".to_string()));
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let parser = CsvParser;
        let result = parser.parse_to_raw_records(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_rejects_zip_extension() {
        let mut temp_file = tempfile::Builder::new().suffix(".zip").tempfile().unwrap();
        temp_file.write_all(b"PK\x03\x04whatever").unwrap();

        let parser = CsvParser;
        let result = parser.parse_to_raw_records(temp_file.path());
        assert!(matches!(result, Err(ImportError::ZipNotSupported(_))));
    }

    #[test]
    fn test_csv_parser_rejects_zip_magic_in_buffer() {
        let parser = CsvParser;
        let result = parser.parse_buffer(b"PK\x03\x04fakecsv", "upload.csv");
        assert!(matches!(result, Err(ImportError::ZipNotSupported(_))));
    }

    #[test]
    fn test_csv_parser_empty_buffer_is_missing_file() {
        let parser = CsvParser;
        let result = parser.parse_buffer(b"", "upload.csv");
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let temp_file = temp_csv("name,price\nBurger,12.5\n,\nPizza,30\n");

        let parser = CsvParser;
        let records = parser.parse_to_raw_records(temp_file.path()).unwrap();

        // 应跳过空行
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_csv_parser_trims_cells() {
        let temp_file = temp_csv("name,parent\n  Burger  , Mains \n");

        let parser = CsvParser;
        let records = parser.parse_to_raw_records(temp_file.path()).unwrap();

        assert_eq!(records[0].get("name"), Some(&"Burger".to_string()));
        assert_eq!(records[0].get("parent"), Some(&"Mains".to_string()));
    }
}
