// ==========================================
// 菜单目录导入引擎 - 字段解析器实现
// ==========================================
// 职责: 原始行记录 → 类型化导入行 DTO
// 约定:
// - 列名按小写匹配（表头已在文件解析阶段小写化）,支持同义列名
// - 数值列: 列存在但解析失败 → 0 兜底；列缺失 → None
// - 布尔列: trim 后 ∈ {"true","1","yes"} 为真；列缺失/空 → None
// - JSON 列(quantity_levels/prices_by_size): 解析失败 → 整个文件报错
// ==========================================

use crate::domain::catalog::PriceBySizeCode;
use crate::domain::import_row::{
    CategoryRow, ItemModifierOverrideRow, ItemRow, ItemSizeRow, ModifierGroupRow, ModifierRow,
};
use crate::importer::error::{ImportError, ImportResult};
use std::collections::HashMap;

// ==========================================
// 同义列名表
// ==========================================
// 分类器与字段解析共用,全部小写

pub const COLS_NAME: &[&str] = &["name"];
pub const COLS_SIZE_CODE: &[&str] = &["code", "size_code", "sizecode"];
pub const COLS_GROUP_REF: &[&str] = &["group_key", "modifier_group_name", "group_name", "group"];
pub const COLS_MODIFIER_KEY: &[&str] = &["modifier_key", "modifierkey", "modifier key"];
pub const COLS_ITEM_KEY: &[&str] = &["item_key", "item_name", "itemkey", "item"];
pub const COLS_DISPLAY_TYPE: &[&str] = &["display_type", "displaytype", "display type"];
pub const COLS_DISPLAY_NAME: &[&str] = &["display_name", "displayname", "display name"];
pub const COLS_MIN_SELECT: &[&str] = &["min_select", "minselect", "min select"];
pub const COLS_MAX_SELECT: &[&str] = &["max_select", "maxselect", "max select"];
pub const COLS_MAX_QUANTITY: &[&str] = &["max_quantity", "maxquantity", "max quantity"];
pub const COLS_DESCRIPTION: &[&str] = &["description", "desc"];
pub const COLS_SORT_ORDER: &[&str] = &["sort_order", "sortorder", "sort order"];
pub const COLS_DISPLAY_ORDER: &[&str] = &["display_order", "displayorder", "display order"];
pub const COLS_IS_ACTIVE: &[&str] = &["is_active", "isactive", "active"];
pub const COLS_CATEGORY_NAME: &[&str] = &["category_name", "categoryname", "category"];
pub const COLS_CATEGORY_ID: &[&str] = &["category_id", "categoryid"];
pub const COLS_BASE_PRICE: &[&str] = &["base_price", "baseprice", "price"];
pub const COLS_IS_SIZEABLE: &[&str] = &["is_sizeable", "issizeable", "sizeable"];
pub const COLS_DEFAULT_SIZE_CODE: &[&str] =
    &["default_size_code", "defaultsizecode", "default size code"];
pub const COLS_QUANTITY_LEVELS: &[&str] = &["quantity_levels", "quantitylevels", "quantity levels"];
pub const COLS_PRICES_BY_SIZE: &[&str] = &["prices_by_size", "pricesbysize", "prices by size"];
pub const COLS_PARENT: &[&str] = &["parent"];

// ==========================================
// RawRow - 原始行记录的读取视图
// ==========================================
pub struct RawRow<'a> {
    map: &'a HashMap<String, String>,
    pub row_number: usize,
}

impl<'a> RawRow<'a> {
    pub fn new(map: &'a HashMap<String, String>, row_number: usize) -> Self {
        Self { map, row_number }
    }

    /// 按同义列名取第一个非空值
    pub fn get(&self, aliases: &[&str]) -> Option<&str> {
        for alias in aliases {
            if let Some(v) = self.map.get(*alias) {
                let trimmed = v.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed);
                }
            }
        }
        None
    }

    /// 同义列名中任一列是否存在（值可为空,用于分类谓词）
    pub fn has_column(&self, aliases: &[&str]) -> bool {
        aliases.iter().any(|alias| self.map.contains_key(*alias))
    }

    pub fn get_string(&self, aliases: &[&str]) -> Option<String> {
        self.get(aliases).map(|v| v.to_string())
    }

    /// 整数列: 值存在时解析,解析失败兜底为 0
    pub fn parse_i64(&self, aliases: &[&str]) -> Option<i64> {
        self.get(aliases).map(|v| v.parse::<i64>().unwrap_or(0))
    }

    /// 浮点列: 值存在时解析,解析失败兜底为 0
    pub fn parse_f64(&self, aliases: &[&str]) -> Option<f64> {
        self.get(aliases).map(|v| v.parse::<f64>().unwrap_or(0.0))
    }

    /// 布尔列: trim 后 ∈ {"true","1","yes"} 为真
    pub fn parse_bool(&self, aliases: &[&str]) -> Option<bool> {
        self.get(aliases)
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
    }

    /// JSON 列: 解析失败向上传播（该文件整体报错）
    pub fn parse_json(&self, aliases: &[&str], field: &str) -> ImportResult<Option<serde_json::Value>> {
        match self.get(aliases) {
            None => Ok(None),
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|e| ImportError::JsonFieldError {
                    row: self.row_number,
                    field: field.to_string(),
                    message: e.to_string(),
                }),
        }
    }

    /// prices_by_size 列: JSON 数组,条目以 size_code 引用规格
    pub fn parse_prices_by_size(&self) -> ImportResult<Option<Vec<PriceBySizeCode>>> {
        match self.get(COLS_PRICES_BY_SIZE) {
            None => Ok(None),
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|e| ImportError::JsonFieldError {
                    row: self.row_number,
                    field: "prices_by_size".to_string(),
                    message: e.to_string(),
                }),
        }
    }
}

// ==========================================
// 按实体类别的行解析
// ==========================================

/// 分类行: name 为必填,缺失返回 None（该行跳过）
pub fn parse_category_row(row: &RawRow) -> Option<CategoryRow> {
    let name = row.get_string(COLS_NAME)?;
    Some(CategoryRow {
        name,
        description: row.get_string(COLS_DESCRIPTION),
        sort_order: row.parse_i64(COLS_SORT_ORDER),
        is_active: row.parse_bool(COLS_IS_ACTIVE),
        row_number: row.row_number,
    })
}

/// 规格行: code 为必填（规格识别列）
pub fn parse_item_size_row(row: &RawRow) -> Option<ItemSizeRow> {
    let code = row.get_string(COLS_SIZE_CODE)?;
    Some(ItemSizeRow {
        code,
        name: row.get_string(COLS_NAME),
        display_order: row.parse_i64(COLS_DISPLAY_ORDER),
        is_active: row.parse_bool(COLS_IS_ACTIVE),
        row_number: row.row_number,
    })
}

/// 加料组行: name 为必填；JSON 定价列解析失败向上传播
pub fn parse_modifier_group_row(row: &RawRow) -> ImportResult<Option<ModifierGroupRow>> {
    let name = match row.get_string(COLS_NAME) {
        Some(v) => v,
        None => return Ok(None),
    };
    Ok(Some(ModifierGroupRow {
        name,
        display_name: row.get_string(COLS_DISPLAY_NAME),
        display_type: row.get_string(COLS_DISPLAY_TYPE),
        min_select: row.parse_i64(COLS_MIN_SELECT),
        max_select: row.parse_i64(COLS_MAX_SELECT),
        sort_order: row.parse_i64(COLS_SORT_ORDER),
        is_active: row.parse_bool(COLS_IS_ACTIVE),
        quantity_levels: row.parse_json(COLS_QUANTITY_LEVELS, "quantity_levels")?,
        prices_by_size: row.parse_prices_by_size()?,
        row_number: row.row_number,
    }))
}

/// 加料项行: 组引用 + name 为必填（通用格式下组引用来自 parent 列）
pub fn parse_modifier_row(row: &RawRow) -> Option<ModifierRow> {
    let group_key = row
        .get_string(COLS_GROUP_REF)
        .or_else(|| row.get_string(COLS_PARENT))?;
    let name = row.get_string(COLS_NAME)?;
    Some(ModifierRow {
        group_key,
        name,
        modifier_key: row.get_string(COLS_MODIFIER_KEY),
        display_order: row.parse_i64(COLS_DISPLAY_ORDER),
        is_active: row.parse_bool(COLS_IS_ACTIVE),
        max_quantity: row.parse_i64(COLS_MAX_QUANTITY),
        row_number: row.row_number,
    })
}

/// 菜品行: name 为必填（通用格式下分类名来自 parent 列）
pub fn parse_item_row(row: &RawRow) -> Option<ItemRow> {
    let name = row.get_string(COLS_NAME)?;
    Some(ItemRow {
        name,
        category_id: row.get_string(COLS_CATEGORY_ID),
        category_name: row
            .get_string(COLS_CATEGORY_NAME)
            .or_else(|| row.get_string(COLS_PARENT)),
        description: row.get_string(COLS_DESCRIPTION),
        sort_order: row.parse_i64(COLS_SORT_ORDER),
        is_active: row.parse_bool(COLS_IS_ACTIVE),
        base_price: row.parse_f64(COLS_BASE_PRICE),
        is_sizeable: row.parse_bool(COLS_IS_SIZEABLE),
        default_size_code: row.get_string(COLS_DEFAULT_SIZE_CODE),
        row_number: row.row_number,
    })
}

/// 菜品加料覆盖行: 三元自然键全部必填
pub fn parse_override_row(row: &RawRow) -> ImportResult<Option<ItemModifierOverrideRow>> {
    let (item_key, group_key, modifier_key) = match (
        row.get_string(COLS_ITEM_KEY),
        row.get_string(COLS_GROUP_REF),
        row.get_string(COLS_MODIFIER_KEY),
    ) {
        (Some(i), Some(g), Some(m)) => (i, g, m),
        _ => return Ok(None),
    };
    Ok(Some(ItemModifierOverrideRow {
        item_key,
        group_key,
        modifier_key,
        prices_by_size: row.parse_prices_by_size()?,
        quantity_levels: row.parse_json(COLS_QUANTITY_LEVELS, "quantity_levels")?,
        row_number: row.row_number,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_of(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_numeric_zero_fallback_on_garbage() {
        let map = row_of(&[("name", "Toppings"), ("min_select", "abc"), ("max_select", "3")]);
        let raw = RawRow::new(&map, 1);
        assert_eq!(raw.parse_i64(COLS_MIN_SELECT), Some(0));
        assert_eq!(raw.parse_i64(COLS_MAX_SELECT), Some(3));
    }

    #[test]
    fn test_numeric_absent_is_none() {
        let map = row_of(&[("name", "Toppings")]);
        let raw = RawRow::new(&map, 1);
        assert_eq!(raw.parse_i64(COLS_MIN_SELECT), None);
        assert_eq!(raw.parse_f64(COLS_BASE_PRICE), None);
    }

    #[test]
    fn test_bool_true_variants() {
        for v in ["true", "1", "yes", "TRUE", "Yes"] {
            let map = row_of(&[("is_active", v)]);
            let raw = RawRow::new(&map, 1);
            assert_eq!(raw.parse_bool(COLS_IS_ACTIVE), Some(true), "value: {}", v);
        }
        for v in ["false", "0", "no", "on"] {
            let map = row_of(&[("is_active", v)]);
            let raw = RawRow::new(&map, 1);
            assert_eq!(raw.parse_bool(COLS_IS_ACTIVE), Some(false), "value: {}", v);
        }
    }

    #[test]
    fn test_column_synonyms_display_type() {
        for col in ["display_type", "displaytype", "display type"] {
            let map = row_of(&[(col, "multi")]);
            let raw = RawRow::new(&map, 1);
            assert_eq!(raw.get_string(COLS_DISPLAY_TYPE), Some("multi".to_string()));
        }
    }

    #[test]
    fn test_prices_by_size_json() {
        let map = row_of(&[
            ("name", "Toppings"),
            ("prices_by_size", r#"[{"size_code":"L","price":2.5}]"#),
        ]);
        let raw = RawRow::new(&map, 1);
        let parsed = raw.parse_prices_by_size().unwrap().unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].size_code, "L");
        assert_eq!(parsed[0].price, 2.5);
    }

    #[test]
    fn test_prices_by_size_camel_case_alias() {
        let map = row_of(&[("prices_by_size", r#"[{"sizeCode":"M","price":1.0}]"#)]);
        let raw = RawRow::new(&map, 1);
        let parsed = raw.parse_prices_by_size().unwrap().unwrap();
        assert_eq!(parsed[0].size_code, "M");
    }

    #[test]
    fn test_malformed_json_propagates() {
        let map = row_of(&[("quantity_levels", "{not json")]);
        let raw = RawRow::new(&map, 7);
        let err = raw
            .parse_json(COLS_QUANTITY_LEVELS, "quantity_levels")
            .unwrap_err();
        assert!(matches!(err, ImportError::JsonFieldError { row: 7, .. }));
    }

    #[test]
    fn test_parse_item_row_parent_as_category() {
        let map = row_of(&[("name", "Burger"), ("parent", "Mains")]);
        let raw = RawRow::new(&map, 2);
        let item = parse_item_row(&raw).unwrap();
        assert_eq!(item.category_name, Some("Mains".to_string()));
    }

    #[test]
    fn test_parse_modifier_row_requires_group_and_name() {
        let map = row_of(&[("name", "Cheese")]);
        let raw = RawRow::new(&map, 3);
        assert!(parse_modifier_row(&raw).is_none());

        let map = row_of(&[("name", "Cheese"), ("group_key", "Toppings")]);
        let raw = RawRow::new(&map, 3);
        let parsed = parse_modifier_row(&raw).unwrap();
        assert_eq!(parsed.group_key, "Toppings");
        assert_eq!(parsed.key(), "Cheese"); // modifier_key 缺省回退 name
    }

    #[test]
    fn test_parse_category_row_skips_empty_name() {
        let map = row_of(&[("name", ""), ("description", "x")]);
        let raw = RawRow::new(&map, 4);
        assert!(parse_category_row(&raw).is_none());
    }
}
