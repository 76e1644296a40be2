// ==========================================
// 菜单目录导入引擎 - 导入层
// ==========================================
// 职责: 外部 CSV 数据导入,生成目录实体
// 流程: 文件解析 → 行分类 → 自然键求解 → 事务落库 → 补偿日志
// ==========================================

// 模块声明
pub mod catalog_importer_trait;
pub mod classifier;
pub mod coordinator;
pub mod error;
pub mod file_parser;
pub mod key_index;
pub mod resolver;
pub mod row_parser;

// 重导出核心类型
pub use classifier::RowClassifier;
pub use coordinator::CatalogImportCoordinator;
pub use error::{ImportError, ImportResult};
pub use file_parser::CsvParser;
pub use key_index::NaturalKeyIndex;
pub use resolver::CatalogResolver;

// 重导出 Trait 接口
pub use catalog_importer_trait::CatalogImporter;
