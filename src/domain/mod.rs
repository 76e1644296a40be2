// ==========================================
// 菜单目录导入引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、导入行中间结构、补偿日志类型
// 红线: 不含数据访问逻辑,不含导入引擎逻辑
// ==========================================

pub mod catalog;
pub mod import_row;
pub mod rollback;
pub mod types;

// 重导出核心类型
pub use catalog::{
    Category, Item, ItemSize, Modifier, ModifierGroup, ModifierGroupAssignment, ModifierOverride,
    PriceBySize, PriceBySizeCode,
};
pub use import_row::{
    CategoryRow, ItemModifierOverrideRow, ItemRow, ItemSizeRow, ModifierGroupRow, ModifierRow,
    ParsedImportData,
};
pub use rollback::{ImportBatch, ImportOutcome, RollbackOp};
pub use types::{EntityKind, RollbackAction};
