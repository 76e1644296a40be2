// ==========================================
// 菜单目录导入引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 餐饮平台目录(菜单)CSV 导入服务
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 外部数据
pub mod importer;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{EntityKind, RollbackAction};

// 领域实体
pub use domain::{
    Category, ImportBatch, ImportOutcome, Item, ItemSize, Modifier, ModifierGroup, RollbackOp,
};

// 导入接口
pub use importer::{CatalogImportCoordinator, CatalogImporter, ImportError, ImportResult};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "菜单目录导入引擎";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
