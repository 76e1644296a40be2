// ==========================================
// 菜单目录导入引擎 - 数据仓储层
// ==========================================
// 职责: 数据访问（目录实体 + 补偿日志）
// 红线: Repository 不含业务规则,只做数据 CRUD
// ==========================================

pub mod catalog_repo;
pub mod error;
pub mod rollback_log_repo;
pub mod schema;

pub use error::{RepositoryError, RepositoryResult};
pub use rollback_log_repo::RollbackLogRepository;
pub use schema::init_schema;
