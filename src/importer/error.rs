// ==========================================
// 菜单目录导入引擎 - 导入模块错误类型
// ==========================================
// 依据: Rust 错误处理最佳实践
// 工具: thiserror 派生宏
// ==========================================
// 错误分级（与传播策略对应）:
// - 结构/文件错误: 任何数据库写入前抛出
// - 引用完整性错误(ValidationError): 求解中途抛出,整个事务 abort
// - 数据库/意外错误: 同样 abort,不捕获不续跑
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("不支持 ZIP 压缩包上传,请直接上传单个 CSV 文件: {0}")]
    ZipNotSupported(String),

    #[error("文件格式不支持: {0}（仅支持 .csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 字段解析错误 =====
    #[error("JSON 列解析失败 (行 {row}, 字段 {field}): {message}")]
    JsonFieldError {
        row: usize,
        field: String,
        message: String,
    },

    // ===== 引用完整性错误（自然键无法解析,整批失败）=====
    #[error("{0}")]
    ValidationError(String),

    // ===== 撤销命令错误 =====
    #[error("导入批次未找到: {0}")]
    BatchNotFound(String),

    #[error("导入批次已撤销: {0}")]
    BatchAlreadyUndone(String),

    // ===== 数据库错误 =====
    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<serde_json::Error>（快照序列化等内部 JSON 操作）
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::InternalError(format!("JSON 序列化失败: {}", err))
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>（经由仓储层分类）
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Repository(RepositoryError::from(err))
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

/// 加料组自然键无法解析时的契约错误文案（API 层透传给前端）
pub const ERR_MODIFIER_GROUP_NOT_FOUND: &str = "Modifier group not found. Import groups first.";

/// 菜品所属分类无法解析时的契约错误文案（API 层透传给前端）
pub const ERR_CATEGORY_NOT_FOUND: &str = "Category not found for this item. Import categories first.";

/// 覆盖行菜品自然键无法解析时的契约错误文案（API 层透传给前端）
pub const ERR_ITEM_NOT_FOUND: &str = "Item not found for override row. Import items first.";
