// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 支持环境变量配置日志级别
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 未设置 RUST_LOG 时的缺省过滤器: 本 crate info,依赖降噪到 warn
const DEFAULT_FILTER: &str = "warn,menu_catalog_import=info";

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（缺省: 本 crate info,其余 warn）
///   例如: RUST_LOG=debug 或 RUST_LOG=menu_catalog_import=trace
///
/// # 示例
/// ```no_run
/// use menu_catalog_import::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // 配置日志格式
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();
}

/// 初始化测试环境的日志系统
///
/// 本 crate 放到 debug 级,便于排查导入步骤;依赖仍然降噪
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("warn,menu_catalog_import=debug"))
        .with_test_writer()
        .try_init();
}
