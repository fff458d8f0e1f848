// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 支持环境变量配置日志级别与输出格式
// 日志统一写 stderr，stdout 留给命令行的 JSON 输出
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 输出格式环境变量（text / json）
pub const LOG_FORMAT_ENV: &str = "INVENTORY_ASSIGN_LOG_FORMAT";

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: info）
///   例如: RUST_LOG=debug 或 RUST_LOG=inventory_assign=trace
/// - INVENTORY_ASSIGN_LOG_FORMAT=json: 输出 JSON 行
///
/// # 示例
/// ```no_run
/// use inventory_assign::logging;
/// logging::init();
/// ```
pub fn init() {
    // 从环境变量读取日志级别，默认为 info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    // 重复初始化时保留已有的全局订阅者
    if let Err(e) = result {
        tracing::debug!(error = %e, "日志系统已初始化，忽略重复初始化");
    }
}

/// 初始化测试环境的日志系统
///
/// 使用更详细的日志级别，便于调试
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_keeps_first_subscriber() {
        init_test();
        init();
        init();
        tracing::info!("repeated init");
    }
}
