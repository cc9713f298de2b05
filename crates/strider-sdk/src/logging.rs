//! 日志初始化
//!
//! 所有库代码都通过 `tracing` 宏记录日志，本模块只负责在应用入口安装订阅者：
//! - `tracing_subscriber::fmt()` 输出到 stderr
//! - `EnvFilter` 读取 `RUST_LOG`，未设置时使用默认指令（`info`）
//! - `tracing_log::LogTracer` 把 `log` crate 的记录桥接到 `tracing`
//!
//! 重复初始化是无害的：第二次调用返回 `false`，不会 panic。

use tracing_subscriber::EnvFilter;

/// 未设置 `RUST_LOG` 时的默认过滤指令
pub const DEFAULT_FILTER: &str = "info";

/// 使用默认过滤指令初始化日志
///
/// 返回是否由本次调用完成安装。
pub fn init_logger() -> bool {
    init_logger_with_filter(DEFAULT_FILTER)
}

/// 使用指定的默认过滤指令初始化日志（`RUST_LOG` 优先）
pub fn init_logger_with_filter(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }
    // `log` 记录交给 tracing 的 EnvFilter 过滤
    let _ = tracing_log::LogTracer::init_with_filter(log::LevelFilter::Trace);
    true
}

/// 初始化日志的便捷宏
///
/// ```no_run
/// // RUST_LOG 未设置时使用 info
/// strider_sdk::init_logger!();
/// // 或者指定默认过滤指令
/// strider_sdk::init_logger!("strider_driver=debug,info");
/// ```
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::logging::init_logger()
    };
    ($filter:expr) => {
        $crate::logging::init_logger_with_filter($filter)
    };
}
