//! 核心基础设施
//!
//! - `logger`: tracing 日志初始化与级别热更新
//! - `lifecycle`: 进程退出钩子

pub mod lifecycle;
pub mod logger;

pub use lifecycle::{guard, on_shutdown, run_shutdown_hooks, ShutdownGuard};
pub use logger::{init_logger, update_log_level};
