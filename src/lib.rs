//! confstore - 键值配置存储
//!
//! 统一的类型化读写接口，两种后端：
//! - `File`：本地 TOML 文件（保留注释）
//! - `Relational`：SQL 数据表，本地 TOML 文件做读缓存
//!
//! relational 模式的缓存只在退出钩子执行时清空：应用需要在 `main` 中持有
//! [`lifecycle::guard`]，否则缓存文件会保留到下次手动 `clear_cache`。
//!
//! ```rust
//! use confstore::{lifecycle, ConfigHandle, ConnectionInfo, TypedAccess};
//!
//! // 必须最先创建，main 返回时清空缓存目录
//! let _shutdown = lifecycle::guard();
//!
//! let handle = ConfigHandle::file("./conf/", "app");
//! handle.set_i32("retries", 3)?;
//! assert_eq!(handle.get_i32("retries")?, 3);
//!
//! let remote = ConfigHandle::relational("./conf/", "app", &ConnectionInfo::local("app.db"))?;
//! let retries = remote.get_or("retries", 5i32)?;
//! ```

pub mod core; // 核心基础设施层
pub mod data; // 存储层
pub mod models;
pub mod services;
pub mod utils;

pub use crate::core::lifecycle::{self, ShutdownGuard};
pub use crate::core::{init_logger, update_log_level};
pub use crate::data::managers::{RelationalStore, SqliteManager};
pub use crate::data::{ConfigError, ErrorKind, Result};
pub use crate::models::*;
pub use crate::services::{ConfigAccessor, ConfigHandle, ConfigValue, TypedAccess, ValueStore};
pub use crate::utils::config::{load_settings, write_settings};
