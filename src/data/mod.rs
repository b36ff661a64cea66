//! 数据存储层
//!
//! 配置句柄所依赖的两种存储：
//!
//! - `error`: 统一错误类型定义
//! - `managers`: TOML 文档管理器和关系型存储（SQLite）
//!
//! # 使用示例
//!
//! ```rust
//! use crate::data::managers::TomlManager;
//!
//! let manager = TomlManager::new("./conf/app.toml");
//! let mut doc = manager.load()?;
//! doc.set("server.name", "alpha")?;
//! manager.save(&doc)?;
//! ```

pub mod error;
pub mod managers;

pub use error::{ConfigError, ErrorKind, Result};
