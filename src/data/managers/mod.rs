//! 存储管理器实现
//!
//! - `toml`: TOML 文档管理器（保留注释和格式）
//! - `sqlite`: 关系型存储接口和 SQLite 实现（参数绑定、空闲断开）

pub mod sqlite;
pub mod toml;

pub use sqlite::{quote_identifier, QueryRow, RelationalStore, SqliteManager};
pub use toml::{TomlDocument, TomlManager};
