//! 统一错误类型定义
//!
//! 使用 `thiserror` 定义配置存储的所有错误类型。每个错误都可以通过
//! [`ConfigError::kind`] 归入 [`ErrorKind`]，调用方据此区分“键不存在”、
//! “值格式错误”和“存储不可用”。

use std::path::PathBuf;
use thiserror::Error;

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 文件或数据库连接不可用
    StorageUnavailable,
    /// 存储的字符串无法解析为目标类型
    MalformedValue,
    /// 读取或删除不存在的键
    KeyNotFound,
    /// 构造时建表/建文件失败
    SchemaBootstrapFailure,
    /// 调用方传入的键或配置无效
    InvalidInput,
}

/// 配置存储的统一错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件 I/O 错误
    #[error("文件 I/O 错误: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 配置文档解析失败（toml_edit）
    #[error("配置文档解析失败: {path}: {message}")]
    Document { path: PathBuf, message: String },

    /// 数据库错误
    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    /// 键不存在
    #[error("未找到键: {0}")]
    KeyNotFound(String),

    /// 值无法解析为请求的类型
    #[error("键 '{key}' 的值 '{raw}' 无法解析为 {expected}")]
    MalformedValue {
        key: String,
        expected: &'static str,
        raw: String,
    },

    /// 建表失败
    #[error("初始化数据表 '{table}' 失败: {source}")]
    SchemaBootstrap {
        table: String,
        #[source]
        source: Box<ConfigError>,
    },

    /// 无效的键路径
    #[error("无效的键路径: {0}")]
    InvalidKey(String),

    /// 设置文件错误
    #[error("设置文件错误: {0}")]
    Settings(String),

    /// 并发错误
    #[error("并发错误: {0}")]
    Concurrency(String),
}

/// 便于与现有代码集成的类型别名
pub type Result<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    /// 从 `std::io::Error` 和路径创建 I/O 错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// 构造值格式错误
    pub fn malformed(key: &str, expected: &'static str, raw: &str) -> Self {
        Self::MalformedValue {
            key: key.to_string(),
            expected,
            raw: raw.to_string(),
        }
    }

    /// 错误所属分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } | Self::Document { .. } | Self::Database(_) | Self::Concurrency(_) => {
                ErrorKind::StorageUnavailable
            }
            Self::MalformedValue { .. } => ErrorKind::MalformedValue,
            Self::KeyNotFound(_) => ErrorKind::KeyNotFound,
            Self::SchemaBootstrap { .. } => ErrorKind::SchemaBootstrapFailure,
            Self::InvalidKey(_) | Self::Settings(_) => ErrorKind::InvalidInput,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::KeyNotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::KeyNotFound("server.name".to_string());
        assert_eq!(err.to_string(), "未找到键: server.name");
    }

    #[test]
    fn test_io_error_construction() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::io("/path/to/file", io_err);
        assert!(err.to_string().contains("/path/to/file"));
        assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
    }

    #[test]
    fn test_malformed_value() {
        let err = ConfigError::malformed("retries", "i32", "three");
        assert_eq!(err.kind(), ErrorKind::MalformedValue);
        assert!(err.to_string().contains("three"));
        assert!(err.to_string().contains("i32"));
    }

    #[test]
    fn test_schema_bootstrap_keeps_source() {
        let inner = ConfigError::Concurrency("poisoned".to_string());
        let err = ConfigError::SchemaBootstrap {
            table: "app.toml".to_string(),
            source: Box::new(inner),
        };
        assert_eq!(err.kind(), ErrorKind::SchemaBootstrapFailure);
        let source = std::error::Error::source(&err).expect("source should be kept");
        assert!(source.to_string().contains("poisoned"));
    }

    #[test]
    fn test_kind_classification() {
        assert!(ConfigError::KeyNotFound("a".into()).is_not_found());
        assert!(!ConfigError::InvalidKey("a..b".into()).is_not_found());
        assert_eq!(
            ConfigError::Settings("missing connection".into()).kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_anyhow_conversion() {
        let err = ConfigError::KeyNotFound("test".to_string());
        let anyhow_err: anyhow::Error = err.into();
        assert!(anyhow_err.to_string().contains("未找到键"));
    }
}
