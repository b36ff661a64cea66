// 配置相关的数据模型，在库和二进制之间共享
use serde::{Deserialize, Serialize};
use std::fmt;

/// 配置后端模式，构造后不可变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigMode {
    /// 本地 TOML 文件
    #[default]
    File,
    /// 远程数据表（带本地文件缓存）
    Relational,
}

impl fmt::Display for ConfigMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigMode::File => write!(f, "file"),
            ConfigMode::Relational => write!(f, "relational"),
        }
    }
}

/// 数据库连接信息
///
/// 内置的 SQLite 驱动只使用 `database`（数据库文件路径），
/// 其余字段留给其他 [`RelationalStore`](crate::data::managers::RelationalStore) 实现。
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
}

fn default_hostname() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

impl ConnectionInfo {
    pub fn new(
        hostname: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            username: username.into(),
            password: password.into(),
            database: database.into(),
        }
    }

    /// 只指定数据库的本地连接
    pub fn local(database: impl Into<String>) -> Self {
        Self::new(default_hostname(), default_port(), "", "", database)
    }
}

// 密码不进日志
impl fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// 日志输出目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
}

/// 日志配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub output: LogOutput,
    /// 日志目录（文件输出时使用，默认 ~/.confstore/logs）
    #[serde(default)]
    pub file_path: Option<String>,
}

/// confstore 设置文件（confstore.toml）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub mode: ConfigMode,
    #[serde(default = "default_folder")]
    pub folder: String,
    #[serde(default = "default_name")]
    pub name: String,
    /// relational 模式必填
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionInfo>,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_folder() -> String {
    "./conf/".to_string()
}

fn default_name() -> String {
    "config".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: ConfigMode::File,
            folder: default_folder(),
            name: default_name(),
            connection: None,
            log: LogConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults_from_empty_toml() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.mode, ConfigMode::File);
        assert_eq!(settings.log.level, LogLevel::Warn);
    }

    #[test]
    fn test_settings_relational_parse() {
        let settings: Settings = toml::from_str(
            r#"
mode = "relational"
folder = "./conf"
name = "app"

[connection]
hostname = "db.internal"
port = 3307
username = "root"
password = "secret"
database = "app.db"

[log]
level = "debug"
format = "json"
output = "both"
"#,
        )
        .unwrap();

        assert_eq!(settings.mode, ConfigMode::Relational);
        let connection = settings.connection.unwrap();
        assert_eq!(connection.port, 3307);
        assert_eq!(connection.database, "app.db");
        assert_eq!(settings.log.level, LogLevel::Debug);
        assert_eq!(settings.log.format, LogFormat::Json);
        assert_eq!(settings.log.output, LogOutput::Both);
    }

    #[test]
    fn test_connection_debug_redacts_password() {
        let info = ConnectionInfo::new("localhost", 3306, "root", "hunter2", "app.db");
        let rendered = format!("{:?}", info);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("app.db"));
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(ConfigMode::File.to_string(), "file");
        assert_eq!(ConfigMode::Relational.to_string(), "relational");
    }
}
