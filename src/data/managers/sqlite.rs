//! 关系型存储接口与 SQLite 实现
//!
//! [`RelationalStore`] 是配置句柄消费的窄接口：执行语句、查询行集、
//! 引用标识符、开启空闲断开。[`SqliteManager`] 是内置实现：
//! - 单连接 + Mutex
//! - 空闲超时自动断开，下次使用时透明重连
//! - 所有值通过参数绑定，只有表名经 [`quote_identifier`] 拼接
//!
//! # 使用示例
//!
//! ```rust
//! use crate::data::managers::{RelationalStore, SqliteManager};
//! use crate::models::ConnectionInfo;
//!
//! let store = SqliteManager::open(&ConnectionInfo::local("app.db"))?;
//! store.set_auto_disconnect(true);
//!
//! store.execute("CREATE TABLE IF NOT EXISTS t (k TEXT, v TEXT)", &[])?;
//! store.execute("INSERT INTO t (k, v) VALUES (?, ?)", &["a", "1"])?;
//! let rows = store.query("SELECT v FROM t WHERE k = ?", &["a"])?;
//! ```

use crate::data::{ConfigError, Result};
use crate::models::ConnectionInfo;
use rusqlite::{params_from_iter, Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// 默认空闲超时
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// 关系型存储接口
///
/// 实现者负责连接管理：开启自动断开后，空闲连接可以被关闭，
/// 但下一次调用必须透明重连。
pub trait RelationalStore: Send + Sync {
    /// 开启/关闭空闲自动断开
    fn set_auto_disconnect(&self, enabled: bool);

    /// 执行 DDL/DML，返回受影响的行数
    fn execute(&self, sql: &str, params: &[&str]) -> Result<usize>;

    /// 执行查询
    fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<QueryRow>>;

    /// 引用表名等标识符，防止注入
    fn quote_identifier(&self, name: &str) -> String {
        quote_identifier(name)
    }
}

/// 查询结果行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRow {
    pub columns: Vec<String>,
    pub values: Vec<Option<String>>,
}

impl QueryRow {
    /// 按列名取值（NULL 返回 None）
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.values.get(idx)?.as_deref()
    }
}

/// 双引号引用标识符，内部的双引号加倍
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

struct ConnectionState {
    conn: Option<Connection>,
    last_used: Instant,
}

/// SQLite 存储
pub struct SqliteManager {
    state: Mutex<ConnectionState>,
    /// 数据库路径（用于重连和错误报告）
    db_path: PathBuf,
    auto_disconnect: AtomicBool,
    idle_timeout: Duration,
}

impl SqliteManager {
    /// 按连接信息打开数据库
    ///
    /// `database` 为数据库文件路径（或 `:memory:`）。主机、端口和账号
    /// 对 SQLite 没有意义，仅记录日志。
    pub fn open(info: &ConnectionInfo) -> Result<Self> {
        tracing::info!(
            hostname = %info.hostname,
            port = info.port,
            username = %info.username,
            database = %info.database,
            "打开 SQLite 配置数据库"
        );
        Self::open_path(Path::new(&info.database))
    }

    /// 直接按路径打开
    pub fn open_path(path: &Path) -> Result<Self> {
        let conn = Self::open_connection(path)?;
        Ok(Self {
            state: Mutex::new(ConnectionState {
                conn: Some(conn),
                last_used: Instant::now(),
            }),
            db_path: path.to_path_buf(),
            auto_disconnect: AtomicBool::new(false),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        })
    }

    /// 设置空闲超时
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// 打开数据库连接
    fn open_connection(path: &Path) -> Result<Connection> {
        // 创建父目录
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
            }
        }

        Connection::open(path).map_err(ConfigError::Database)
    }

    fn is_memory(&self) -> bool {
        self.db_path.as_os_str() == ":memory:"
    }

    fn idle_expired(&self, state: &ConnectionState) -> bool {
        // 内存数据库断开即丢数据，不参与空闲断开
        self.auto_disconnect.load(Ordering::Relaxed)
            && !self.is_memory()
            && state.conn.is_some()
            && state.last_used.elapsed() > self.idle_timeout
    }

    /// 在连接上执行操作，必要时先断开空闲连接再重连
    fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let mut state = self
            .state
            .lock()
            .map_err(|e| ConfigError::Concurrency(e.to_string()))?;

        if self.idle_expired(&state) {
            tracing::debug!(path = %self.db_path.display(), "连接空闲超时，断开");
            state.conn = None;
        }

        let conn = match state.conn.take() {
            Some(conn) => conn,
            None => {
                tracing::debug!(path = %self.db_path.display(), "重新连接数据库");
                Self::open_connection(&self.db_path)?
            }
        };

        let result = f(&conn).map_err(ConfigError::Database);
        state.conn = Some(conn);
        state.last_used = Instant::now();
        result
    }

    /// 空闲超时则断开连接，返回是否断开
    pub fn disconnect_if_idle(&self) -> bool {
        match self.state.lock() {
            Ok(mut state) if self.idle_expired(&state) => {
                state.conn = None;
                tracing::debug!(path = %self.db_path.display(), "空闲连接已断开");
                true
            }
            _ => false,
        }
    }

    /// 当前是否持有连接
    pub fn is_connected(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.conn.is_some())
            .unwrap_or(false)
    }

    /// 检查表是否存在
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let count: i64 = self.with_connection(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                [table_name],
                |row| row.get(0),
            )
        })?;

        Ok(count > 0)
    }

    /// 获取数据库路径
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// 将 rusqlite::Row 转换为 QueryRow
    fn row_to_query_row(row: &Row, column_names: &[String]) -> rusqlite::Result<QueryRow> {
        let mut values = Vec::with_capacity(column_names.len());

        for i in 0..column_names.len() {
            values.push(Self::get_value_as_text(row, i)?);
        }

        Ok(QueryRow {
            columns: column_names.to_vec(),
            values,
        })
    }

    /// 从 Row 中获取文本值
    fn get_value_as_text(row: &Row, idx: usize) -> rusqlite::Result<Option<String>> {
        use rusqlite::types::ValueRef;

        Ok(match row.get_ref(idx)? {
            ValueRef::Null => None,
            ValueRef::Integer(i) => Some(i.to_string()),
            ValueRef::Real(f) => Some(f.to_string()),
            ValueRef::Text(s) | ValueRef::Blob(s) => Some(String::from_utf8_lossy(s).into_owned()),
        })
    }
}

impl RelationalStore for SqliteManager {
    fn set_auto_disconnect(&self, enabled: bool) {
        self.auto_disconnect.store(enabled, Ordering::Relaxed);
    }

    fn execute(&self, sql: &str, params: &[&str]) -> Result<usize> {
        self.with_connection(|conn| conn.execute(sql, params_from_iter(params.iter())))
    }

    fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<QueryRow>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(sql)?;

            // 获取列名
            let column_names: Vec<String> =
                stmt.column_names().iter().map(|s| s.to_string()).collect();

            let rows = stmt
                .query_map(params_from_iter(params.iter()), |row| {
                    Self::row_to_query_row(row, &column_names)
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}

impl std::fmt::Debug for SqliteManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteManager")
            .field("db_path", &self.db_path)
            .field("auto_disconnect", &self.auto_disconnect.load(Ordering::Relaxed))
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_db() -> (TempDir, SqliteManager) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let manager = SqliteManager::open_path(&db_path).unwrap();

        manager
            .execute(
                "CREATE TABLE entries (key TEXT, value TEXT, UNIQUE(key))",
                &[],
            )
            .unwrap();

        (temp_dir, manager)
    }

    #[test]
    fn test_open_creates_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("app.db");
        let info = ConnectionInfo::local(db_path.to_string_lossy());

        let manager = SqliteManager::open(&info).unwrap();
        assert!(manager.db_path().exists());
        assert!(manager.is_connected());
    }

    #[test]
    fn test_execute_and_query() {
        let (_temp_dir, manager) = create_test_db();

        let affected = manager
            .execute(
                "INSERT INTO entries (key, value) VALUES (?, ?)",
                &["retries", "3"],
            )
            .unwrap();
        assert_eq!(affected, 1);

        let rows = manager
            .query("SELECT * FROM entries WHERE key = ?", &["retries"])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].columns, vec!["key", "value"]);
        assert_eq!(rows[0].get("value"), Some("3"));
        assert_eq!(rows[0].get("missing"), None);
    }

    #[test]
    fn test_non_text_values_become_text() {
        let (_temp_dir, manager) = create_test_db();

        let rows = manager
            .query("SELECT 42 AS n, 1.5 AS f, NULL AS z", &[])
            .unwrap();
        assert_eq!(rows[0].get("n"), Some("42"));
        assert_eq!(rows[0].get("f"), Some("1.5"));
        assert_eq!(rows[0].get("z"), None);
    }

    #[test]
    fn test_values_are_bound_not_interpolated() {
        let (_temp_dir, manager) = create_test_db();

        let hostile = "x'); DROP TABLE entries; --";
        manager
            .execute(
                "INSERT INTO entries (key, value) VALUES (?, ?)",
                &[hostile, hostile],
            )
            .unwrap();

        assert!(manager.table_exists("entries").unwrap());
        let rows = manager
            .query("SELECT value FROM entries WHERE key = ?", &[hostile])
            .unwrap();
        assert_eq!(rows[0].get("value"), Some(hostile));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("app.toml"), "\"app.toml\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_quoted_table_name_with_dot() {
        let (_temp_dir, manager) = create_test_db();
        let table = quote_identifier("app.toml");

        manager
            .execute(
                &format!("CREATE TABLE IF NOT EXISTS {table} (\"key\" TEXT, \"value\" TEXT)"),
                &[],
            )
            .unwrap();
        assert!(manager.table_exists("app.toml").unwrap());
    }

    #[test]
    fn test_auto_disconnect_and_reconnect() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("idle.db");
        let manager = SqliteManager::open_path(&db_path)
            .unwrap()
            .with_idle_timeout(Duration::from_millis(10));
        manager
            .execute("CREATE TABLE t (v TEXT)", &[])
            .unwrap();
        manager.execute("INSERT INTO t (v) VALUES (?)", &["a"]).unwrap();

        // 未开启自动断开时不断开
        std::thread::sleep(Duration::from_millis(30));
        assert!(!manager.disconnect_if_idle());
        assert!(manager.is_connected());

        manager.set_auto_disconnect(true);
        std::thread::sleep(Duration::from_millis(30));
        assert!(manager.disconnect_if_idle());
        assert!(!manager.is_connected());

        // 下一次调用透明重连
        let rows = manager.query("SELECT v FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(manager.is_connected());
    }

    #[test]
    fn test_memory_database_never_idles_out() {
        let manager = SqliteManager::open_path(Path::new(":memory:"))
            .unwrap()
            .with_idle_timeout(Duration::from_millis(1));
        manager.set_auto_disconnect(true);
        manager.execute("CREATE TABLE t (v TEXT)", &[]).unwrap();

        std::thread::sleep(Duration::from_millis(10));
        assert!(!manager.disconnect_if_idle());
        assert!(manager.query("SELECT v FROM t", &[]).unwrap().is_empty());
    }
}
