//! 配置后端
//!
//! 构造时选定一次后端，之后的读写不再判断模式：
//! - [`FileBackend`]: 直接读写 TOML 文档
//! - [`CachedRelationalBackend`]: 读数据表，本地 TOML 文件做读缓存

use super::ConfigHandle;
use crate::core::lifecycle;
use crate::data::managers::{RelationalStore, TomlManager};
use crate::data::{ConfigError, ErrorKind, Result};
use std::path::Path;
use std::sync::Arc;

pub(crate) trait Backend: Send + Sync {
    fn get(&self, key: &str) -> Result<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn has(&self, key: &str) -> Result<bool>;
    fn remove(&self, key: &str) -> Result<()>;

    fn clear_cache(&self) -> Result<()> {
        Ok(())
    }

    fn cache(&self) -> Option<&ConfigHandle> {
        None
    }
}

/// TOML 文件后端
pub(crate) struct FileBackend {
    store: TomlManager,
}

impl FileBackend {
    pub(crate) fn new(store: TomlManager) -> Self {
        Self { store }
    }
}

impl Backend for FileBackend {
    fn get(&self, key: &str) -> Result<String> {
        check_key(key)?;

        if !self.store.exists() {
            return Err(ConfigError::KeyNotFound(key.to_string()));
        }

        self.store
            .load()?
            .get(key)?
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        check_key(key)?;

        if !self.store.exists() {
            self.store.create(true)?;
        }

        let mut doc = self.store.load()?;
        doc.set(key, value)?;
        self.store.save(&doc)
    }

    fn has(&self, key: &str) -> Result<bool> {
        check_key(key)?;

        if !self.store.exists() {
            return Ok(false);
        }

        self.store.load()?.contains(key)
    }

    fn remove(&self, key: &str) -> Result<()> {
        check_key(key)?;

        if !self.store.exists() {
            return Err(ConfigError::KeyNotFound(key.to_string()));
        }

        let mut doc = self.store.load()?;
        if !doc.remove(key)? {
            return Err(ConfigError::KeyNotFound(key.to_string()));
        }
        self.store.save(&doc)
    }
}

/// 预先拼好的语句，表名只引用一次
struct Statements {
    create: String,
    select: String,
    upsert: String,
    delete: String,
}

impl Statements {
    fn new(table: &str) -> Self {
        Self {
            create: format!(
                "CREATE TABLE IF NOT EXISTS {table} (\"key\" TEXT, \"value\" TEXT, UNIQUE(\"key\"))"
            ),
            select: format!("SELECT \"value\" FROM {table} WHERE \"key\" = ?"),
            upsert: format!(
                "INSERT INTO {table} (\"key\", \"value\") VALUES (?, ?) \
                 ON CONFLICT(\"key\") DO UPDATE SET \"value\" = excluded.\"value\""
            ),
            delete: format!("DELETE FROM {table} WHERE \"key\" = ?"),
        }
    }
}

/// 数据表后端，带本地文件读缓存
///
/// 写入和删除成功后会从缓存中移除该键，下一次读取重新填充。
pub(crate) struct CachedRelationalBackend {
    store: Arc<dyn RelationalStore>,
    table: String,
    statements: Statements,
    cache: ConfigHandle,
}

impl CachedRelationalBackend {
    /// 建表（幂等）并绑定缓存
    pub(crate) fn new(
        store: Arc<dyn RelationalStore>,
        table: &str,
        cache: ConfigHandle,
    ) -> Result<Self> {
        let statements = Statements::new(&store.quote_identifier(table));

        store
            .execute(&statements.create, &[])
            .map_err(|e| ConfigError::SchemaBootstrap {
                table: table.to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            store,
            table: table.to_string(),
            statements,
            cache,
        })
    }

    fn query_value(&self, key: &str) -> Result<Option<String>> {
        let rows = self.store.query(&self.statements.select, &[key])?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.get("value").unwrap_or_default().to_string()))
    }

    /// 从缓存中移除该键
    ///
    /// 单键删除失败时清空整个缓存目录，缓存文件仍然存在则返回错误。
    fn invalidate(&self, key: &str) -> Result<()> {
        let err = match self.cache.remove_value(key) {
            Ok(()) => {
                tracing::trace!(table = %self.table, key = %key, "缓存已失效");
                return Ok(());
            }
            // 不存在或无法作为缓存键，缓存里不会有旧值
            Err(e) if matches!(e.kind(), ErrorKind::KeyNotFound | ErrorKind::InvalidInput) => {
                return Ok(())
            }
            Err(e) => e,
        };

        tracing::warn!(table = %self.table, key = %key, error = %err, "缓存失效失败，清空缓存目录");
        purge_cache_folder(Path::new(self.cache.folder_path()))?;

        if self.cache.file_path().exists() {
            return Err(err);
        }
        Ok(())
    }
}

/// 两种后端都不接受空键
fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(ConfigError::InvalidKey(key.to_string()));
    }
    Ok(())
}

impl Backend for CachedRelationalBackend {
    fn get(&self, key: &str) -> Result<String> {
        check_key(key)?;

        match self.cache.get_value(key) {
            Ok(value) => {
                tracing::trace!(table = %self.table, key = %key, "缓存命中");
                return Ok(value);
            }
            Err(e) if e.is_not_found() => {}
            // 缓存损坏不影响读取，回退到数据库
            Err(e) => tracing::warn!(table = %self.table, key = %key, error = %e, "读取缓存失败"),
        }

        let value = self
            .query_value(key)?
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        if let Err(e) = self.cache.set_value(key, &value) {
            tracing::warn!(table = %self.table, key = %key, error = %e, "写入缓存失败");
        }
        tracing::debug!(table = %self.table, key = %key, "缓存未命中，已从数据库加载");

        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        check_key(key)?;

        self.store.execute(&self.statements.upsert, &[key, value])?;
        self.invalidate(key)
    }

    fn has(&self, key: &str) -> Result<bool> {
        check_key(key)?;

        Ok(self.query_value(key)?.is_some())
    }

    fn remove(&self, key: &str) -> Result<()> {
        check_key(key)?;

        let affected = self.store.execute(&self.statements.delete, &[key])?;
        self.invalidate(key)?;

        if affected == 0 {
            return Err(ConfigError::KeyNotFound(key.to_string()));
        }
        Ok(())
    }

    fn clear_cache(&self) -> Result<()> {
        purge_cache_folder(Path::new(self.cache.folder_path()))?;
        Ok(())
    }

    fn cache(&self) -> Option<&ConfigHandle> {
        Some(&self.cache)
    }
}

/// 删除缓存目录下的所有条目
///
/// 尽力而为：删不掉的条目登记为退出时删除，不返回错误。
/// 目录不存在视为已清空。返回立即删除的条目数。
pub(crate) fn purge_cache_folder(folder: &Path) -> Result<usize> {
    let entries = match std::fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(ConfigError::io(folder, e)),
    };

    let mut removed = 0;
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                tracing::warn!(folder = %folder.display(), error = %e, "读取缓存目录条目失败");
                continue;
            }
        };

        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };

        match result {
            Ok(()) => removed += 1,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "删除缓存失败，退出时重试");
                lifecycle::delete_on_exit(path);
            }
        }
    }

    tracing::debug!(folder = %folder.display(), removed, "缓存目录已清理");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_statements_quote_table_once() {
        let statements = Statements::new("\"app.toml\"");
        assert!(statements.create.starts_with("CREATE TABLE IF NOT EXISTS \"app.toml\""));
        assert!(statements.select.contains("FROM \"app.toml\""));
        assert!(statements.upsert.contains("ON CONFLICT(\"key\")"));
        assert!(statements.delete.starts_with("DELETE FROM \"app.toml\""));
    }

    #[test]
    fn test_file_backend_missing_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("none.toml");
        let backend = FileBackend::new(TomlManager::new(&path));

        assert!(backend.get("a").unwrap_err().is_not_found());
        assert!(!backend.has("a").unwrap());
        assert!(backend.remove("a").unwrap_err().is_not_found());
        assert!(!path.exists());
    }

    #[test]
    fn test_relational_rejects_empty_key() {
        assert!(matches!(check_key(""), Err(ConfigError::InvalidKey(_))));
        assert!(check_key("a").is_ok());
    }

    #[test]
    fn test_purge_missing_folder_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(purge_cache_folder(&temp_dir.path().join("cache")).unwrap(), 0);
    }

    #[test]
    fn test_purge_removes_files_and_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let folder = temp_dir.path().join("cache");
        std::fs::create_dir_all(folder.join("nested")).unwrap();
        std::fs::write(folder.join("cachedapp.toml"), "a = \"1\"").unwrap();
        std::fs::write(folder.join("nested").join("x"), "").unwrap();

        assert_eq!(purge_cache_folder(&folder).unwrap(), 2);
        assert!(folder.exists());
        assert_eq!(std::fs::read_dir(&folder).unwrap().count(), 0);
    }
}
