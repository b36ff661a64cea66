//! 配置句柄
//!
//! [`ConfigHandle`] 是读写配置的唯一入口，构造时绑定一种后端：
//!
//! - `File`：`folder/<name>.toml`，直接读写，保留注释
//! - `Relational`：数据表 `<name>.toml`，读取先查
//!   `folder/cache/cached<name>.toml`，未命中再查表并回填缓存
//!
//! relational 句柄构造时会：配置连接并开启空闲断开、幂等建表、注册退出钩子。
//! 钩子只在 [`lifecycle::run_shutdown_hooks`] 被调用时执行，通常由 `main` 持有的
//! [`lifecycle::guard`] 在 drop 时触发；不持有守卫的程序退出时缓存目录不会被清空。
//!
//! # 使用示例
//!
//! ```rust
//! use crate::services::ConfigHandle;
//! use crate::models::ConnectionInfo;
//!
//! let file = ConfigHandle::file("./conf/", "app");
//! file.set_value("server.name", "alpha")?;
//!
//! let remote = ConfigHandle::relational("./conf/", "app", &ConnectionInfo::local("app.db"))?;
//! let retries = remote.get_value("retries")?;
//! ```

mod backend;
pub mod typed;

use crate::core::lifecycle;
use crate::data::managers::{RelationalStore, SqliteManager, TomlManager};
use crate::data::{ConfigError, Result};
use crate::models::{ConfigMode, ConnectionInfo, Settings};
use backend::{Backend, CachedRelationalBackend, FileBackend};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use typed::{ConfigValue, TypedAccess, ValueStore};

/// 配置文件扩展名
pub const CONFIG_EXTENSION: &str = ".toml";
/// 缓存子目录
pub const CACHE_FOLDER: &str = "cache/";
/// 缓存文件名前缀
pub const CACHE_PREFIX: &str = "cached";

/// 配置句柄
pub struct ConfigHandle {
    mode: ConfigMode,
    folder_path: String,
    config_name: String,
    backend: Box<dyn Backend>,
}

impl ConfigHandle {
    /// 创建 TOML 文件句柄
    ///
    /// 不访问磁盘，文件在第一次写入时创建。
    pub fn file(folder_path: &str, config_name: &str) -> Self {
        let folder_path = normalize_folder(folder_path);
        let config_name = normalize_name(config_name);
        let store = TomlManager::new(format!("{folder_path}{config_name}"));

        Self {
            mode: ConfigMode::File,
            folder_path,
            config_name,
            backend: Box::new(FileBackend::new(store)),
        }
    }

    /// 创建数据表句柄（内置 SQLite 驱动）
    ///
    /// 缓存目录只有在调用方持有 [`lifecycle::guard`]（或自行调用
    /// [`lifecycle::run_shutdown_hooks`]）时才会在退出时清空。
    pub fn relational(
        folder_path: &str,
        config_name: &str,
        connection: &ConnectionInfo,
    ) -> Result<Self> {
        let store = SqliteManager::open(connection)?;
        Self::relational_with_store(folder_path, config_name, Arc::new(store))
    }

    /// 创建数据表句柄，使用给定的关系型存储
    ///
    /// 注册的缓存清理钩子同样依赖调用方持有 [`lifecycle::guard`]。
    pub fn relational_with_store(
        folder_path: &str,
        config_name: &str,
        store: Arc<dyn RelationalStore>,
    ) -> Result<Self> {
        let folder_path = normalize_folder(folder_path);
        let config_name = normalize_name(config_name);

        // 缓存永远是文件句柄
        let cache = Self::file(
            &format!("{folder_path}{CACHE_FOLDER}"),
            &format!("{CACHE_PREFIX}{config_name}"),
        );
        let cache_folder = PathBuf::from(cache.folder_path());

        store.set_auto_disconnect(true);
        let relational = CachedRelationalBackend::new(store, &config_name, cache)?;

        let hook_table = config_name.clone();
        lifecycle::on_shutdown(format!("清理缓存 {config_name}"), move || {
            if let Err(e) = backend::purge_cache_folder(&cache_folder) {
                tracing::warn!(table = %hook_table, error = %e, "退出时清理缓存失败");
            }
        });

        tracing::info!(
            table = %config_name,
            cache = %format!("{folder_path}{CACHE_FOLDER}"),
            "配置数据表已就绪"
        );

        Ok(Self {
            mode: ConfigMode::Relational,
            folder_path,
            config_name,
            backend: Box::new(relational),
        })
    }

    /// 按设置文件构造
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        match settings.mode {
            ConfigMode::File => Ok(Self::file(&settings.folder, &settings.name)),
            ConfigMode::Relational => {
                let connection = settings.connection.as_ref().ok_or_else(|| {
                    ConfigError::Settings("relational 模式需要 [connection] 配置".to_string())
                })?;
                Self::relational(&settings.folder, &settings.name, connection)
            }
        }
    }

    /// 读取键对应的字符串值，不存在时返回 `KeyNotFound`
    pub fn get_value(&self, key: &str) -> Result<String> {
        self.backend.get(key)
    }

    /// 写入键值
    pub fn set_value(&self, key: &str, value: &str) -> Result<()> {
        tracing::debug!(mode = %self.mode, config = %self.config_name, key = %key, "写入配置");
        self.backend.set(key, value)
    }

    /// 键是否存在（relational 模式直接查表）
    pub fn has_value(&self, key: &str) -> Result<bool> {
        self.backend.has(key)
    }

    /// 删除键，不存在时返回 `KeyNotFound`
    pub fn remove_value(&self, key: &str) -> Result<()> {
        tracing::debug!(mode = %self.mode, config = %self.config_name, key = %key, "删除配置");
        self.backend.remove(key)
    }

    /// 清空缓存目录（仅 relational 模式有效）
    pub fn clear_cache(&self) -> Result<()> {
        self.backend.clear_cache()
    }

    pub fn mode(&self) -> ConfigMode {
        self.mode
    }

    /// 以 `/` 结尾的目录
    pub fn folder_path(&self) -> &str {
        &self.folder_path
    }

    /// 以 `.toml` 结尾的配置名（relational 模式下即表名）
    pub fn config_name(&self) -> &str {
        &self.config_name
    }

    /// 文档路径 `folder/config_name`
    pub fn file_path(&self) -> PathBuf {
        Path::new(&self.folder_path).join(&self.config_name)
    }

    /// relational 模式的缓存句柄
    pub fn cache(&self) -> Option<&ConfigHandle> {
        self.backend.cache()
    }
}

impl ValueStore for ConfigHandle {
    fn get_value(&self, key: &str) -> Result<String> {
        self.backend.get(key)
    }

    fn set_value(&self, key: &str, value: &str) -> Result<()> {
        self.backend.set(key, value)
    }

    fn has_value(&self, key: &str) -> Result<bool> {
        self.backend.has(key)
    }

    fn remove_value(&self, key: &str) -> Result<()> {
        self.backend.remove(key)
    }
}

impl std::fmt::Debug for ConfigHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigHandle")
            .field("mode", &self.mode)
            .field("folder_path", &self.folder_path)
            .field("config_name", &self.config_name)
            .field("cache", &self.cache())
            .finish()
    }
}

fn normalize_folder(folder_path: &str) -> String {
    if folder_path.ends_with('/') {
        folder_path.to_string()
    } else {
        format!("{folder_path}/")
    }
}

fn normalize_name(config_name: &str) -> String {
    if config_name.ends_with(CONFIG_EXTENSION) {
        config_name.to_string()
    } else {
        format!("{config_name}{CONFIG_EXTENSION}")
    }
}
