//! TOML 配置文档管理器
//!
//! 单个 TOML 文件的读写，支持：
//! - 保留注释和格式（使用 `toml_edit`）
//! - 键路径访问（支持嵌套键如 "server.name"）
//! - 自动创建父目录
//! - Unix 权限设置（0o600）
//!
//! 所有值以字符串形式写入；读取时手工编辑的标量（整数、浮点、布尔、日期）
//! 会转换为其文本形式。
//!
//! # 使用示例
//!
//! ```rust
//! use crate::data::managers::TomlManager;
//!
//! let manager = TomlManager::new("conf/app.toml");
//! if !manager.exists() {
//!     manager.create(true)?;
//! }
//!
//! let mut doc = manager.load()?;
//! doc.set("server.name", "alpha")?;
//! manager.save(&doc)?;
//! ```

use crate::data::{ConfigError, Result};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, Item, Table, Value as EditValue};

/// TOML 文档管理器
///
/// 绑定到一个文件路径，使用 `toml_edit` 保留注释和格式。
#[derive(Debug, Clone)]
pub struct TomlManager {
    path: PathBuf,
}

impl TomlManager {
    /// 创建绑定到 `path` 的管理器（不访问磁盘）
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 文件是否存在
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// 创建空文件（已存在时不截断）
    ///
    /// # 参数
    ///
    /// - `with_parent_dirs`: 是否同时创建父目录
    pub fn create(&self, with_parent_dirs: bool) -> Result<()> {
        if with_parent_dirs {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
                }
            }
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ConfigError::io(&self.path, e))?;

        set_permissions(&self.path)
    }

    /// 读取为可编辑文档（保留注释）
    pub fn load(&self) -> Result<TomlDocument> {
        let content = fs::read_to_string(&self.path).map_err(|e| ConfigError::io(&self.path, e))?;

        let doc = content
            .parse::<DocumentMut>()
            .map_err(|e| ConfigError::Document {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        Ok(TomlDocument { doc })
    }

    /// 写回文档
    ///
    /// 自动创建父目录并设置权限（Unix 平台 0o600）。
    pub fn save(&self, doc: &TomlDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
            }
        }

        fs::write(&self.path, doc.doc.to_string()).map_err(|e| ConfigError::io(&self.path, e))?;

        set_permissions(&self.path)
    }
}

/// 已加载的 TOML 文档
#[derive(Debug, Clone, Default)]
pub struct TomlDocument {
    doc: DocumentMut,
}

impl TomlDocument {
    /// 获取键对应的字符串值
    ///
    /// - `Ok(None)`: 键不存在
    /// - `Err(MalformedValue)`: 键指向表或数组
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let key_path = parse_key_path(key)?;

        let item = match get_nested(self.doc.as_table(), &key_path) {
            Some(item) => item,
            None => return Ok(None),
        };

        match item {
            Item::None => Ok(None),
            Item::Value(value) => scalar_to_string(value)
                .map(Some)
                .ok_or_else(|| ConfigError::malformed(key, "scalar", &value.to_string())),
            Item::Table(_) | Item::ArrayOfTables(_) => {
                Err(ConfigError::malformed(key, "scalar", "<table>"))
            }
        }
    }

    /// 设置键对应的值（保留原有的注释装饰）
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let key_path = parse_key_path(key)?;
        set_nested_in_document(&mut self.doc, &key_path, value)
    }

    /// 检查键是否存在
    pub fn contains(&self, key: &str) -> Result<bool> {
        let key_path = parse_key_path(key)?;
        Ok(get_nested(self.doc.as_table(), &key_path).is_some_and(|item| !item.is_none()))
    }

    /// 删除键，返回键是否存在过
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        let key_path = parse_key_path(key)?;
        Ok(delete_nested_in_document(&mut self.doc, &key_path))
    }
}

impl std::fmt::Display for TomlDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.doc)
    }
}

/// 解析键路径
fn parse_key_path(key: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = key.split('.').collect();
    if key.is_empty() || segments.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::InvalidKey(key.to_string()));
    }
    Ok(segments)
}

/// 获取嵌套项（支持标准表和内联表）
fn get_nested<'a>(table: &'a Table, path: &[&str]) -> Option<&'a Item> {
    let (last, parents) = path.split_last()?;
    let mut current: &dyn toml_edit::TableLike = table;
    for segment in parents {
        current = current.get(segment)?.as_table_like()?;
    }
    current.get(last)
}

/// 标量转文本
fn scalar_to_string(value: &EditValue) -> Option<String> {
    match value {
        EditValue::String(s) => Some(s.value().clone()),
        EditValue::Integer(i) => Some(i.value().to_string()),
        EditValue::Float(f) => Some(f.value().to_string()),
        EditValue::Boolean(b) => Some(b.value().to_string()),
        EditValue::Datetime(dt) => Some(dt.value().to_string()),
        EditValue::Array(_) | EditValue::InlineTable(_) => None,
    }
}

/// 在文档中设置嵌套值
fn set_nested_in_document(doc: &mut DocumentMut, path: &[&str], value: &str) -> Result<()> {
    let (last, parents) = path
        .split_last()
        .ok_or_else(|| ConfigError::InvalidKey(String::new()))?;

    // 导航到父表（标准表或内联表），路径上缺失的表自动创建
    let mut current: &mut dyn toml_edit::TableLike = doc.as_table_mut();
    for &segment in parents {
        if !current.contains_key(segment) {
            current.insert(segment, Item::Table(Table::new()));
        }

        current = current
            .get_mut(segment)
            .and_then(Item::as_table_like_mut)
            .ok_or_else(|| ConfigError::InvalidKey(format!("'{}' 不是表", segment)))?;
    }

    if let Some(existing) = current.get_mut(last).and_then(Item::as_value_mut) {
        let decor = existing.decor().clone();
        *existing = EditValue::from(value);
        *existing.decor_mut() = decor;
    } else {
        current.insert(last, toml_edit::value(value));
    }

    Ok(())
}

/// 在文档中删除嵌套值
fn delete_nested_in_document(doc: &mut DocumentMut, path: &[&str]) -> bool {
    let Some((last, parents)) = path.split_last() else {
        return false;
    };

    let mut current: &mut dyn toml_edit::TableLike = doc.as_table_mut();
    for segment in parents {
        match current.get_mut(segment).and_then(Item::as_table_like_mut) {
            Some(next) => current = next,
            None => return false,
        }
    }

    current.remove(last).is_some()
}

/// 设置文件权限（Unix 平台 0o600）
#[cfg(unix)]
fn set_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let metadata = fs::metadata(path).map_err(|e| ConfigError::io(path, e))?;
    let mut perms = metadata.permissions();
    perms.set_mode(0o600);
    fs::set_permissions(path, perms).map_err(|e| ConfigError::io(path, e))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
