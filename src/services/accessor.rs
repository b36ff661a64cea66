//! 共享配置访问器
//!
//! 持有 `Arc<ConfigHandle>`，克隆开销很小，由调用方显式传递给需要读配置的组件。

use super::config::{ConfigHandle, ValueStore};
use crate::data::Result;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ConfigAccessor {
    handle: Arc<ConfigHandle>,
}

impl ConfigAccessor {
    pub fn new(handle: ConfigHandle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    pub fn from_shared(handle: Arc<ConfigHandle>) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &ConfigHandle {
        &self.handle
    }

    /// 读取字符串值
    ///
    /// 键不存在返回 `KeyNotFound`，存储故障返回对应错误，两者可以通过
    /// [`ConfigError::kind`](crate::data::ConfigError::kind) 区分。
    pub fn get(&self, key: &str) -> Result<String> {
        self.handle.get_value(key)
    }
}

impl From<ConfigHandle> for ConfigAccessor {
    fn from(handle: ConfigHandle) -> Self {
        Self::new(handle)
    }
}

impl ValueStore for ConfigAccessor {
    fn get_value(&self, key: &str) -> Result<String> {
        self.handle.get_value(key)
    }

    fn set_value(&self, key: &str, value: &str) -> Result<()> {
        self.handle.set_value(key, value)
    }

    fn has_value(&self, key: &str) -> Result<bool> {
        self.handle.has_value(key)
    }

    fn remove_value(&self, key: &str) -> Result<()> {
        self.handle.remove_value(key)
    }
}
