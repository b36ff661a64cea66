//! 类型化读写
//!
//! 存储层只认字符串，这里负责字符串与具体类型之间的转换：
//! - [`ConfigValue`]：单个类型的解析/格式化规则
//! - [`ValueStore`]：字符串读写契约（[`ConfigHandle`](super::ConfigHandle)、
//!   [`ConfigAccessor`](crate::services::ConfigAccessor) 实现）
//! - [`TypedAccess`]：在任意 `ValueStore` 上提供 `get_i32`/`set_bool` 等方法
//!
//! 解析失败返回 `MalformedValue`，键不存在返回 `KeyNotFound`，不做静默默认。

use crate::data::{ConfigError, Result};
use uuid::Uuid;

/// 可存入配置的值类型
pub trait ConfigValue: Sized {
    /// 出现在 `MalformedValue` 中的类型名
    const TYPE_NAME: &'static str;

    fn to_config_string(&self) -> String;

    fn from_config_str(key: &str, raw: &str) -> Result<Self>;
}

macro_rules! impl_numeric_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ConfigValue for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);

                fn to_config_string(&self) -> String {
                    self.to_string()
                }

                fn from_config_str(key: &str, raw: &str) -> Result<Self> {
                    raw.trim()
                        .parse::<$ty>()
                        .map_err(|_| ConfigError::malformed(key, Self::TYPE_NAME, raw))
                }
            }
        )*
    };
}

impl_numeric_value!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl ConfigValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn to_config_string(&self) -> String {
        self.to_string()
    }

    fn from_config_str(key: &str, raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if trimmed.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(ConfigError::malformed(key, Self::TYPE_NAME, raw))
        }
    }
}

impl ConfigValue for char {
    const TYPE_NAME: &'static str = "char";

    fn to_config_string(&self) -> String {
        self.to_string()
    }

    fn from_config_str(key: &str, raw: &str) -> Result<Self> {
        raw.chars()
            .next()
            .ok_or_else(|| ConfigError::malformed(key, Self::TYPE_NAME, raw))
    }
}

impl ConfigValue for String {
    const TYPE_NAME: &'static str = "string";

    fn to_config_string(&self) -> String {
        self.clone()
    }

    fn from_config_str(_key: &str, raw: &str) -> Result<Self> {
        Ok(raw.to_string())
    }
}

impl ConfigValue for Uuid {
    const TYPE_NAME: &'static str = "uuid";

    fn to_config_string(&self) -> String {
        self.hyphenated().to_string()
    }

    fn from_config_str(key: &str, raw: &str) -> Result<Self> {
        Uuid::parse_str(raw.trim()).map_err(|_| ConfigError::malformed(key, Self::TYPE_NAME, raw))
    }
}

/// 字符串读写契约
pub trait ValueStore {
    fn get_value(&self, key: &str) -> Result<String>;
    fn set_value(&self, key: &str, value: &str) -> Result<()>;
    fn has_value(&self, key: &str) -> Result<bool>;
    fn remove_value(&self, key: &str) -> Result<()>;
}

/// 类型化读写，对所有 [`ValueStore`] 自动实现
pub trait TypedAccess: ValueStore {
    fn get_typed<T: ConfigValue>(&self, key: &str) -> Result<T> {
        let raw = self.get_value(key)?;
        T::from_config_str(key, &raw)
    }

    fn set_typed<T: ConfigValue>(&self, key: &str, value: &T) -> Result<()> {
        self.set_value(key, &value.to_config_string())
    }

    /// 键不存在时返回 `default`，格式错误和存储错误照常返回
    fn get_or<T: ConfigValue>(&self, key: &str, default: T) -> Result<T> {
        match self.get_typed(key) {
            Err(e) if e.is_not_found() => Ok(default),
            other => other,
        }
    }

    fn contains(&self, key: &str) -> Result<bool> {
        self.has_value(key)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.remove_value(key)
    }

    fn get_bool(&self, key: &str) -> Result<bool> {
        self.get_typed(key)
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_typed(key, &value)
    }

    /// 字节
    fn get_i8(&self, key: &str) -> Result<i8> {
        self.get_typed(key)
    }

    fn set_i8(&self, key: &str, value: i8) -> Result<()> {
        self.set_typed(key, &value)
    }

    fn get_i16(&self, key: &str) -> Result<i16> {
        self.get_typed(key)
    }

    fn set_i16(&self, key: &str, value: i16) -> Result<()> {
        self.set_typed(key, &value)
    }

    fn get_i32(&self, key: &str) -> Result<i32> {
        self.get_typed(key)
    }

    fn set_i32(&self, key: &str, value: i32) -> Result<()> {
        self.set_typed(key, &value)
    }

    fn get_i64(&self, key: &str) -> Result<i64> {
        self.get_typed(key)
    }

    fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.set_typed(key, &value)
    }

    fn get_u8(&self, key: &str) -> Result<u8> {
        self.get_typed(key)
    }

    fn set_u8(&self, key: &str, value: u8) -> Result<()> {
        self.set_typed(key, &value)
    }

    fn get_u16(&self, key: &str) -> Result<u16> {
        self.get_typed(key)
    }

    fn set_u16(&self, key: &str, value: u16) -> Result<()> {
        self.set_typed(key, &value)
    }

    fn get_u32(&self, key: &str) -> Result<u32> {
        self.get_typed(key)
    }

    fn set_u32(&self, key: &str, value: u32) -> Result<()> {
        self.set_typed(key, &value)
    }

    fn get_u64(&self, key: &str) -> Result<u64> {
        self.get_typed(key)
    }

    fn set_u64(&self, key: &str, value: u64) -> Result<()> {
        self.set_typed(key, &value)
    }

    fn get_f32(&self, key: &str) -> Result<f32> {
        self.get_typed(key)
    }

    fn set_f32(&self, key: &str, value: f32) -> Result<()> {
        self.set_typed(key, &value)
    }

    fn get_f64(&self, key: &str) -> Result<f64> {
        self.get_typed(key)
    }

    fn set_f64(&self, key: &str, value: f64) -> Result<()> {
        self.set_typed(key, &value)
    }

    fn get_char(&self, key: &str) -> Result<char> {
        self.get_typed(key)
    }

    fn set_char(&self, key: &str, value: char) -> Result<()> {
        self.set_typed(key, &value)
    }

    fn get_string(&self, key: &str) -> Result<String> {
        self.get_value(key)
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, value)
    }

    fn get_uuid(&self, key: &str) -> Result<Uuid> {
        self.get_typed(key)
    }

    fn set_uuid(&self, key: &str, value: Uuid) -> Result<()> {
        self.set_typed(key, &value)
    }
}

impl<S: ValueStore + ?Sized> TypedAccess for S {}
