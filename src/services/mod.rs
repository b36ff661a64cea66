// 服务层模块
//
// - config: 配置句柄（file / relational 两种后端）和类型化读写
// - accessor: 显式传递的共享句柄

pub mod accessor;
pub mod config;

pub use accessor::ConfigAccessor;
pub use config::{
    ConfigHandle, ConfigValue, TypedAccess, ValueStore, CACHE_FOLDER, CACHE_PREFIX,
    CONFIG_EXTENSION,
};
