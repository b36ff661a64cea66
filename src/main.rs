//! confstore CLI - 读写 confstore 配置

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use confstore::utils::config::default_settings_path;
use confstore::{
    init_logger, lifecycle, load_settings, write_settings, ConfigHandle, ConfigValue, LogLevel,
    Settings, TypedAccess,
};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "confstore")]
#[command(version)]
#[command(about = "键值配置存储：TOML 文件或 SQL 数据表（带本地缓存）")]
#[command(long_about = r#"
按设置文件（默认 ./confstore.toml，或 CONFSTORE_SETTINGS）构造配置句柄并读写。

示例：
  confstore init
  confstore set server.port 8080 --type u16
  confstore get server.port --type u16
  confstore remove server.port
"#)]
struct Cli {
    /// 设置文件路径
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 读取键
    Get {
        key: String,

        /// 按类型解析
        #[arg(short = 't', long = "type", value_enum, default_value_t = ValueType::String)]
        value_type: ValueType,
    },

    /// 写入键
    Set {
        key: String,
        value: String,

        /// 写入前按类型校验并规范化
        #[arg(short = 't', long = "type", value_enum, default_value_t = ValueType::String)]
        value_type: ValueType,
    },

    /// 键是否存在
    Has { key: String },

    /// 删除键
    Remove { key: String },

    /// 清空本地缓存（relational 模式）
    ClearCache,

    /// 显示当前句柄信息
    Info,

    /// 生成默认设置文件
    Init {
        /// 覆盖已存在的文件
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ValueType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    String,
    Uuid,
}

/// 按类型分派，`$body` 中的 `T` 为具体类型
macro_rules! with_value_type {
    ($value_type:expr, $body:ident) => {
        match $value_type {
            ValueType::Bool => $body::<bool>,
            ValueType::I8 => $body::<i8>,
            ValueType::I16 => $body::<i16>,
            ValueType::I32 => $body::<i32>,
            ValueType::I64 => $body::<i64>,
            ValueType::U8 => $body::<u8>,
            ValueType::U16 => $body::<u16>,
            ValueType::U32 => $body::<u32>,
            ValueType::U64 => $body::<u64>,
            ValueType::F32 => $body::<f32>,
            ValueType::F64 => $body::<f64>,
            ValueType::Char => $body::<char>,
            ValueType::String => $body::<String>,
            ValueType::Uuid => $body::<Uuid>,
        }
    };
}

fn read_typed<T: ConfigValue>(handle: &ConfigHandle, key: &str) -> confstore::Result<String> {
    handle
        .get_typed::<T>(key)
        .map(|value| value.to_config_string())
}

fn write_typed<T: ConfigValue>(
    handle: &ConfigHandle,
    key: &str,
    raw: &str,
) -> confstore::Result<String> {
    let value = T::from_config_str(key, raw)?;
    handle.set_typed(key, &value)?;
    Ok(value.to_config_string())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 退出时执行缓存清理，必须最先创建、最后 drop
    let _shutdown = lifecycle::guard();

    if let Commands::Init { force } = cli.command {
        let path = cli.settings.unwrap_or_else(default_settings_path);
        write_settings(&path, &Settings::default(), force)?;
        println!("{}", path.display());
        return Ok(());
    }

    let mut settings = load_settings(cli.settings.as_deref()).context("加载设置文件失败")?;
    if cli.verbose {
        settings.log.level = LogLevel::Debug;
    }
    init_logger(&settings.log).context("初始化日志系统失败")?;

    let handle = ConfigHandle::from_settings(&settings).context("创建配置句柄失败")?;
    tracing::debug!(handle = ?handle, "配置句柄已创建");

    match cli.command {
        Commands::Get { key, value_type } => {
            let value = with_value_type!(value_type, read_typed)(&handle, &key)?;
            println!("{value}");
        }
        Commands::Set {
            key,
            value,
            value_type,
        } => {
            let stored = with_value_type!(value_type, write_typed)(&handle, &key, &value)?;
            tracing::info!(key = %key, value = %stored, "已写入");
        }
        Commands::Has { key } => {
            println!("{}", handle.has_value(&key)?);
        }
        Commands::Remove { key } => {
            handle.remove_value(&key)?;
            tracing::info!(key = %key, "已删除");
        }
        Commands::ClearCache => {
            handle.clear_cache()?;
            tracing::info!(mode = %handle.mode(), "缓存已清空");
        }
        Commands::Info => {
            let info = serde_json::json!({
                "mode": handle.mode(),
                "folder": handle.folder_path(),
                "name": handle.config_name(),
                "file": handle.file_path(),
                "cache": handle.cache().map(|cache| cache.file_path()),
                "connection": settings.connection.as_ref().map(|c| &c.database),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Init { .. } => unreachable!("init 已在加载设置前处理"),
    }

    Ok(())
}
