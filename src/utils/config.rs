use crate::data::{ConfigError, Result};
use crate::models::{ConfigMode, Settings};
use std::fs;
use std::path::{Path, PathBuf};

/// 覆盖默认设置文件路径的环境变量
pub const SETTINGS_ENV_VAR: &str = "CONFSTORE_SETTINGS";

/// 默认设置文件名（工作目录下）
pub const DEFAULT_SETTINGS_FILE: &str = "confstore.toml";

/// 默认设置文件路径：`CONFSTORE_SETTINGS` 或 `./confstore.toml`
pub fn default_settings_path() -> PathBuf {
    std::env::var_os(SETTINGS_ENV_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
}

/// 读取设置文件（若文件不存在返回默认设置）
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_settings_path);

    if !path.exists() {
        tracing::debug!(path = %path.display(), "设置文件不存在，使用默认设置");
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(&path).map_err(|e| ConfigError::io(&path, e))?;
    let settings: Settings = toml::from_str(&content)
        .map_err(|e| ConfigError::Settings(format!("{}: {}", path.display(), e)))?;

    validate_settings(&settings)?;
    tracing::debug!(path = %path.display(), mode = %settings.mode, "设置文件已加载");
    Ok(settings)
}

/// 校验设置的完整性
pub fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.name.trim().is_empty() {
        return Err(ConfigError::Settings("name 不能为空".to_string()));
    }
    if settings.folder.trim().is_empty() {
        return Err(ConfigError::Settings("folder 不能为空".to_string()));
    }

    if settings.mode == ConfigMode::Relational {
        match &settings.connection {
            None => {
                return Err(ConfigError::Settings(
                    "relational 模式需要 [connection] 配置".to_string(),
                ))
            }
            Some(connection) if connection.database.trim().is_empty() => {
                return Err(ConfigError::Settings(
                    "connection.database 不能为空".to_string(),
                ))
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// 写入设置文件
///
/// 文件已存在且未指定 `force` 时返回错误。
pub fn write_settings(path: &Path, settings: &Settings, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(ConfigError::Settings(format!(
            "{} 已存在，使用 --force 覆盖",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(settings)
        .map_err(|e| ConfigError::Settings(format!("序列化设置失败: {e}")))?;
    fs::write(path, content).map_err(|e| ConfigError::io(path, e))?;

    tracing::info!(path = %path.display(), "设置文件已写入");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionInfo, LogLevel};
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = load_settings(Some(temp_dir.path().join("none.toml").as_path())).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_write_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("etc").join("confstore.toml");

        let mut settings = Settings {
            mode: ConfigMode::Relational,
            name: "app".to_string(),
            connection: Some(ConnectionInfo::local("app.db")),
            ..Settings::default()
        };
        settings.log.level = LogLevel::Debug;

        write_settings(&path, &settings, false).unwrap();
        assert_eq!(load_settings(Some(path.as_path())).unwrap(), settings);
    }

    #[test]
    fn test_write_refuses_overwrite_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("confstore.toml");
        std::fs::write(&path, "name = \"keep\"\n").unwrap();

        let err = write_settings(&path, &Settings::default(), false).unwrap_err();
        assert!(matches!(err, ConfigError::Settings(_)));
        assert_eq!(load_settings(Some(path.as_path())).unwrap().name, "keep");

        write_settings(&path, &Settings::default(), true).unwrap();
        assert_eq!(load_settings(Some(path.as_path())).unwrap().name, "config");
    }

    #[test]
    fn test_parse_error_is_settings_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("confstore.toml");
        std::fs::write(&path, "mode = \"cloud\"\n").unwrap();

        let err = load_settings(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::Settings(_)));
    }

    #[test]
    fn test_relational_requires_connection() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("confstore.toml");
        std::fs::write(&path, "mode = \"relational\"\n").unwrap();

        assert!(load_settings(Some(path.as_path())).is_err());

        std::fs::write(
            &path,
            "mode = \"relational\"\n[connection]\ndatabase = \"\"\n",
        )
        .unwrap();
        assert!(load_settings(Some(path.as_path())).is_err());
    }

    #[test]
    #[serial]
    fn test_env_var_overrides_default_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("custom.toml");
        std::fs::write(&path, "name = \"from-env\"\n").unwrap();

        std::env::set_var(SETTINGS_ENV_VAR, &path);
        assert_eq!(default_settings_path(), path);
        let settings = load_settings(None).unwrap();
        std::env::remove_var(SETTINGS_ENV_VAR);

        assert_eq!(settings.name, "from-env");
        assert_eq!(default_settings_path(), PathBuf::from(DEFAULT_SETTINGS_FILE));
    }
}
