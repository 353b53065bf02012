use anyhow::{anyhow, Result};
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};

use crate::AppConfig;

/// 环境变量前缀，例如 `STRAP__SHUTDOWN__TIMEOUT_SECS=10`
pub const DEFAULT_ENV_PREFIX: &str = "STRAP";

/// 配置加载器
///
/// 优先级从低到高：默认值、TOML 文件、环境变量。
pub struct ConfigLoader {
    path: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// 加载配置，文件不存在时只使用默认值和环境变量
    pub fn load(&self) -> Result<AppConfig> {
        let mut builder = Config::builder();

        if self.path.exists() {
            builder = builder.add_source(File::new(
                self.path.to_str().ok_or_else(|| anyhow!("Invalid config path"))?,
                FileFormat::Toml,
            ));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| anyhow!("failed to read config {}: {}", self.path.display(), e))?;

        config
            .try_deserialize()
            .map_err(|e| anyhow!("failed to parse config: {}", e))
    }

    /// 加载并校验配置
    pub fn load_validated(&self) -> Result<AppConfig> {
        let config = self.load()?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// 校验配置
    pub fn validate(config: &AppConfig) -> Result<()> {
        if config.service.name.trim().is_empty() {
            return Err(anyhow!("service.name must not be empty"));
        }

        strap_logging::parse_filter(&config.logging.level)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use strap_logging::LogFormat;
    use tempfile::tempdir;

    #[test]
    fn test_load_defaults_without_file() {
        let temp_dir = tempdir().unwrap();
        let loader = ConfigLoader::new(temp_dir.path().join("missing.toml"))
            .with_env_prefix("STRAP_TEST_MISSING");

        let config = loader.load().unwrap();
        assert_eq!(config.service.name, "strap");
        assert_eq!(config.shutdown.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("strap.toml");
        let config_content = r#"
[service]
name = "billing"

[shutdown]
timeout_secs = 2.5

[logging]
level = "debug"
format = "json"

[health]
version = "3.1.0"
check_timeout_ms = 750
"#;
        fs::write(&path, config_content).unwrap();

        let config = ConfigLoader::new(&path)
            .with_env_prefix("STRAP_TEST_FILE")
            .load_validated()
            .unwrap();

        assert_eq!(config.service.name, "billing");
        assert_eq!(config.shutdown.timeout(), Duration::from_millis(2500));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.health.version.as_deref(), Some("3.1.0"));
        assert_eq!(config.health.check_timeout(), Duration::from_millis(750));
    }

    #[test]
    fn test_non_positive_timeout_uses_default() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("strap.toml");
        fs::write(&path, "[shutdown]\ntimeout_secs = -3\n").unwrap();

        let config = ConfigLoader::new(&path)
            .with_env_prefix("STRAP_TEST_NEGATIVE")
            .load()
            .unwrap();
        assert_eq!(config.shutdown.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("strap.toml");
        fs::write(&path, "[shutdown]\ntimeout_secs = 10\n").unwrap();

        std::env::set_var("STRAP_TEST_ENV__SHUTDOWN__TIMEOUT_SECS", "4");
        let config = ConfigLoader::new(&path)
            .with_env_prefix("STRAP_TEST_ENV")
            .load()
            .unwrap();
        std::env::remove_var("STRAP_TEST_ENV__SHUTDOWN__TIMEOUT_SECS");

        assert_eq!(config.shutdown.timeout(), Duration::from_secs(4));
    }

    #[test]
    fn test_validate_config() {
        let mut config = AppConfig::default();
        assert!(ConfigLoader::validate(&config).is_ok());

        config.logging.level = "strap=loud".to_string();
        assert!(ConfigLoader::validate(&config).is_err());

        config.logging.level = "info".to_string();
        config.service.name = "  ".to_string();
        assert!(ConfigLoader::validate(&config).is_err());
    }
}
