//! Configuration Management

use crate::device::{KeyboardSignature, Registry, DEV_INPUT_ROOT, SYSFS_INPUT_ROOT};
use crate::listen::ListenSettings;
use crate::platform::ByteOrder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Where devices are discovered
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Classification settings
    #[serde(default)]
    pub classify: ClassifyConfig,
    /// Read loop settings
    #[serde(default)]
    pub listen: ListenConfig,
}

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// sysfs input class directory
    pub sysfs_root: PathBuf,
    /// Device node directory
    pub dev_root: PathBuf,
}

/// Classification configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyConfig {
    /// Key codes a keyboard must report
    pub keyboard_signature: Vec<u16>,
}

/// Listen configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenConfig {
    /// Longest readiness wait per iteration (ms)
    pub poll_interval_ms: u64,
    /// Event queue size for channel streaming
    pub queue_capacity: usize,
    /// Record and mask byte order
    pub byte_order: ByteOrderSetting,
}

/// Byte order selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrderSetting {
    /// Detect from the host
    #[default]
    Auto,
    Little,
    Big,
}

impl ByteOrderSetting {
    pub fn resolve(self) -> ByteOrder {
        match self {
            ByteOrderSetting::Auto => ByteOrder::host(),
            ByteOrderSetting::Little => ByteOrder::Little,
            ByteOrderSetting::Big => ByteOrder::Big,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from(SYSFS_INPUT_ROOT),
            dev_root: PathBuf::from(DEV_INPUT_ROOT),
        }
    }
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            keyboard_signature: KeyboardSignature::default().codes().to_vec(),
        }
    }
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            queue_capacity: 1024,
            byte_order: ByteOrderSetting::Auto,
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(1..=5000).contains(&self.listen.poll_interval_ms) {
            return Err(crate::Error::Config(format!(
                "poll_interval_ms must be in [1, 5000], got {}",
                self.listen.poll_interval_ms
            )));
        }
        if !self.listen.queue_capacity.is_power_of_two() {
            return Err(crate::Error::Config(format!(
                "queue_capacity must be a power of 2, got {}",
                self.listen.queue_capacity
            )));
        }
        if self.registry.sysfs_root.as_os_str().is_empty() {
            return Err(crate::Error::Config("sysfs_root must not be empty".to_string()));
        }
        if self.registry.dev_root.as_os_str().is_empty() {
            return Err(crate::Error::Config("dev_root must not be empty".to_string()));
        }
        Ok(())
    }

    /// Load config from file
    pub fn load(path: &PathBuf) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self, crate::Error> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &PathBuf) -> Result<(), crate::Error> {
        let content = self.to_toml()?;

        // Create parent directories
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|c| c.join("dev-input").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Settings for every listen loop
    pub fn listen_settings(&self) -> ListenSettings {
        ListenSettings {
            poll_interval: Duration::from_millis(self.listen.poll_interval_ms),
            byte_order: self.listen.byte_order.resolve(),
            queue_capacity: self.listen.queue_capacity,
        }
    }

    pub fn keyboard_signature(&self) -> KeyboardSignature {
        KeyboardSignature::new(self.classify.keyboard_signature.clone())
    }

    /// Registry over the configured roots
    pub fn registry(&self) -> Registry {
        Registry::new(&self.registry.sysfs_root, &self.registry.dev_root)
            .with_settings(self.listen_settings())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listen.poll_interval_ms, 100);
        assert_eq!(config.listen.queue_capacity, 1024);
        assert_eq!(config.listen.byte_order, ByteOrderSetting::Auto);
        assert_eq!(config.registry.sysfs_root, PathBuf::from("/sys/class/input"));
        assert_eq!(config.classify.keyboard_signature, vec![1, 30, 48, 46, 28]);
    }

    #[test]
    fn test_config_serialization() {
        let toml = Config::default().to_toml().unwrap();
        assert!(toml.contains("[registry]"));
        assert!(toml.contains("[classify]"));
        assert!(toml.contains("[listen]"));
        assert!(toml.contains("byte_order = \"auto\""));
    }

    #[test]
    fn test_default_path() {
        let path = Config::default_path();
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = Config::default();
        original.listen.poll_interval_ms = 20;
        original.listen.byte_order = ByteOrderSetting::Big;
        original.classify.keyboard_signature = vec![1, 2];

        original.save(&config_path).expect("Failed to save config");
        assert!(config_path.exists());

        let loaded = Config::load(&config_path).expect("Failed to load config");
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = Config::load(&temp_dir.path().join("missing.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[listen]
poll_interval_ms = 250
queue_capacity = 64
byte_order = "little"
"#,
        )
        .expect("Partial config should deserialize");

        assert_eq!(config.listen.poll_interval_ms, 250);
        assert_eq!(config.registry, RegistryConfig::default());
        assert_eq!(config.classify, ClassifyConfig::default());
    }

    #[test]
    fn test_invalid_toml_parsing() {
        let result: Result<Config, _> = toml::from_str("this is not valid toml {{{}}}");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_byte_order_rejected() {
        let result: Result<Config, _> = toml::from_str(
            r#"
[listen]
poll_interval_ms = 100
queue_capacity = 1024
byte_order = "middle"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_default_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_poll_interval() {
        let mut config = Config::default();
        config.listen.poll_interval_ms = 0;
        assert!(config.validate().is_err());
        config.listen.poll_interval_ms = 5001;
        assert!(config.validate().is_err());
        config.listen.poll_interval_ms = 1;
        assert!(config.validate().is_ok());
        config.listen.poll_interval_ms = 5000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_queue_capacity() {
        let mut config = Config::default();
        config.listen.queue_capacity = 1000;
        assert!(config.validate().is_err());
        config.listen.queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_roots() {
        let mut config = Config::default();
        config.registry.dev_root = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_invalid_values() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("bad_config.toml");
        std::fs::write(
            &config_path,
            r#"
[listen]
poll_interval_ms = 100
queue_capacity = 1000
byte_order = "auto"
"#,
        )
        .expect("Failed to write config");
        assert!(matches!(
            Config::load(&config_path),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_listen_settings() {
        let mut config = Config::default();
        config.listen.poll_interval_ms = 25;
        config.listen.byte_order = ByteOrderSetting::Big;
        config.listen.queue_capacity = 32;

        let settings = config.listen_settings();
        assert_eq!(settings.poll_interval, Duration::from_millis(25));
        assert_eq!(settings.byte_order, ByteOrder::Big);
        assert_eq!(settings.queue_capacity, 32);
    }

    #[test]
    fn test_auto_byte_order_is_host() {
        assert_eq!(ByteOrderSetting::Auto.resolve(), ByteOrder::host());
        assert_eq!(ByteOrderSetting::Little.resolve(), ByteOrder::Little);
    }

    #[test]
    fn test_registry_uses_configured_roots() {
        let mut config = Config::default();
        config.registry.sysfs_root = PathBuf::from("/tmp/sys");
        config.listen.byte_order = ByteOrderSetting::Little;

        let registry = config.registry();
        assert_eq!(registry.sysfs_root(), std::path::Path::new("/tmp/sys"));
        assert_eq!(registry.settings().byte_order, ByteOrder::Little);
        assert_eq!(config.keyboard_signature(), KeyboardSignature::default());
    }
}
