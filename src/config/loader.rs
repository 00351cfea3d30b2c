// src/config/loader.rs
//! Configuration loader: defaults, TOML files, then environment overrides

use crate::config::{constants::paths, SystemConfig};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Layered configuration loader
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    current_config: Arc<RwLock<SystemConfig>>,
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileNotFound(String),
    ParseError(String),
    ValidationError(Vec<String>),
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Configuration file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Configuration parse error: {}", msg),
            ConfigError::ValidationError(errors) => {
                write!(f, "Configuration validation errors: ")?;
                for error in errors {
                    write!(f, "\n  {}", error)?;
                }
                Ok(())
            }
            ConfigError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader over the system-wide and working-directory config files
    pub fn new() -> Self {
        Self::with_paths(Self::discover_config_paths())
    }

    /// Create loader with custom paths, later paths overriding earlier ones
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            current_config: Arc::new(RwLock::new(SystemConfig::default())),
        }
    }

    /// Load, merge and validate configuration. Missing files are skipped.
    pub fn load_system_config(&mut self) -> Result<SystemConfig, ConfigError> {
        let config = self.load_and_merge_configs(std::env::vars())?;
        *self.current_config.write() = config.clone();
        info!(
            sample_rate_hz = config.engine.sample_rate_hz,
            buffer_capacity = config.engine.buffer_capacity,
            block_size = config.engine.block_size,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Last successfully loaded configuration
    pub fn get_current_config(&self) -> SystemConfig {
        self.current_config.read().clone()
    }

    /// Parse a configuration document on its own, without files or environment
    pub fn parse_str(content: &str) -> Result<SystemConfig, ConfigError> {
        let config: SystemConfig = toml::from_str(content)?;
        config.validate().map_err(ConfigError::ValidationError)?;
        Ok(config)
    }

    /// Validate configuration file without loading
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_str(&content).map(|_| ())
    }

    /// Export current configuration to file
    pub fn export_config<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let config = self.get_current_config();
        let toml_content =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, toml_content)?;
        Ok(())
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from(paths::SYSTEM_CONFIG_PATH),
            PathBuf::from(paths::LOCAL_CONFIG_FILE),
        ]
    }

    fn load_and_merge_configs<I>(&self, env_vars: I) -> Result<SystemConfig, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut merged_config = toml::Value::try_from(SystemConfig::default())
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        for config_path in &self.config_paths {
            match self.load_config_file(config_path) {
                Ok(file_config) => {
                    debug!(path = %config_path.display(), "merging config file");
                    merge_toml_values(&mut merged_config, file_config);
                }
                Err(ConfigError::FileNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        apply_environment_overrides(&mut merged_config, env_vars);

        let config: SystemConfig = merged_config.try_into().map_err(|e: toml::de::Error| {
            ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
        })?;

        config.validate().map_err(ConfigError::ValidationError)?;
        Ok(config)
    }

    fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<toml::Value, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: toml::Value = toml::from_str(&content)?;

        Ok(config)
    }
}

fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml_values(base_value, value);
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

/// `BIOSIM_ENGINE__BLOCK_SIZE=256` sets `engine.block_size`
fn apply_environment_overrides<I>(config: &mut toml::Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let Some(stripped) = key.strip_prefix(paths::ENV_PREFIX) else {
            continue;
        };

        let path: Vec<String> = stripped
            .split(paths::ENV_SEPARATOR)
            .map(str::to_lowercase)
            .collect();

        if path.iter().any(String::is_empty) {
            continue;
        }

        debug!(key = %key, "applying environment override");
        set_nested_value(config, &path, parse_env_value(&value));
    }
}

fn parse_env_value(value: &str) -> toml::Value {
    if let Ok(int_val) = value.parse::<i64>() {
        toml::Value::Integer(int_val)
    } else if let Ok(float_val) = value.parse::<f64>() {
        toml::Value::Float(float_val)
    } else if let Ok(bool_val) = value.parse::<bool>() {
        toml::Value::Boolean(bool_val)
    } else {
        toml::Value::String(value.to_string())
    }
}

fn set_nested_value(config: &mut toml::Value, path: &[String], value: toml::Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = config;
    for part in parents {
        let toml::Value::Table(table) = current else {
            return;
        };
        current = table
            .entry(part.clone())
            .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
    }

    if let toml::Value::Table(table) = current {
        // integer literals written where the field is a float
        let value = match (table.get(last), value) {
            (Some(toml::Value::Float(_)), toml::Value::Integer(i)) => toml::Value::Float(i as f64),
            (_, value) => value,
        };
        table.insert(last.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let loader = ConfigLoader::with_paths(vec![PathBuf::from("/nonexistent/biosim.toml")]);
        let config = loader.load_and_merge_configs(Vec::new()).unwrap();
        assert_eq!(config, SystemConfig::default());
    }

    #[test]
    fn test_file_then_environment_layering() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\nblock_size = 256\nseed = 7\n[filters]\nmains_frequency_hz = 60.0").unwrap();

        let loader = ConfigLoader::with_paths(vec![file.path().to_path_buf()]);
        let config = loader
            .load_and_merge_configs(vars(&[
                ("BIOSIM_ENGINE__BLOCK_SIZE", "512"),
                ("BIOSIM_FILTERS__NOTCH_Q", "25"),
                ("UNRELATED", "1"),
            ]))
            .unwrap();

        assert_eq!(config.engine.block_size, 512);
        assert_eq!(config.engine.seed, Some(7));
        assert_eq!(config.filters.mains_frequency_hz, 60.0);
        assert_eq!(config.filters.notch_q, 25.0);
    }

    #[test]
    fn test_invalid_merged_config_is_rejected() {
        let loader = ConfigLoader::with_paths(Vec::new());
        let result = loader.load_and_merge_configs(vars(&[("BIOSIM_ENGINE__BUFFER_CAPACITY", "1000")]));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine\nblock_size = ").unwrap();

        let loader = ConfigLoader::with_paths(vec![file.path().to_path_buf()]);
        assert!(matches!(
            loader.load_and_merge_configs(Vec::new()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_export_round_trips_through_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exported.toml");

        let loader = ConfigLoader::with_paths(Vec::new());
        loader.export_config(&path).unwrap();

        assert!(loader.validate_config_file(&path).is_ok());
    }
}
