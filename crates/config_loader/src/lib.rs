//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON port configuration files
//! - Validate configuration legality (ranges, connection table rows)
//! - Produce `PortConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("port.toml")).unwrap();
//! println!("Port: {}", config.name);
//! ```

mod parser;
mod validator;

pub use contracts::PortConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<PortConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<PortConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Validate a configuration built in code
    pub fn validate(config: &PortConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    /// Serialize PortConfig to TOML string
    pub fn to_toml(config: &PortConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize PortConfig to JSON string
    pub fn to_json(config: &PortConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PORT_TOML: &str = r#"
name = "dataShort_out"

[stats]
history_window = 16

[remote]
queue_capacity = 4
format = "bincode"

[[connection_table]]
connection_id = "c1"
stream_id = "s1"
port_name = "dataShort_out"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let config = ConfigLoader::load_from_str(PORT_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(config.name, "dataShort_out");
        assert_eq!(config.stats.history_window, 16);
        assert_eq!(config.connection_table.len(), 1);
    }

    #[test]
    fn test_round_trip_toml() {
        let config = ConfigLoader::load_from_str(PORT_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&config).unwrap();
        let again = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(again.name, config.name);
        assert_eq!(again.remote.format, config.remote.format);
        assert_eq!(again.connection_table, config.connection_table);
    }

    #[test]
    fn test_toml_to_json() {
        let config = ConfigLoader::load_from_str(PORT_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let again = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(again.stats.history_window, 16);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
name = "out"

[[connection_table]]
connection_id = " c1"
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("connection_table[0].connection_id"));
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(PORT_TOML.as_bytes()).unwrap();
        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.remote.queue_capacity, 4);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::load_from_path(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ContractError::Io(_)));
    }
}
