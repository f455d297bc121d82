//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration and scenario files
//! - Validate configuration legality
//! - Generate `SyncBlueprint` / `Scenario`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("blink_sync.toml")).unwrap();
//! println!("window: {}..={} us", blueprint.timing.min_latency_us, blueprint.timing.max_latency_us);
//! ```

mod parser;
mod validator;

pub use contracts::{Scenario, SyncBlueprint};
pub use parser::ConfigFormat;

use contracts::ContractError;
use serde::Serialize;
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
    pub fn load_from_path(path: &Path) -> Result<SyncBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<SyncBlueprint, ContractError> {
        let blueprint: SyncBlueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Load a replay scenario from file path
    pub fn load_scenario_from_path(path: &Path) -> Result<Scenario, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_scenario_from_str(&content, format)
    }

    /// Load a replay scenario from string
    pub fn load_scenario_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<Scenario, ContractError> {
        let scenario: Scenario = parser::parse(content, format)?;
        validator::validate_scenario(&scenario)?;
        Ok(scenario)
    }

    /// Serialize to TOML string
    pub fn to_toml<T: Serialize>(value: &T) -> Result<String, ContractError> {
        toml::to_string_pretty(value)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize to JSON string
    pub fn to_json<T: Serialize>(value: &T) -> Result<String, ContractError> {
        serde_json::to_string_pretty(value)
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
