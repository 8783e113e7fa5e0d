//! # Config Loader
//!
//! Loads a `RoadwatchBlueprint` from TOML (primary) or JSON.
//!
//! Every entry point validates before returning, so callers only ever see a
//! blueprint that passed [`validator::validate`]. Non-fatal findings are
//! available separately through [`collect_warnings`].
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("roadwatch.toml")).unwrap();
//! for warning in config_loader::collect_warnings(&blueprint) {
//!     eprintln!("warning: {warning}");
//! }
//! ```

mod parser;
pub mod validator;

pub use contracts::RoadwatchBlueprint;
pub use parser::ConfigFormat;
pub use validator::collect_warnings;

use contracts::ContractError;
use std::path::Path;

/// Blueprint loader (stateless)
pub struct ConfigLoader;

impl ConfigLoader {
    /// Read, parse and validate a `.toml` / `.json` file
    ///
    /// # Errors
    /// - `ConfigParse` for an unknown extension, an unreadable file, or malformed content
    /// - `ConfigValidation` for the first rule the blueprint breaks
    pub fn load_from_path(path: &Path) -> Result<RoadwatchBlueprint, ContractError> {
        let format = ConfigFormat::detect(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| ContractError::ConfigParse {
            message: format!("cannot read '{}': {e}", path.display()),
            source: Some(Box::new(e)),
        })?;
        Self::load_from_str(&content, format)
    }

    /// Parse and validate in-memory content
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<RoadwatchBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Re-check a blueprint after CLI / env overrides were applied
    pub fn validate(blueprint: &RoadwatchBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    /// Render as TOML (e.g. `roadwatch info --toml`)
    pub fn to_toml(blueprint: &RoadwatchBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Render as JSON
    pub fn to_json(blueprint: &RoadwatchBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_TOML: &str = r#"
[agent]
batch_size = 3

[agent.streams]
accelerometer = "data/accelerometer.csv"
gps = "data/gps.csv"
parking = "data/parking.csv"

[classifier]
rest_value = 10.0
epsilon = 0.2

[forwarder]
endpoint = "http://store.local:8000"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.agent.batch_size, 3);
        assert_eq!(bp.forwarder.endpoint, "http://store.local:8000");
    }

    #[test]
    fn test_round_trip_toml() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(bp, bp2);
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp, bp2);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = MINIMAL_TOML.replace("batch_size = 3", "batch_size = 0");
        let err = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
    }

    #[test]
    fn test_unreadable_file_names_path() {
        let err = ConfigLoader::load_from_path(Path::new("/nonexistent/roadwatch.toml")).unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
        assert!(err.to_string().contains("/nonexistent/roadwatch.toml"));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = ConfigLoader::load_from_path(Path::new("roadwatch.yaml")).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }
}
