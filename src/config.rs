//! Prediction Configuration
//!
//! Settings for label prediction, and the JSON persistence shared by the
//! configuration and the models.
use crate::constants::LEAF_LEVEL;
use crate::errors::CartError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What to do when a leaf predicts a symbol id the symbol table does not have.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum InconsistencyPolicy {
    /// Log the mismatch and give no label.
    #[default]
    Log,
    /// Return an error.
    Fail,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PredictionConfig {
    pub on_inconsistency: InconsistencyPolicy,
    /// Minimum number of data points for `interpret`; the default walks down to a leaf.
    pub min_data: i64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        PredictionConfig {
            on_inconsistency: InconsistencyPolicy::Log,
            min_data: LEAF_LEVEL,
        }
    }
}

impl PredictionConfig {
    pub fn fail_fast() -> Self {
        PredictionConfig {
            on_inconsistency: InconsistencyPolicy::Fail,
            ..Default::default()
        }
    }
}

/// IO
pub trait CartIO: Serialize + DeserializeOwned + Sized {
    /// Save as a json object to a file.
    ///
    /// * `path` - Path to save to.
    fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), CartError> {
        fs::write(path, self.json_dump()?).map_err(|e| CartError::UnableToWrite(e.to_string()))
    }

    /// Dump as a json object.
    fn json_dump(&self) -> Result<String, CartError> {
        serde_json::to_string(self).map_err(|e| CartError::UnableToWrite(e.to_string()))
    }

    /// Load from a json string.
    fn from_json(json_str: &str) -> Result<Self, CartError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| CartError::UnableToRead(e.to_string()))
    }

    /// Load from a path to a json object.
    ///
    /// * `path` - Path to load from.
    fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, CartError> {
        let json_str = fs::read_to_string(path).map_err(|e| CartError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

impl CartIO for PredictionConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_prediction_config_default() {
        let config = PredictionConfig::default();
        assert_eq!(config.on_inconsistency, InconsistencyPolicy::Log);
        assert_eq!(config.min_data, LEAF_LEVEL);
        assert_eq!(PredictionConfig::fail_fast().on_inconsistency, InconsistencyPolicy::Fail);
    }

    #[test]
    fn test_config_io_json() {
        let config = PredictionConfig::fail_fast();
        let json = config.json_dump().unwrap();
        assert_eq!(PredictionConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_config_io_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.json");
        let config = PredictionConfig {
            on_inconsistency: InconsistencyPolicy::Fail,
            min_data: 12,
        };
        config.save_json(&file_path).unwrap();
        assert_eq!(PredictionConfig::load_json(&file_path).unwrap(), config);
    }

    #[test]
    fn test_parse_partial_config() {
        let config = PredictionConfig::from_json(r#"{"on_inconsistency": "Fail"}"#).unwrap();
        assert_eq!(config.on_inconsistency, InconsistencyPolicy::Fail);
        assert_eq!(config.min_data, LEAF_LEVEL);
        assert!(matches!(
            PredictionConfig::from_json(r#"{"on_inconsistency": "Ignore"}"#),
            Err(CartError::UnableToRead(_))
        ));
        assert!(matches!(
            PredictionConfig::load_json("does/not/exist.json"),
            Err(CartError::UnableToRead(_))
        ));
    }
}
