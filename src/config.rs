use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::DEFAULT_COORDINATE_LIMIT;

/// How a Length measurement is labelled when the image has no pixel spacing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnitPolicy {
    /// Report raw pixel distances as "px"
    #[default]
    Distinct,
    /// Label raw pixel distances "mm", as older exports did
    LegacyMillimetres,
}

/// Settings for export artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Name the artifact is emitted under
    pub artifact_name: String,
    /// PBKDF2 rounds used to derive the export key from the passphrase
    pub kdf_iterations: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            artifact_name: "measurements.enc".to_owned(),
            kdf_iterations: 100_000,
        }
    }
}

/// Session-wide configuration, built once at start-up and passed by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)] // missing fields fall back to their defaults
pub struct SessionConfig {
    pub length_units: LengthUnitPolicy,
    /// Largest |coordinate| accepted when the image size is unknown
    pub coordinate_limit: f32,
    pub export: ExportConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            length_units: LengthUnitPolicy::default(),
            coordinate_limit: DEFAULT_COORDINATE_LIMIT,
            export: ExportConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::info!("Loading session config from {}", path.display());
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.coordinate_limit.is_finite() || self.coordinate_limit <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "coordinate_limit",
                reason: format!("must be positive and finite, got {}", self.coordinate_limit),
            });
        }
        if self.export.kdf_iterations == 0 {
            return Err(ConfigError::Invalid {
                field: "export.kdf_iterations",
                reason: "must be at least 1".to_owned(),
            });
        }
        let name = &self.export.artifact_name;
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(ConfigError::Invalid {
                field: "export.artifact_name",
                reason: format!("{name:?} is not a plain file name"),
            });
        }
        Ok(())
    }
}
