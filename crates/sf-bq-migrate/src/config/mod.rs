//! Configuration loading and validation.

mod types;
mod validation;

use std::path::Path;

use crate::error::Result;

pub use types::{Config, MigrationConfig, RunOptions, SourceConfig, TargetConfig};
pub use validation::{validate, validate_options};

impl Config {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parse and validate config from a YAML string.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(text)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
