//! Configuration for a linking run.
//!
//! [`LinkConfig`] implements [`serde::Deserialize`] with every field
//! defaulted, so a partial TOML document only overrides what it names.
//!
//! # Example
//!
//! ```
//! # use yanglink::config::{FailureModeConfig, LinkConfig};
//! let config = LinkConfig::from_toml_str("failure_mode = \"batch\"").unwrap();
//! assert_eq!(config.failure_mode(), FailureModeConfig::Batch);
//! assert_eq!(config.max_passes(), 64);
//! ```

use std::{fs, path::Path};

use log::{debug, info};
use serde::Deserialize;

use yanglink_resolve::{FailureMode, LinkOptions};

use crate::error::YanglinkError;

/// What to do when a module unit fails to link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureModeConfig {
    /// Stop at the first error.
    #[default]
    FailFast,
    /// Skip the failing unit and its dependents, keep going and report
    /// every diagnostic at the end.
    Batch,
}

impl From<FailureModeConfig> for FailureMode {
    fn from(mode: FailureModeConfig) -> Self {
        match mode {
            FailureModeConfig::FailFast => FailureMode::FailFast,
            FailureModeConfig::Batch => FailureMode::Batch,
        }
    }
}

/// Top-level linker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkConfig {
    #[serde(default)]
    failure_mode: FailureModeConfig,

    /// Upper bound on inter-file fixpoint passes.
    #[serde(default = "default_max_passes")]
    max_passes: usize,

    /// Run list-key and element-count validation after resolution.
    #[serde(default = "default_validate_list_keys")]
    validate_list_keys: bool,

    /// Cap on errors collected in batch mode.
    #[serde(default = "default_max_diagnostics")]
    max_diagnostics: usize,
}

fn default_max_passes() -> usize {
    LinkOptions::default().max_passes
}

fn default_validate_list_keys() -> bool {
    LinkOptions::default().validate_list_keys
}

fn default_max_diagnostics() -> usize {
    LinkOptions::default().max_diagnostics
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            failure_mode: FailureModeConfig::default(),
            max_passes: default_max_passes(),
            validate_list_keys: default_validate_list_keys(),
            max_diagnostics: default_max_diagnostics(),
        }
    }
}

impl LinkConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`YanglinkError::Config`] if the text is not valid TOML, names
    /// an unknown field, or sets `max_passes` to zero.
    pub fn from_toml_str(source: &str) -> Result<Self, YanglinkError> {
        let config: Self =
            toml::from_str(source).map_err(|err| YanglinkError::Config(err.to_string()))?;
        config.validate()?;
        debug!(config:?; "Parsed link configuration");
        Ok(config)
    }

    /// Loads a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`YanglinkError::Io`] if the file cannot be read, or
    /// [`YanglinkError::Config`] if its content is rejected.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, YanglinkError> {
        let path = path.as_ref();
        info!(path:% = path.display(); "Loading link configuration");
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), YanglinkError> {
        if self.max_passes == 0 {
            return Err(YanglinkError::Config("max_passes must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn with_failure_mode(mut self, failure_mode: FailureModeConfig) -> Self {
        self.failure_mode = failure_mode;
        self
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn with_validate_list_keys(mut self, validate: bool) -> Self {
        self.validate_list_keys = validate;
        self
    }

    pub fn with_max_diagnostics(mut self, max_diagnostics: usize) -> Self {
        self.max_diagnostics = max_diagnostics;
        self
    }

    pub fn failure_mode(&self) -> FailureModeConfig {
        self.failure_mode
    }

    pub fn max_passes(&self) -> usize {
        self.max_passes
    }

    pub fn validate_list_keys(&self) -> bool {
        self.validate_list_keys
    }

    pub fn max_diagnostics(&self) -> usize {
        self.max_diagnostics
    }

    /// The engine options this configuration describes.
    pub fn to_options(&self) -> LinkOptions {
        LinkOptions {
            failure_mode: self.failure_mode.into(),
            max_passes: self.max_passes,
            validate_list_keys: self.validate_list_keys,
            max_diagnostics: self.max_diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = LinkConfig::from_toml_str("").unwrap();
        assert_eq!(config, LinkConfig::default());
        assert_eq!(config.to_options(), LinkOptions::default());
    }

    #[test]
    fn test_full_document() {
        let config = LinkConfig::from_toml_str(
            r#"
            failure_mode = "batch"
            max_passes = 8
            validate_list_keys = false
            max_diagnostics = 5
            "#,
        )
        .unwrap();

        let options = config.to_options();
        assert_eq!(options.failure_mode, FailureMode::Batch);
        assert_eq!(options.max_passes, 8);
        assert!(!options.validate_list_keys);
        assert_eq!(options.max_diagnostics, 5);
    }

    #[test]
    fn test_rejected_documents() {
        for source in [
            "failure_mode = \"sometimes\"",
            "max_passes = 0",
            "unknown = 1",
            "max_passes = ",
        ] {
            let err = LinkConfig::from_toml_str(source).unwrap_err();
            assert!(matches!(err, YanglinkError::Config(_)), "{source}: {err}");
        }
    }

    #[test]
    fn test_builder_methods() {
        let config = LinkConfig::default()
            .with_failure_mode(FailureModeConfig::Batch)
            .with_max_passes(3)
            .with_validate_list_keys(false)
            .with_max_diagnostics(1);
        assert_eq!(config.failure_mode(), FailureModeConfig::Batch);
        assert_eq!(config.max_passes(), 3);
        assert!(!config.validate_list_keys());
        assert_eq!(config.max_diagnostics(), 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = LinkConfig::load("/nonexistent/yanglink/config.toml").unwrap_err();
        assert!(matches!(err, YanglinkError::Io(_)));
    }
}
