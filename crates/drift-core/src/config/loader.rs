//! YAML configuration loading with environment interpolation.

use std::path::Path;

use serde::de::DeserializeOwned;
use snafu::prelude::*;

use super::interpolate;
use crate::error::{ConfigError, ReadFileSnafu, YamlParseSnafu};

/// Check if a path has a YAML extension.
pub fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "yaml" || ext == "yml")
        .unwrap_or(false)
}

/// Interpolate environment variables in `contents` and parse the result as YAML.
///
/// All missing variables are reported together.
pub fn parse_yaml<C: DeserializeOwned>(contents: &str) -> Result<C, ConfigError> {
    let result = interpolate(contents);
    if !result.is_ok() {
        return Err(ConfigError::EnvInterpolation {
            message: result.errors.join("\n"),
        });
    }

    serde_yaml::from_str(&result.text).context(YamlParseSnafu)
}

/// Load a single YAML configuration file.
pub fn load_yaml_file<C: DeserializeOwned>(path: &Path) -> Result<C, ConfigError> {
    if !is_yaml_file(path) {
        return Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    }

    let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
    parse_yaml(&contents)
}
