//! Tool configuration: defaults merged from an optional TOML file and
//! `XSUM_*` environment variable overrides.

use std::path::Path;

use config::{Config, Environment, File as ConfigFile, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::logging::LoggingConfig;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XsumConfig {
    /// Default hash algorithm when none is given on the command line.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Default attribute mask applied when a mask option enables masking
    /// without specifying one.
    #[serde(default = "default_mask")]
    pub mask: String,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_algorithm() -> String {
    "sha256".to_string()
}

fn default_mask() -> String {
    "0000".to_string()
}

impl Default for XsumConfig {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            mask: default_mask(),
            logging: LoggingConfig::default(),
        }
    }
}

impl XsumConfig {
    /// Load configuration, merging (lowest to highest precedence): defaults,
    /// the TOML file at `path` if present, then `XSUM_*` environment
    /// variables (`XSUM_ALGORITHM`, `XSUM_LOGGING__LEVEL`, ...).
    pub fn load(path: Option<&Path>) -> Result<XsumConfig, EngineError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                ConfigFile::from(path.to_path_buf())
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }
        builder = builder.add_source(Environment::with_prefix("XSUM").separator("__"));

        let config = builder
            .build()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        config
            .try_deserialize()
            .map_err(|e| EngineError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
        let config = XsumConfig::load(None).unwrap();
        assert_eq!(config.algorithm, "sha256");
        assert_eq!(config.mask, "0000");
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let config = XsumConfig::load(Some(Path::new("/nonexistent/xsum.toml"))).unwrap();
        assert_eq!(config.algorithm, "sha256");
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xsum.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "algorithm = \"sha1\"\nmask = \"0644+u\"").unwrap();
        writeln!(f, "[logging]\nlevel = \"debug\"").unwrap();
        drop(f);

        let config = XsumConfig::load(Some(&path)).unwrap();
        assert_eq!(config.algorithm, "sha1");
        assert_eq!(config.mask, "0644+u");
        assert_eq!(config.logging.level, "debug");
    }
}
