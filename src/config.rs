//! Settings read from a JSON file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::solid::DEFAULT_RAY_TOLERANCE;

/// How text strings are interpreted; selects the cmap subtable search order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringEncoding {
    /// Single-byte legacy text: Macintosh Roman tables first.
    Ascii,
    #[default]
    Utf8,
    System,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub encoding: StringEncoding,
    /// Directories searched for fonts not found as named.
    pub font_paths: Vec<PathBuf>,
    /// Minimum distance for an accepted ray hit.
    pub ray_tolerance: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            encoding: StringEncoding::default(),
            font_paths: Vec::new(),
            ray_tolerance: DEFAULT_RAY_TOLERANCE,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&contents)?;
        debug!("loaded config from {path:?}");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.encoding, StringEncoding::Utf8);
        assert_eq!(config.ray_tolerance, 1e-6);
    }

    #[test]
    fn parses_all_fields() {
        let config = Config::from_json(
            r#"{ "encoding": "ascii", "font_paths": ["/usr/share/fonts"], "ray_tolerance": 0.001 }"#,
        )
        .unwrap();
        assert_eq!(config.encoding, StringEncoding::Ascii);
        assert_eq!(config.font_paths, vec![PathBuf::from("/usr/share/fonts")]);
        assert_eq!(config.ray_tolerance, 0.001);
    }

    #[test]
    fn rejects_unknown_encoding() {
        assert!(matches!(
            Config::from_json(r#"{ "encoding": "ebcdic" }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load("/nonexistent/ttf-extrude.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
