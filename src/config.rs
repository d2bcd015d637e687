/// Configuration read by `BmiNwis::initialize`.
///
/// ```toml
/// sites = ["03339000", "05568500"]   # or a single string
/// start = "2022-01-01"
/// end = "2022-01-03"
/// service = "iv"
/// output = "nwis.nc"                 # optional
/// ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::sites::SiteList;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NwisConfig {
    pub sites: SiteList,
    pub start: String,
    pub end: String,
    pub service: String,
    #[serde(default)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl NwisConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
