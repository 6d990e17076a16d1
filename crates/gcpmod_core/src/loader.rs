//! Config document loading.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Config file formats, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            "toml" => Some(ConfigFormat::Toml),
            _ => None,
        }
    }

    pub fn parse<T: DeserializeOwned>(&self, content: &str) -> CoreResult<T> {
        let value = match self {
            ConfigFormat::Yaml => serde_yaml::from_str::<T>(content)?,
            ConfigFormat::Json => serde_json::from_str::<T>(content)?,
            ConfigFormat::Toml => toml::from_str::<T>(content)?,
        };
        Ok(value)
    }
}

/// Load a config document from a YAML, JSON or TOML file.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> CoreResult<T> {
    let format =
        ConfigFormat::from_path(path).ok_or_else(|| CoreError::UnsupportedFormat(path.to_path_buf()))?;
    debug!("Loading {:?} as {:?}", path, format);
    let content = fs::read_to_string(path)?;
    format.parse(&content)
}
