//! Configuration I/O (YAML loading)

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ConfigError, ConfigResult, StatusCacheConfig};

/// Schema versions this build can read
pub const SUPPORTED_VERSIONS: &[u32] = &[1];

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileV1 {
    /// Schema version (always 1 for v1)
    pub version: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_cache: Option<StatusCacheConfig>,
}

impl StatusCacheConfig {
    /// Load and validate a YAML configuration file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let file: ConfigFileV1 = serde_yaml::from_str(yaml)?;

        match file.version {
            None => return Err(ConfigError::MissingVersion),
            Some(found) if !SUPPORTED_VERSIONS.contains(&found) => {
                return Err(ConfigError::UnsupportedVersion {
                    found,
                    supported: SUPPORTED_VERSIONS.to_vec(),
                })
            }
            Some(_) => {}
        }

        let config = file.status_cache.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        let file = ConfigFileV1 {
            version: Some(1),
            status_cache: Some(self.clone()),
        };
        Ok(serde_yaml::to_string(&file)?)
    }
}
