use std::path::Path;

use crate::config::schema::SourceConfig;
use crate::error::ConfigError;

/// Reads and parses a declarative source config file.
pub fn load_source_config<P: AsRef<Path>>(path: P) -> Result<SourceConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_source_config_from_str(&content).map_err(|e| match e {
        ConfigError::ParseYaml { source, .. } => ConfigError::ParseYaml {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

pub fn load_source_config_from_str(content: &str) -> Result<SourceConfig, ConfigError> {
    // An empty document is an empty config, not a parse error.
    if content.trim().is_empty() {
        return Ok(SourceConfig::default());
    }

    serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
        path: Default::default(),
        source: e,
    })
}
