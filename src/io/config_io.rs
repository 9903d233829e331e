use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Read daybook.toml from the data directory. A missing file means defaults.
pub fn load_config(data_dir: &Path) -> Result<Config, ConfigError> {
    let path = data_dir.join(crate::io::layout::CONFIG_FILE);
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = fs::read_to_string(&path).map_err(|e| ConfigError::Read {
        path: path.clone(),
        source: e,
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::Parse { path, source: e })
}

/// Apply environment overrides (`LLM_PROVIDER`, `LLM_MODEL`)
pub fn apply_env_overrides(config: &mut Config) {
    if let Ok(provider) = std::env::var("LLM_PROVIDER")
        && !provider.trim().is_empty()
    {
        config.llm.provider = Some(provider.trim().to_string());
    }
    if let Ok(model) = std::env::var("LLM_MODEL")
        && !model.trim().is_empty()
    {
        config.llm.model = Some(model.trim().to_string());
    }
}
