use std::fs;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CACHE_FILE;
use crate::domain::SourceKind;
use crate::error::AssembleError;
use crate::resolver::FilenamePattern;

pub const DEFAULT_CONFIG_FILE: &str = "kira-sa.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub cache_path: Option<String>,
    #[serde(default)]
    pub use_time_cache: Option<bool>,
    #[serde(default)]
    pub patterns: PatternOverrides,
    #[serde(default)]
    pub inputs: InputLists,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PatternOverrides {
    #[serde(default)]
    pub behavior: Option<String>,
    #[serde(default)]
    pub light: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputLists {
    #[serde(default)]
    pub behavior: Vec<String>,
    #[serde(default)]
    pub light: Vec<String>,
    #[serde(default)]
    pub time: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Patterns {
    pub behavior: FilenamePattern,
    pub light: FilenamePattern,
    pub time: FilenamePattern,
}

impl Default for Patterns {
    fn default() -> Self {
        Self {
            behavior: FilenamePattern::for_source(SourceKind::Behavior),
            light: FilenamePattern::for_source(SourceKind::LightMicroscopy),
            time: FilenamePattern::for_source(SourceKind::Time),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub cache_path: Utf8PathBuf,
    pub use_time_cache: bool,
    pub patterns: Patterns,
    pub inputs: InputLists,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            cache_path: Utf8PathBuf::from(DEFAULT_CACHE_FILE),
            use_time_cache: true,
            patterns: Patterns::default(),
            inputs: InputLists::default(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must exist; a missing implicit `kira-sa.json` means defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, AssembleError> {
        let config_path = Utf8PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));

        if path.is_none() && !config_path.as_std_path().exists() {
            return Ok(ResolvedConfig::default());
        }

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| AssembleError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| AssembleError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, AssembleError> {
        let pattern = |kind: SourceKind, custom: Option<String>| match custom {
            Some(expression) => FilenamePattern::custom(kind, &expression),
            None => Ok(FilenamePattern::for_source(kind)),
        };

        let patterns = Patterns {
            behavior: pattern(SourceKind::Behavior, config.patterns.behavior)?,
            light: pattern(SourceKind::LightMicroscopy, config.patterns.light)?,
            time: pattern(SourceKind::Time, config.patterns.time)?,
        };

        Ok(ResolvedConfig {
            cache_path: Utf8PathBuf::from(
                config
                    .cache_path
                    .unwrap_or_else(|| DEFAULT_CACHE_FILE.to_string()),
            ),
            use_time_cache: config.use_time_cache.unwrap_or(true),
            patterns,
            inputs: config.inputs,
        })
    }
}
