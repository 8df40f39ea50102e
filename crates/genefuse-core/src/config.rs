use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::distribute::DEFAULT_THREADS;
use crate::eval::DEFAULT_MAX_THRESHOLD;
use crate::fusion::FusionConfig;

/// File looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "genefuse.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default)]
    pub serial: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            serial: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default = "default_true")]
    pub exclude_seeds: bool,
    #[serde(default = "default_max_threshold")]
    pub max_threshold: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            exclude_seeds: default_true(),
            max_threshold: default_max_threshold(),
        }
    }
}

/// Load `explicit` if given, else `genefuse.toml` under `dir`, else defaults.
///
/// # Errors
///
/// Fails when an explicit path does not exist, or when the file cannot be
/// read or parsed (including a bias above 100).
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<ProjectConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("Config file {} does not exist", path.display());
            }
            path.to_path_buf()
        }
        None => {
            let path = dir.join(CONFIG_FILE_NAME);
            if !path.exists() {
                return Ok(ProjectConfig::default());
            }
            path
        }
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

const fn default_true() -> bool {
    true
}

const fn default_threads() -> usize {
    DEFAULT_THREADS
}

const fn default_max_threshold() -> usize {
    DEFAULT_MAX_THRESHOLD
}
