//! Configuration types and parsing for qa.yml

use crate::error::{CoreError, CoreResult};
use crate::project::GenerationSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Workspace configuration from qa.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Workspace name
    pub name: String,

    /// Actor recorded in the audit log when `--actor` is not given
    #[serde(default)]
    pub actor: Option<String>,

    /// Output directory holding the metadata database
    #[serde(default = "default_target_path")]
    pub target_path: String,

    /// Generation defaults applied to projects created without settings
    #[serde(default)]
    pub generation: GenerationSettings,

    /// Script validation settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Dashboard metric settings
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Script validation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    /// Rule names to skip, e.g. `hard-waits`
    #[serde(default)]
    pub disabled_rules: Vec<String>,
}

impl ValidationConfig {
    pub fn is_disabled(&self, rule: &str) -> bool {
        self.disabled_rules.iter().any(|r| r == rule)
    }
}

/// Dashboard metric settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Number of most recent finished executions inspected for flaky tests
    #[serde(default = "default_flaky_window")]
    pub flaky_window: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            flaky_window: default_flaky_window(),
        }
    }
}

fn default_target_path() -> String {
    "target".to_string()
}

fn default_flaky_window() -> usize {
    5
}

/// Name of the metadata database inside the target directory
pub const META_DB_FILE: &str = "meta.duckdb";

const CONFIG_FILES: [&str; 2] = ["qa.yml", "qa.yaml"];

impl Config {
    /// Configuration written by `qa init`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actor: None,
            target_path: default_target_path(),
            generation: GenerationSettings::default(),
            validation: ValidationConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }

    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a workspace directory
    /// Looks for qa.yml or qa.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
            .map(|path| Self::load(&path))
            .unwrap_or_else(|| {
                Err(CoreError::ConfigNotFound {
                    path: dir.join(CONFIG_FILES[0]).display().to_string(),
                })
            })
    }

    /// Whether `dir` already holds a config file
    pub fn exists_in(dir: &Path) -> bool {
        CONFIG_FILES.iter().any(|name| dir.join(name).exists())
    }

    /// Write this configuration as `qa.yml` in `dir`
    pub fn write_to_dir(&self, dir: &Path) -> CoreResult<PathBuf> {
        self.validate()?;
        let path = dir.join(CONFIG_FILES[0]);
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(&path, yaml).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "name cannot be empty".to_string(),
            });
        }
        if self.target_path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "target_path cannot be empty".to_string(),
            });
        }
        if self.metrics.flaky_window == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "metrics.flaky_window must be at least 1".to_string(),
            });
        }
        if let Some(actor) = &self.actor {
            if actor.trim().is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: "actor cannot be blank".to_string(),
                });
            }
        }
        self.generation
            .validate()
            .map_err(|e| CoreError::ConfigInvalid {
                message: format!("generation: {e}"),
            })
    }

    /// Absolute target directory for a workspace rooted at `root`
    pub fn target_path_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.target_path)
    }

    /// Path of the metadata database for a workspace rooted at `root`
    pub fn meta_db_path(&self, root: &Path) -> PathBuf {
        self.target_path_absolute(root).join(META_DB_FILE)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
