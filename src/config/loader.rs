//! Configuration file discovery and loading.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::merger::merge_configs;
use crate::config::schema::PipelineConfig;
use crate::error::{PipewaveError, Result};

/// Name of the per-project configuration directory.
pub const CONFIG_DIR: &str = ".pipewave";

/// Paths to configuration files in priority order (later overrides earlier).
///
/// Merge order:
/// 1. User global config (`~/.pipewave/config.yml`)
/// 2. Project config (`.pipewave/config.yml`)
/// 3. Local overrides (`.pipewave/config.local.yml`)
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// User's global config: ~/.pipewave/config.yml
    pub user_global: Option<PathBuf>,

    /// Project config: .pipewave/config.yml
    pub project: Option<PathBuf>,

    /// Local overrides: .pipewave/config.local.yml
    pub project_local: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover config files for the given project root.
    pub fn discover(project_root: &Path) -> Self {
        Self {
            user_global: dirs::home_dir()
                .map(|home| home.join(CONFIG_DIR).join("config.yml"))
                .filter(|p| p.is_file()),
            project: existing(project_config_path(project_root)),
            project_local: existing(project_root.join(CONFIG_DIR).join("config.local.yml")),
        }
    }

    /// Returns all existing config paths in merge order.
    pub fn all_existing(&self) -> Vec<&PathBuf> {
        [&self.user_global, &self.project, &self.project_local]
            .into_iter()
            .flatten()
            .collect()
    }

    /// Check if a project config exists.
    pub fn has_project_config(&self) -> bool {
        self.project.is_some()
    }
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

/// Location of the project config under `project_root`.
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR).join("config.yml")
}

/// Find the project root by walking up from `start`.
///
/// A directory containing `.pipewave` wins; a `.git` directory is the
/// fallback marker.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_DIR).is_dir() || dir.join(".git").exists())
        .map(Path::to_path_buf)
}

/// Load a single config file.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist and
/// `ConfigParseError` if the YAML is invalid.
pub fn load_config_file(path: &Path) -> Result<PipelineConfig> {
    let value = load_config_value(path)?;
    from_value(value, path)
}

/// Parse YAML content into a config.
pub fn parse_config(content: &str, source_path: &Path) -> Result<PipelineConfig> {
    serde_yaml::from_str(content).map_err(|e| PipewaveError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load a config file as a raw YAML value, for merging.
///
/// An empty file loads as an empty mapping.
pub fn load_config_value(path: &Path) -> Result<serde_yaml::Value> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PipewaveError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            PipewaveError::Io(e)
        }
    })?;

    let value: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|e| PipewaveError::ConfigParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok(match value {
        serde_yaml::Value::Null => serde_yaml::Value::Mapping(Default::default()),
        other => other,
    })
}

fn from_value(value: serde_yaml::Value, path: &Path) -> Result<PipelineConfig> {
    serde_yaml::from_value(value).map_err(|e| PipewaveError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load and merge all config files for a project.
///
/// # Errors
///
/// Returns `ConfigNotFound` if no project config exists, and
/// `ConfigParseError` if any layer is invalid.
pub fn load_merged_config(project_root: &Path) -> Result<PipelineConfig> {
    let paths = ConfigPaths::discover(project_root);

    if !paths.has_project_config() {
        return Err(PipewaveError::ConfigNotFound {
            path: project_config_path(project_root),
        });
    }

    let layers = paths
        .all_existing()
        .into_iter()
        .map(|path| {
            debug!(path = %path.display(), "loading config layer");
            load_config_value(path)
        })
        .collect::<Result<Vec<_>>>()?;

    from_value(merge_configs(&layers), &project_config_path(project_root))
}

/// Load config with an optional path override.
///
/// An explicit path is loaded alone, without merging.
pub fn load_config(project_root: &Path, config_override: Option<&Path>) -> Result<PipelineConfig> {
    match config_override {
        Some(path) => load_config_file(path),
        None => load_merged_config(project_root),
    }
}
