use crate::{AppConfig, CfgDiffError};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "cfgdiff.toml";

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
    pub exists: bool,
}

/// Load the configuration from `explicit` or from the platform config
/// directory. A missing file yields the defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, CfgDiffError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };
    let exists = path.exists();

    let config = if exists {
        let data = fs::read_to_string(&path)?;
        toml::from_str(&data).map_err(|e| CfgDiffError::Serialization(e.to_string()))?
    } else {
        AppConfig::default()
    };

    Ok(LoadedConfig {
        config,
        path,
        exists,
    })
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), CfgDiffError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let data = toml::to_string_pretty(config)
        .map_err(|e| CfgDiffError::Serialization(e.to_string()))?;
    fs::write(path, data)?;
    Ok(())
}

pub fn default_cache_dir() -> Result<PathBuf, CfgDiffError> {
    let dirs = project_dirs()?;
    Ok(dirs.cache_dir().to_path_buf())
}

fn default_config_path() -> Result<PathBuf, CfgDiffError> {
    let dirs = project_dirs()?;
    Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn project_dirs() -> Result<ProjectDirs, CfgDiffError> {
    ProjectDirs::from("", "cfgdiff", "cfgdiff")
        .ok_or_else(|| CfgDiffError::Config("Unable to determine config directory".to_string()))
}
