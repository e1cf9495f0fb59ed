use crate::core::config_resolver::{ConfigDiagnostic, ConfigResolution, resolve};
use crate::domain::config::Config;
use anyhow::{Context, bail};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Names looked up in the project root, in order.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["cpb.config.json", ".cpbrc", ".cpb.json"];

pub const DEFAULT_CONFIG_FILE: &str = "cpb.config.json";

pub fn find_config_file(project_path: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| project_path.join(name))
        .find(|candidate| candidate.is_file())
}

/// Loads the explicit config file, or the first discovered one, merged onto
/// the defaults. Missing files are not an error.
pub fn load_config(project_path: &Path, explicit: Option<&Path>) -> ConfigResolution {
    let defaults = Config::default();
    let config_file = explicit
        .map(Path::to_path_buf)
        .or_else(|| find_config_file(project_path));

    let Some(config_file) = config_file else {
        info!("No configuration file found, using defaults");
        return ConfigResolution::resolved(defaults);
    };

    info!("Loading configuration from {}", config_file.display());
    match fs::read_to_string(&config_file) {
        Ok(text) => resolve(&defaults, Some(&text)),
        Err(e) => ConfigResolution::fallback(
            &defaults,
            ConfigDiagnostic::Unreadable {
                path: config_file,
                message: e.to_string(),
            },
        ),
    }
}

/// Writes the default configuration as pretty JSON into `directory`.
pub fn write_default_config(directory: &Path, force: bool) -> anyhow::Result<PathBuf> {
    let config_path = directory.join(DEFAULT_CONFIG_FILE);
    debug!("Target config path: {}", config_path.display());

    if !force && config_path.exists() {
        bail!("Configuration file already exists. Use --force to overwrite.");
    }

    let json = serde_json::to_string_pretty(&Config::default())?;
    fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create directory {}", directory.display()))?;
    fs::write(&config_path, json)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    Ok(config_path)
}
