pub mod builder;
pub mod defaults;
pub mod file;
pub mod models;

use directories::ProjectDirs;
use std::path::PathBuf;

pub const CONFIG_FILE: &str = "config.toml";

/// `<platform config dir>/msdprep/config.toml`, when the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("edu", "unc", "msdprep").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}
