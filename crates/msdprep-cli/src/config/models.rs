use msdprep::engine::config as core_config;
use std::path::PathBuf;

pub struct AppConfig {
    pub species_path: PathBuf,
    pub job_options: core_config::JobOptions,
}
