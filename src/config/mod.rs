// Configuration management module
// TOML configuration and interactive setup

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    CatalogConfig, Config, ConfigError, OllamaConfig, RetrievalConfig, ServerConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("skin-advisor"))
        .ok_or(ConfigError::DirectoryError)
}
