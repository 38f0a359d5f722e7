//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "MEDIALOG_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "medialog.db";

/// Default tracing filter when neither RUST_LOG nor the config file sets one
pub const DEFAULT_LOG_LEVEL: &str = "medialog_pl=info,medialog_common=info";

/// Contents of the optional `config.toml`
///
/// Every field is optional; a missing file is equivalent to an empty one.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Folder holding the database
    pub root_folder: Option<PathBuf>,
    /// Tracing filter directive, e.g. `medialog_pl=debug`
    pub log_level: Option<String>,
    /// UUID of the active user
    pub user: Option<String>,
}

impl TomlConfig {
    /// Parse config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Load config from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load config from the platform location, falling back to defaults
    ///
    /// A missing file is not an error. An unreadable or malformed file is
    /// logged and ignored.
    pub fn load_or_default() -> Self {
        let Ok(path) = config_file_path() else {
            debug!("No config file found, using defaults");
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => {
                debug!("Loaded config file: {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Database path inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE_NAME)
}

/// Get configuration file path for the platform
///
/// Returns an error when no config file exists.
pub fn config_file_path() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/medialog/config.toml first, then /etc/medialog/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("medialog").join("config.toml"));
        let system_config = PathBuf::from("/etc/medialog/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    }

    let path = dirs::config_dir()
        .map(|d| d.join("medialog").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", path)))
    }
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/medialog
        dirs::data_local_dir()
            .map(|d| d.join("medialog"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/medialog"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/medialog
        dirs::data_dir()
            .map(|d| d.join("medialog"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/medialog"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\medialog
        dirs::data_local_dir()
            .map(|d| d.join("medialog"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\medialog"))
    } else {
        PathBuf::from("./medialog_data")
    }
}
