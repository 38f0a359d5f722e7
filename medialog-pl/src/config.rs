//! Bootstrap configuration for medialog-pl
//!
//! Sources, highest priority first:
//! 1. Command-line arguments (--root-folder, --user)
//! 2. Environment variable (MEDIALOG_ROOT_FOLDER)
//! 3. TOML configuration file
//! 4. Built-in defaults

use crate::error::{Error, Result};
use medialog_common::config::{
    database_path, resolve_root_folder, TomlConfig, DEFAULT_LOG_LEVEL, ROOT_FOLDER_ENV,
};
use medialog_common::db::LOCAL_USER_GUID;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub root_folder: PathBuf,
    pub db_path: PathBuf,
    /// User whose lists are read and written
    pub user_id: Uuid,
    /// Tracing filter used when RUST_LOG is unset
    pub log_level: String,
}

impl Config {
    /// Resolve against an already loaded TOML config
    pub fn resolve(
        cli_root_folder: Option<&Path>,
        cli_user: Option<&str>,
        toml: &TomlConfig,
    ) -> Result<Self> {
        let root_folder = resolve_root_folder(cli_root_folder, ROOT_FOLDER_ENV, toml);

        let user = cli_user.or(toml.user.as_deref()).unwrap_or(LOCAL_USER_GUID);
        let user_id = Uuid::parse_str(user.trim())
            .map_err(|e| Error::Config(format!("Invalid user id '{}': {}", user, e)))?;

        Ok(Self {
            db_path: database_path(&root_folder),
            root_folder,
            user_id,
            log_level: toml
                .log_level
                .clone()
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }

    /// Resolve using the platform config file, if one exists
    pub fn load(cli_root_folder: Option<&Path>, cli_user: Option<&str>) -> Result<Self> {
        Self::resolve(cli_root_folder, cli_user, &TomlConfig::load_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_values_win() {
        let toml = TomlConfig {
            root_folder: Some(PathBuf::from("/from/toml")),
            log_level: Some("medialog_pl=debug".to_string()),
            user: Some(Uuid::new_v4().to_string()),
        };
        let user = Uuid::new_v4();

        let config =
            Config::resolve(Some(Path::new("/from/cli")), Some(&user.to_string()), &toml).unwrap();

        assert_eq!(config.root_folder, PathBuf::from("/from/cli"));
        assert_eq!(config.db_path, PathBuf::from("/from/cli/medialog.db"));
        assert_eq!(config.user_id, user);
        assert_eq!(config.log_level, "medialog_pl=debug");
    }

    #[test]
    fn test_defaults_to_local_user() {
        let config = Config::resolve(Some(Path::new("/tmp/x")), None, &TomlConfig::default()).unwrap();

        assert_eq!(config.user_id.to_string(), LOCAL_USER_GUID);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_malformed_user_rejected() {
        let result = Config::resolve(Some(Path::new("/tmp/x")), Some("not-a-uuid"), &TomlConfig::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
