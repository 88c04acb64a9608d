//! User configuration loading for reflens.
//!
//! User config location: `$XDG_CONFIG_HOME/reflens/reflens.toml`, falling
//! back to the platform config directory (`~/.config` on Linux).

use std::path::PathBuf;
use thiserror::Error;

use super::ReflensSettings;

pub const CONFIG_FILE_NAME: &str = "reflens.toml";
const CONFIG_DIR_NAME: &str = "reflens";

#[derive(Debug, Error)]
pub enum UserConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

pub type UserConfigResult<T> = Result<T, UserConfigError>;

/// Returns the path to the user configuration file.
///
/// Returns None if no config directory can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)?;
    Some(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load the user configuration file.
///
/// A missing file is `Ok(None)`; an unreadable or malformed file is an error.
pub fn load_user_config() -> UserConfigResult<Option<ReflensSettings>> {
    let Some(path) = user_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|source| UserConfigError::Read {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&contents)
        .map(Some)
        .map_err(|source| UserConfigError::Parse { path, source })
}
