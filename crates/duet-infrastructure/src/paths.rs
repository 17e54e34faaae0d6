//! Path resolution for duet configuration files.
//!
//! ```text
//! <config_dir>/duet/         # e.g. ~/.config/duet on Linux
//! └── config.toml            # AppSettings
//! ```

use std::path::PathBuf;
use thiserror::Error;

const APP_DIR_NAME: &str = "duet";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    /// The platform config directory could not be determined.
    #[error("Cannot determine the user configuration directory")]
    ConfigDirNotFound,
}

pub struct DuetPaths;

impl DuetPaths {
    /// Returns the duet configuration directory.
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to `config.toml`.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }
}
