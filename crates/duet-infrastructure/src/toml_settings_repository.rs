//! TOML-backed settings repository.

use std::path::PathBuf;

use async_trait::async_trait;
use duet_core::config::{AppSettings, SettingsRepository};
use duet_core::{DuetError, Result};

use crate::env_overlay::CredentialOverlay;
use crate::paths::DuetPaths;
use crate::storage::{AtomicTomlError, AtomicTomlFile};

/// Stores [`AppSettings`] in a single TOML file.
#[derive(Debug, Clone)]
pub struct TomlSettingsRepository {
    file: AtomicTomlFile<AppSettings>,
    overlay: CredentialOverlay,
}

impl TomlSettingsRepository {
    /// Uses `<config_dir>/duet/config.toml` and the process environment.
    pub fn new() -> Result<Self> {
        let path = DuetPaths::config_file().map_err(|e| DuetError::config(e.to_string()))?;
        Ok(Self::with_path(path, CredentialOverlay::from_env()))
    }

    pub fn with_path(path: impl Into<PathBuf>, overlay: CredentialOverlay) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
            overlay,
        }
    }

    pub fn path(&self) -> &std::path::Path {
        self.file.path()
    }
}

#[async_trait]
impl SettingsRepository for TomlSettingsRepository {
    async fn load(&self) -> Result<AppSettings> {
        let file = self.file.clone();
        let stored = tokio::task::spawn_blocking(move || file.load())
            .await
            .map_err(|e| DuetError::internal(format!("Settings load task failed: {e}")))?
            .map_err(storage_error)?;

        let mut settings = match stored {
            Some(settings) => settings,
            None => {
                tracing::info!(path = %self.file.path().display(), "no settings file, using defaults");
                AppSettings::default()
            }
        };
        self.overlay.apply(&mut settings.provider);
        Ok(settings)
    }

    async fn save(&self, settings: &AppSettings) -> Result<()> {
        let mut stored = settings.clone();
        self.overlay.strip(&mut stored.provider);

        let file = self.file.clone();
        tokio::task::spawn_blocking(move || file.save(&stored))
            .await
            .map_err(|e| DuetError::internal(format!("Settings save task failed: {e}")))?
            .map_err(storage_error)?;
        tracing::debug!(path = %self.file.path().display(), "settings saved");
        Ok(())
    }
}

fn storage_error(err: AtomicTomlError) -> DuetError {
    match err {
        AtomicTomlError::Io(io) => io.into(),
        AtomicTomlError::Parse(parse) => parse.into(),
        AtomicTomlError::Serialize(ser) => ser.into(),
        other => DuetError::io(other.to_string()),
    }
}
