pub mod env_overlay;
pub mod paths;
pub mod storage;
pub mod toml_settings_repository;

pub use crate::env_overlay::CredentialOverlay;
pub use crate::paths::DuetPaths;
pub use crate::toml_settings_repository::TomlSettingsRepository;
