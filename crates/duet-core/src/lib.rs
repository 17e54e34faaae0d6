pub mod config;
pub mod conversation;
pub mod discussion;
pub mod error;
pub mod patch;
pub mod persona;
pub mod provider;

// Re-export common error type
pub use error::{DuetError, Result};
