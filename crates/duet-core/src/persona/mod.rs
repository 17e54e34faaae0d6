//! Persona domain module.

mod model;
pub mod preset;

pub use model::Persona;
