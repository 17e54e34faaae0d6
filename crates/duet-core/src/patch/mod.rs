//! Shared notepad patch engine.
//!
//! Personas edit the shared document by embedding `<np-*>` tags in their
//! responses. [`parse`] separates those tags from the spoken text and
//! [`apply`] interprets the resulting operations against the document.
//!
//! # Module Structure
//!
//! - `operation`: the closed set of edit operations (`PatchOperation`)
//! - `parser`: tokenizer turning raw text into `ParsedResponse`
//! - `apply`: in-order interpreter over a document string

mod apply;
mod operation;
mod parser;

pub use apply::apply;
pub use operation::PatchOperation;
pub use parser::{ParsedResponse, parse};
