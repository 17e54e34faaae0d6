//! Runtime plumbing shared by the front-ends: tracing bootstrap and the
//! discussion event stream.

pub mod event_layer;
pub mod logging;

pub use event_layer::{DiscussionEvent, DiscussionEventLayer};
pub use logging::{TracingConfig, init_tracing};
