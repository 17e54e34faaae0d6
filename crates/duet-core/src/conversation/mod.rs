//! Conversation domain module.

mod failed_step;
mod holder;
mod message;
mod model;
mod state;

pub use failed_step::FailedStep;
pub use holder::ConversationHolder;
pub use message::{Message, MessagePurpose, PLACEHOLDER_TEXT, Sender};
pub use model::{Conversation, DEFAULT_TITLE};
pub use state::{ConversationState, ConversationUpdate};
