use tokio::sync::watch;

use super::model::Conversation;
use super::state::{ConversationState, ConversationUpdate};

/// Owns the active [`ConversationState`] and broadcasts every change.
///
/// All writers go through [`ConversationHolder::apply`], so each update is
/// observed whole by subscribers.
#[derive(Debug)]
pub struct ConversationHolder {
    tx: watch::Sender<ConversationState>,
}

impl ConversationHolder {
    pub fn new(conversation: Conversation) -> Self {
        let (tx, _rx) = watch::channel(ConversationState::new(conversation));
        Self { tx }
    }

    pub fn apply(&self, update: ConversationUpdate) {
        self.tx.send_modify(|state| state.reduce(update));
    }

    /// Applies `update` only while `conversation_id` is the active conversation.
    ///
    /// Returns `false` and drops the update once that conversation was replaced.
    pub fn apply_to(&self, conversation_id: &str, update: ConversationUpdate) -> bool {
        self.tx.send_if_modified(|state| {
            if state.conversation.id != conversation_id {
                tracing::debug!(
                    conversation_id,
                    active = %state.conversation.id,
                    "dropping update for inactive conversation"
                );
                return false;
            }
            state.reduce(update);
            true
        })
    }

    /// Sets `running` unless a run is already active. Returns whether it did.
    pub fn try_begin_run(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if state.running {
                false
            } else {
                state.running = true;
                true
            }
        })
    }

    pub fn snapshot(&self) -> ConversationState {
        self.tx.borrow().clone()
    }

    pub fn document(&self) -> String {
        self.tx.borrow().conversation.document.clone()
    }

    pub fn is_running(&self) -> bool {
        self.tx.borrow().running
    }

    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.tx.subscribe()
    }
}
