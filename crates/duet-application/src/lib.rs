pub mod orchestrator;
pub mod prompt;
pub mod session;
pub mod turn;

pub use orchestrator::{DiscussionOrchestrator, RunOutcome};
pub use session::{DiscussionSession, ProviderResolver, SettingsProviderResolver};
pub use turn::{TurnExecutor, TurnOutput};
