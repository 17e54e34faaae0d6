//! Presentation facade over one active conversation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use duet_core::config::{AppSettings, ProviderSettings, SettingsRepository};
use duet_core::conversation::{
    Conversation, ConversationHolder, ConversationState, ConversationUpdate, Message,
};
use duet_core::provider::ModelProvider;
use duet_core::{DuetError, Result};
use duet_interaction::ProviderClient;
use tokio::sync::{Mutex, RwLock, watch};
use tokio_util::sync::CancellationToken;

use crate::orchestrator::{DiscussionOrchestrator, RunOutcome};
use crate::prompt::PromptBuilder;

/// Turns provider settings into a usable backend.
#[async_trait]
pub trait ProviderResolver: Send + Sync {
    /// Returns the provider a run should use.
    ///
    /// # Errors
    ///
    /// [`DuetError::Config`] when no provider is usable.
    fn resolve(&self, settings: &ProviderSettings) -> Result<Arc<dyn ModelProvider>>;

    /// Lists the models offered by the active provider.
    async fn list_models(&self, settings: &ProviderSettings) -> Result<Vec<String>>;
}

/// Resolves to the HTTP [`ProviderClient`] selected by the settings.
#[derive(Debug, Default, Clone, Copy)]
pub struct SettingsProviderResolver;

#[async_trait]
impl ProviderResolver for SettingsProviderResolver {
    fn resolve(&self, settings: &ProviderSettings) -> Result<Arc<dyn ModelProvider>> {
        Ok(Arc::new(ProviderClient::select(settings)?))
    }

    async fn list_models(&self, settings: &ProviderSettings) -> Result<Vec<String>> {
        let client = ProviderClient::select(settings)?;
        Ok(client.list_models().await?)
    }
}

/// A background run, shared by everyone who cancels or waits on it.
#[derive(Clone)]
struct ActiveRun {
    id: u64,
    cancel: CancellationToken,
    /// Becomes `Some` once the run task has settled.
    settled: watch::Receiver<Option<Result<RunOutcome>>>,
}

impl ActiveRun {
    async fn outcome(mut self) -> Result<RunOutcome> {
        let settled = self
            .settled
            .wait_for(Option::is_some)
            .await
            .map_err(|_| DuetError::internal("Discussion task ended without reporting"))?;
        (*settled)
            .clone()
            .unwrap_or_else(|| Err(DuetError::internal("Discussion task ended without reporting")))
    }
}

/// The surface a front-end drives.
///
/// Owns the active conversation, the current settings and at most one
/// background run. Every mutation of the conversation is published through
/// [`DiscussionSession::subscribe`].
pub struct DiscussionSession {
    holder: Arc<ConversationHolder>,
    settings: RwLock<AppSettings>,
    repository: Option<Arc<dyn SettingsRepository>>,
    resolver: Arc<dyn ProviderResolver>,
    prompts: Arc<PromptBuilder>,
    /// The latest run. Kept until someone observes its settlement so that
    /// `cancel` always reaches it.
    active: Mutex<Option<ActiveRun>>,
    next_run_id: AtomicU64,
}

impl DiscussionSession {
    /// Creates a session with a fresh conversation built from `settings`.
    pub fn new(settings: AppSettings, resolver: Arc<dyn ProviderResolver>) -> Result<Self> {
        let conversation = Conversation::new(settings.initial_document.clone());
        Ok(Self {
            holder: Arc::new(ConversationHolder::new(conversation)),
            settings: RwLock::new(settings),
            repository: None,
            resolver,
            prompts: Arc::new(PromptBuilder::new()?),
            active: Mutex::new(None),
            next_run_id: AtomicU64::new(0),
        })
    }

    /// Loads settings from `repository` and persists later changes there.
    pub async fn load(
        repository: Arc<dyn SettingsRepository>,
        resolver: Arc<dyn ProviderResolver>,
    ) -> Result<Self> {
        let settings = repository.load().await?;
        let mut session = Self::new(settings, resolver)?;
        session.repository = Some(repository);
        Ok(session)
    }

    /// Starts a discussion run for a new user request.
    ///
    /// Returns once the request is recorded; the debate continues in the
    /// background. Use [`DiscussionSession::wait_for_run`] to await it.
    ///
    /// # Errors
    ///
    /// - [`DuetError::Config`] if no provider is usable (nothing is recorded)
    /// - [`DuetError::Busy`] if a run or retry is already active
    pub async fn submit(&self, text: &str, image: Option<String>) -> Result<()> {
        let settings = self.settings.read().await.clone();
        let provider = self.resolver.resolve(&settings.provider)?;

        let mut active = self.active.lock().await;
        if !self.holder.try_begin_run() {
            return Err(DuetError::Busy);
        }

        let orchestrator = DiscussionOrchestrator::new(
            self.holder.clone(),
            provider,
            self.prompts.clone(),
            settings.discussion,
        );
        orchestrator.begin(Message::user(text, image));

        let conversation_id = orchestrator.conversation_id().to_string();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let query = text.to_string();
        *active = Some(self.spawn_run(conversation_id, cancel, async move {
            orchestrator.run(&query, &token).await
        }));
        Ok(())
    }

    /// Replays the most recent failed turn.
    ///
    /// # Errors
    ///
    /// - [`DuetError::Busy`] if a run or retry is already active
    /// - [`DuetError::NoFailedStep`] if nothing failed
    /// - [`DuetError::Config`] if no provider is usable
    pub async fn retry_failed_step(&self) -> Result<()> {
        if self.holder.is_running() {
            return Err(DuetError::Busy);
        }
        let step = self
            .holder
            .snapshot()
            .failed_step
            .ok_or(DuetError::NoFailedStep)?;
        let settings = self.settings.read().await.clone();
        let provider = self.resolver.resolve(&settings.provider)?;

        let mut active = self.active.lock().await;
        if !self.holder.try_begin_run() {
            return Err(DuetError::Busy);
        }

        let orchestrator = DiscussionOrchestrator::new(
            self.holder.clone(),
            provider,
            self.prompts.clone(),
            settings.discussion,
        );
        let conversation_id = orchestrator.conversation_id().to_string();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        *active = Some(self.spawn_run(conversation_id, cancel, async move {
            orchestrator.retry(step, &token).await
        }));
        Ok(())
    }

    /// Spawns `run` and a watcher that publishes its outcome.
    fn spawn_run<F>(&self, conversation_id: String, cancel: CancellationToken, run: F) -> ActiveRun
    where
        F: Future<Output = RunOutcome> + Send + 'static,
    {
        let id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let (tx, settled) = watch::channel(None);
        let holder = self.holder.clone();
        let task = tokio::spawn(run);

        tokio::spawn(async move {
            let result = match task.await {
                Ok(outcome) => Ok(outcome),
                Err(err) => {
                    // The run task died without settling; settle on its behalf.
                    for update in [
                        ConversationUpdate::AbandonTurn,
                        ConversationUpdate::DropPending,
                        ConversationUpdate::SetRunning(false),
                    ] {
                        holder.apply_to(&conversation_id, update);
                    }
                    Err(DuetError::internal(format!("Discussion task failed: {err}")))
                }
            };
            let _ = tx.send(Some(result));
        });

        ActiveRun {
            id,
            cancel,
            settled,
        }
    }

    /// Requests cancellation of the active run. Harmless when idle or repeated.
    pub async fn cancel(&self) {
        if let Some(run) = self.active.lock().await.as_ref() {
            run.cancel.cancel();
        }
    }

    /// Waits for the active run to settle and returns how it ended.
    ///
    /// Several callers may wait on the same run; cancellation keeps working
    /// while they do. Returns `Ok(None)` when no run was started since the
    /// last completed wait.
    pub async fn wait_for_run(&self) -> Result<Option<RunOutcome>> {
        let run = self.active.lock().await.clone();
        let Some(run) = run else {
            return Ok(None);
        };
        let id = run.id;
        let outcome = run.outcome().await;

        let mut active = self.active.lock().await;
        if active.as_ref().is_some_and(|current| current.id == id) {
            *active = None;
        }
        outcome.map(Some)
    }

    /// Replaces the active conversation with a fresh one.
    ///
    /// Any active run is cancelled and awaited first. Returns the previous
    /// conversation so the caller can keep it.
    pub async fn start_new_conversation(&self) -> Conversation {
        let initial_document = self.settings.read().await.initial_document.clone();
        self.install(Conversation::new(initial_document)).await
    }

    /// Makes `conversation` the active one and returns the previous one.
    pub async fn switch_conversation(&self, conversation: Conversation) -> Conversation {
        self.install(conversation).await
    }

    async fn install(&self, conversation: Conversation) -> Conversation {
        // Held throughout so no run can start between settling and replacing.
        let mut active = self.active.lock().await;
        if let Some(run) = active.take() {
            run.cancel.cancel();
            if let Err(err) = run.outcome().await {
                tracing::warn!(%err, "active run ended abnormally while stopping");
            }
        }

        let previous = self.holder.snapshot().conversation;
        tracing::info!(from = %previous.id, to = %conversation.id, "switching conversation");
        self.holder.apply(ConversationUpdate::Replace(conversation));
        // A stored conversation may carry placeholders from an interrupted run.
        self.holder.apply(ConversationUpdate::DropPending);
        previous
    }

    /// User edit of the notepad. Deferred until the in-flight turn ends, if any.
    pub fn edit_document(&self, content: impl Into<String>) {
        self.holder.apply(ConversationUpdate::EditDocument(content.into()));
    }

    pub async fn settings(&self) -> AppSettings {
        self.settings.read().await.clone()
    }

    /// Replaces the settings used by future runs, persisting them first when
    /// a repository is attached. An active run keeps its own snapshot.
    pub async fn update_settings(&self, settings: AppSettings) -> Result<()> {
        if let Some(repository) = &self.repository {
            repository.save(&settings).await?;
        }
        *self.settings.write().await = settings;
        Ok(())
    }

    /// Lists models offered by the currently selected provider.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let settings = self.settings.read().await.clone();
        self.resolver.list_models(&settings.provider).await
    }

    pub fn snapshot(&self) -> ConversationState {
        self.holder.snapshot()
    }

    /// Receiver that observes the full state after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.holder.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.holder.is_running()
    }
}
