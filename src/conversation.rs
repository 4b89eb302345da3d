//! Conversation controller: drives a session-scoped question/answer exchange
//!
//! The controller is a small state machine:
//!
//! ```text
//! NoSession --(upload / recovery)--> Active --(end / clear / no session)--> NoSession
//!                                      |
//!                          Idle -> AwaitingAnswer -> Idle   (per turn)
//! ```
//!
//! What the controller shows always comes from the last server response held
//! by the [`SessionStore`]. The only local addition is one provisional turn:
//! the question echoed while its request is in flight, or an apology after it
//! failed. The provisional turn is dropped as soon as an authoritative
//! history is adopted.
//!
//! Every entry point reports its own failure through the [`Notifier`]
//! (exactly one notification per failed operation, none for cancellations)
//! and then returns the error for programmatic callers.

use std::sync::Arc;

use crate::config::UploadConfig;
use crate::error::{GatewayError, PortalError};
use crate::gateway::{Endpoint, Gateway, Payload};
use crate::notify::{Notifier, Severity};
use crate::session::SessionStore;
use crate::types::{
    AnswerState, ConversationEntry, ConversationHistory, SessionId, TranscriptEntry, TurnResult,
};
use crate::upload::{FileSelection, UploadCoordinator, UploadOutcome};

/// Text shown in place of an answer when a turn fails
pub const APOLOGY: &str = "Sorry, I couldn't get an answer to that. Please try again.";

/// Whether a session is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    NoSession,
    Active,
}

/// Per-turn sub-state of an active session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingAnswer,
}

/// Asks the user to confirm a destructive action.
#[async_trait::async_trait]
pub trait Confirmer: Send + Sync {
    /// Returns true when the user confirmed `prompt`
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Confirmer that always gives the same answer
#[derive(Debug, Clone, Copy)]
pub struct FixedConfirmer(pub bool);

#[async_trait::async_trait]
impl Confirmer for FixedConfirmer {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

#[derive(Debug, Clone)]
struct ProvisionalTurn {
    question: String,
    answer: AnswerState,
}

/// Session-scoped conversation state machine.
///
/// `submit_turn` takes `&mut self`, so a controller can have at most one
/// turn awaiting its answer; responses are applied in send order.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use docportal::config::Config;
/// use docportal::conversation::ConversationController;
/// use docportal::gateway::HttpGateway;
/// use docportal::notify::Notifier;
/// use docportal::session::SessionStore;
///
/// # async fn run() -> anyhow::Result<()> {
/// let config = Config::default();
/// let gateway = Arc::new(HttpGateway::from_config(&config.server)?);
/// let mut controller = ConversationController::new(
///     gateway,
///     SessionStore::new(),
///     Notifier::detached(Duration::from_secs(5)),
///     config.upload.clone(),
/// );
/// controller.recover_session().await;
/// let answer = controller.submit_turn("What is the termination clause?").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConversationController {
    gateway: Arc<dyn Gateway>,
    store: SessionStore,
    uploads: UploadCoordinator,
    notifier: Notifier,
    turn: TurnState,
    provisional: Option<ProvisionalTurn>,
    latest_answer: Option<String>,
    recovered: bool,
}

impl ConversationController {
    /// Create a controller; call [`Self::recover_session`] before accepting input
    pub fn new(
        gateway: Arc<dyn Gateway>,
        store: SessionStore,
        notifier: Notifier,
        rules: UploadConfig,
    ) -> Self {
        let uploads = UploadCoordinator::new(Arc::clone(&gateway), store.clone(), rules);
        Self {
            gateway,
            store,
            uploads,
            notifier,
            turn: TurnState::Idle,
            provisional: None,
            latest_answer: None,
            recovered: false,
        }
    }

    pub fn state(&self) -> ControllerState {
        if self.store.has_session() {
            ControllerState::Active
        } else {
            ControllerState::NoSession
        }
    }

    pub fn turn_state(&self) -> TurnState {
        self.turn
    }

    /// True once startup recovery has run
    pub fn is_ready(&self) -> bool {
        self.recovered
    }

    pub fn session(&self) -> Option<SessionId> {
        self.store.current_session()
    }

    pub fn history(&self) -> ConversationHistory {
        self.store.current_history()
    }

    /// Answer of the last successful turn, if the session has one
    pub fn latest_answer(&self) -> Option<&str> {
        self.latest_answer.as_deref()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn uploads(&self) -> &UploadCoordinator {
        &self.uploads
    }

    /// Authoritative history plus the provisional turn, if any
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        let mut transcript: Vec<TranscriptEntry> = self
            .store
            .current_history()
            .iter()
            .map(TranscriptEntry::from)
            .collect();
        if let Some(turn) = &self.provisional {
            transcript.push(TranscriptEntry::Turn {
                question: turn.question.clone(),
                answer: turn.answer.clone(),
            });
        }
        transcript
    }

    /// Ask the server for an existing session.
    ///
    /// Returns the recovered session, or `None` when there is none. Absence
    /// of a session is expected and never notified; only transport failures
    /// (other than a 404 from the recovery endpoint) are reported.
    pub async fn recover_session(&mut self) -> Option<SessionId> {
        let outcome = self
            .gateway
            .call(Endpoint::QaSessionRecover, Payload::empty())
            .await;
        self.recovered = true;

        let recovered = match outcome {
            Ok(envelope) if envelope.success => match envelope.into_result::<TurnResult>() {
                Ok(TurnResult {
                    session: Some(session),
                    conversation_history,
                    ..
                }) => {
                    self.store
                        .adopt(Some(session.clone()), conversation_history);
                    Some(session)
                }
                Ok(_) => {
                    self.store.clear();
                    None
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Unreadable session recovery response");
                    None
                }
            },
            Ok(_) | Err(GatewayError::Http { status: 404, .. }) => {
                self.store.clear();
                None
            }
            Err(GatewayError::Cancelled) => {
                tracing::debug!("Session recovery cancelled");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session recovery failed");
                self.notifier
                    .notify("Could not restore your previous session.", Severity::Warning);
                None
            }
        };

        match &recovered {
            Some(session) => {
                self.latest_answer = last_answer(&self.store.current_history());
                tracing::info!(session = %session, "Recovered existing session");
            }
            None => tracing::info!("No session to recover"),
        }
        self.render();
        recovered
    }

    /// Upload documents, starting or extending a session
    pub async fn upload(&mut self, selection: &FileSelection) -> Result<UploadOutcome, PortalError> {
        if let Err(e) = self.ensure_ready() {
            return Err(self.report(e));
        }
        match self.uploads.upload(selection).await {
            Ok(outcome) => {
                self.provisional = None;
                self.latest_answer = last_answer(&outcome.history);
                self.notifier.notify(
                    format!("Uploaded {} file(s)", outcome.uploaded_filenames.len()),
                    Severity::Success,
                );
                self.render();
                Ok(outcome)
            }
            Err(e) => Err(self.report(e)),
        }
    }

    /// Upload documents and ask a question in one request
    pub async fn upload_and_ask(
        &mut self,
        selection: &FileSelection,
        question: &str,
    ) -> Result<UploadOutcome, PortalError> {
        let question = question.trim();
        if question.is_empty() {
            return self.upload(selection).await;
        }
        if let Err(e) = self.ensure_ready() {
            return Err(self.report(e));
        }

        let validation = self.uploads.validate(selection);
        if !validation.is_empty() {
            return Err(self.report(PortalError::Validation(validation)));
        }

        self.begin_turn(question);
        let outcome = self.uploads.upload_with_question(selection, question).await;
        self.turn = TurnState::Idle;

        match outcome {
            Ok(outcome) => {
                self.provisional = None;
                self.latest_answer = outcome
                    .latest_answer
                    .clone()
                    .or_else(|| last_answer(&outcome.history));
                self.notifier.notify(
                    format!("Uploaded {} file(s)", outcome.uploaded_filenames.len()),
                    Severity::Success,
                );
                self.render();
                Ok(outcome)
            }
            Err(e) => Err(self.fail_turn(e)),
        }
    }

    /// Ask a question within the active session.
    ///
    /// Returns the server's answer. Empty questions, questions before
    /// recovery has run, and questions without a session are rejected
    /// locally without any network call.
    pub async fn submit_turn(&mut self, question: &str) -> Result<String, PortalError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(self.report(PortalError::EmptyQuestion));
        }
        if let Err(e) = self.ensure_ready() {
            return Err(self.report(e));
        }
        if !self.store.has_session() {
            return Err(self.report(PortalError::NoSession));
        }

        self.begin_turn(question);
        let payload = Payload::empty().with_field("question", question);
        let outcome = self.gateway.call(Endpoint::QaTurn, payload).await;
        self.turn = TurnState::Idle;

        let result = outcome
            .map_err(PortalError::from)
            .and_then(|envelope| envelope.into_result::<TurnResult>())
            .and_then(|mut result| match result.session.take() {
                Some(session) => Ok((session, result)),
                None => Err(PortalError::Gateway(GatewayError::Protocol(
                    "turn response without a session".to_string(),
                ))),
            });

        match result {
            Ok((session, result)) => {
                let answer = result
                    .latest_answer
                    .clone()
                    .or_else(|| last_answer(&result.conversation_history))
                    .unwrap_or_default();
                self.store
                    .adopt(Some(session), result.conversation_history);
                self.provisional = None;
                self.latest_answer = Some(answer.clone());
                self.render();
                Ok(answer)
            }
            Err(e) => Err(self.fail_turn(e)),
        }
    }

    /// End the active session on the server, then forget it locally
    pub async fn end_session(&mut self) -> Result<(), PortalError> {
        if let Err(e) = self.ensure_ready() {
            return Err(self.report(e));
        }
        if !self.store.has_session() {
            return Err(self.report(PortalError::NoSession));
        }
        self.close(Endpoint::QaEnd, "Session ended").await
    }

    /// Clear the active session and its history after user confirmation
    pub async fn clear_session(&mut self, confirmer: &dyn Confirmer) -> Result<(), PortalError> {
        if let Err(e) = self.ensure_ready() {
            return Err(self.report(e));
        }
        if !self.store.has_session() {
            return Err(self.report(PortalError::NoSession));
        }
        let confirmed = confirmer
            .confirm("Clear this session and its conversation history? This cannot be undone.")
            .await;
        if !confirmed {
            return Err(self.report(PortalError::ConfirmationDeclined));
        }
        self.close(Endpoint::QaClear, "Session cleared").await
    }

    /// Handle that performs the best-effort shutdown of this client
    pub fn unload_hook(&self) -> UnloadHook {
        UnloadHook {
            gateway: Arc::clone(&self.gateway),
            store: self.store.clone(),
        }
    }

    async fn close(&mut self, endpoint: Endpoint, done: &str) -> Result<(), PortalError> {
        let outcome = self
            .gateway
            .call(endpoint, Payload::empty())
            .await
            .map_err(PortalError::from)
            .and_then(|envelope| envelope.into_ack());

        match outcome {
            Ok(()) => {
                self.store.clear();
                self.provisional = None;
                self.latest_answer = None;
                tracing::info!(endpoint = %endpoint, "Session closed");
                self.notifier.notify(done, Severity::Success);
                self.render();
                Ok(())
            }
            Err(e) => Err(self.report(e)),
        }
    }

    fn ensure_ready(&self) -> Result<(), PortalError> {
        if self.recovered {
            Ok(())
        } else {
            Err(PortalError::NotReady)
        }
    }

    fn begin_turn(&mut self, question: &str) {
        if self.turn == TurnState::AwaitingAnswer {
            tracing::debug!("Discarding provisional turn of an abandoned request");
        }
        self.provisional = Some(ProvisionalTurn {
            question: question.to_string(),
            answer: AnswerState::Pending,
        });
        self.turn = TurnState::AwaitingAnswer;
        self.render_transcript();
    }

    fn fail_turn(&mut self, error: PortalError) -> PortalError {
        if error.is_cancelled() {
            self.provisional = None;
        } else if let Some(turn) = &mut self.provisional {
            turn.answer = AnswerState::Failed(APOLOGY.to_string());
        }
        self.render_transcript();
        self.report(error)
    }

    /// Notify the user about `error` (unless it is a cancellation) and hand it back
    fn report(&self, error: PortalError) -> PortalError {
        if error.is_cancelled() {
            tracing::debug!("Operation cancelled; not notifying");
            return error;
        }
        let severity = match &error {
            PortalError::EmptyQuestion
            | PortalError::NoSession
            | PortalError::NotReady
            | PortalError::Validation(_) => Severity::Warning,
            PortalError::ConfirmationDeclined => Severity::Info,
            _ => Severity::Error,
        };
        self.notifier.notify(error.user_message(), severity);
        error
    }

    fn render(&self) {
        if let Some(sink) = self.notifier.sink() {
            sink.render_session(self.store.current_session());
        }
        self.render_transcript();
    }

    fn render_transcript(&self) {
        if let Some(sink) = self.notifier.sink() {
            sink.render_transcript(&self.transcript());
        }
    }
}

/// Best-effort shutdown: end the session and cancel everything in flight.
///
/// The end-session call is dispatched without being awaited or retried; the
/// process may already be going away.
#[derive(Debug, Clone)]
pub struct UnloadHook {
    gateway: Arc<dyn Gateway>,
    store: SessionStore,
}

impl UnloadHook {
    /// Cancel pending calls and, with an active session, dispatch qa-end.
    ///
    /// Returns the handle of the dispatched call so tests can observe it;
    /// production callers drop it.
    pub fn fire(&self) -> Option<tokio::task::JoinHandle<()>> {
        self.gateway.cancel_all();

        let session = self.store.current_session()?;
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::debug!("No async runtime; skipping end-of-session call");
                return None;
            }
        };

        let gateway = Arc::clone(&self.gateway);
        tracing::debug!(session = %session, "Dispatching best-effort session end");
        Some(handle.spawn(async move {
            let _ = gateway.call(Endpoint::QaEnd, Payload::empty()).await;
        }))
    }
}

fn last_answer(history: &[ConversationEntry]) -> Option<String> {
    history.iter().rev().find_map(|entry| match entry {
        ConversationEntry::Qa { answer, .. } => Some(answer.clone()),
        ConversationEntry::Upload { .. } => None,
    })
}
