//! Notification channel and rendering seam
//!
//! The client core never touches presentation state directly. It hands plain
//! data to a [`RenderSink`]: notifications, the current session id, and the
//! transcript. [`Notifier`] implements the notification rules on top of a
//! sink:
//!
//! - a new notification replaces the one currently shown (no queue)
//! - a notification dismisses itself after a fixed delay unless replaced or
//!   dismissed first
//! - a missing sink is a no-op with a diagnostic log

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::types::{SessionId, TranscriptEntry};

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        f.write_str(label)
    }
}

/// A notification as handed to the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Sequence number; later notifications have larger ids
    pub id: u64,
    /// Message shown to the user
    pub message: String,
    /// Severity of the message
    pub severity: Severity,
    /// When the notification was raised
    pub raised_at: DateTime<Utc>,
}

/// Rendering target for the client core.
///
/// Implementations must not block; they receive plain data only.
#[cfg_attr(test, mockall::automock)]
pub trait RenderSink: Send + Sync {
    /// Show a notification, replacing any currently shown one
    fn show_notification(&self, notification: &Notification);

    /// Hide the currently shown notification
    fn hide_notification(&self);

    /// Display the current session id (`None` when there is no session)
    fn render_session(&self, session: Option<SessionId>);

    /// Display the transcript
    fn render_transcript(&self, transcript: &[TranscriptEntry]);
}

#[derive(Debug, Default)]
struct NotifierState {
    current: Option<Notification>,
    generation: u64,
}

/// Reports outcomes to the user without blocking the caller.
///
/// Cloning shares the same displayed-notification state.
#[derive(Clone)]
pub struct Notifier {
    sink: Option<Arc<dyn RenderSink>>,
    dismiss_after: Duration,
    state: Arc<Mutex<NotifierState>>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("has_sink", &self.sink.is_some())
            .field("dismiss_after", &self.dismiss_after)
            .finish_non_exhaustive()
    }
}

impl Notifier {
    /// Create a notifier rendering to `sink`
    pub fn new(sink: Arc<dyn RenderSink>, dismiss_after: Duration) -> Self {
        Self {
            sink: Some(sink),
            dismiss_after,
            state: Arc::new(Mutex::new(NotifierState::default())),
        }
    }

    /// Create a notifier without a rendering target
    pub fn detached(dismiss_after: Duration) -> Self {
        Self {
            sink: None,
            dismiss_after,
            state: Arc::new(Mutex::new(NotifierState::default())),
        }
    }

    /// The rendering target, if one is attached
    pub fn sink(&self) -> Option<&Arc<dyn RenderSink>> {
        self.sink.as_ref()
    }

    /// Show `message`, superseding any displayed notification.
    ///
    /// Schedules auto-dismissal when called inside a Tokio runtime.
    pub fn notify(&self, message: impl Into<String>, severity: Severity) {
        let message = message.into();
        let notification = {
            let mut state = self.lock();
            state.generation += 1;
            let notification = Notification {
                id: state.generation,
                message,
                severity,
                raised_at: Utc::now(),
            };
            state.current = Some(notification.clone());
            notification
        };

        match severity {
            Severity::Error => tracing::warn!(message = %notification.message, "Notify error"),
            Severity::Warning => tracing::info!(message = %notification.message, "Notify warning"),
            _ => tracing::debug!(message = %notification.message, %severity, "Notify"),
        }

        match &self.sink {
            Some(sink) => sink.show_notification(&notification),
            None => tracing::debug!(id = notification.id, "No render target for notification"),
        }

        self.schedule_dismiss(notification.id);
    }

    /// Dismiss the displayed notification (explicit user action)
    pub fn dismiss(&self) {
        let had_one = self.lock().current.take().is_some();
        if had_one {
            if let Some(sink) = &self.sink {
                sink.hide_notification();
            }
        }
    }

    /// The notification currently displayed, if any
    pub fn current(&self) -> Option<Notification> {
        self.lock().current.clone()
    }

    fn schedule_dismiss(&self, id: u64) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::debug!(id, "No async runtime; notification will not auto-dismiss");
                return;
            }
        };

        let notifier = self.clone();
        let delay = self.dismiss_after;
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            notifier.dismiss_if_current(id);
        });
    }

    fn dismiss_if_current(&self, id: u64) {
        let expired = {
            let mut state = self.lock();
            let is_current = state.current.as_ref().map(|n| n.id) == Some(id);
            if is_current {
                state.current = None;
            }
            is_current
        };

        if expired {
            tracing::trace!(id, "Notification auto-dismissed");
            if let Some(sink) = &self.sink {
                sink.hide_notification();
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, NotifierState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
