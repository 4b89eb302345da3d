//! Test utilities for Docportal
//!
//! This module provides common test utilities: temporary files, an error
//! assertion helper, a scripted in-process [`Gateway`], and a recording
//! [`RenderSink`].

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::json;
use tempfile::TempDir;

use crate::error::{GatewayError, PortalError};
use crate::gateway::{Endpoint, Gateway, Payload};
use crate::notify::{Notification, RenderSink};
use crate::types::{Envelope, SessionId, TranscriptEntry};

/// Create a temporary directory for testing
///
/// # Returns
///
/// Returns a TempDir that will be cleaned up when dropped
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given content
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that an error's display text contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T, PortalError>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Envelope of a successful qa-turn/recovery response
pub fn turn_envelope(session: &str, history: serde_json::Value) -> Envelope {
    Envelope {
        success: true,
        result: Some(json!({
            "session": session,
            "conversation_history": history,
        })),
        error: None,
    }
}

/// Envelope with `success: true` and no result
pub fn ack_envelope() -> Envelope {
    Envelope {
        success: true,
        result: None,
        error: None,
    }
}

/// Gateway answering from a queue of scripted outcomes.
///
/// Records every call; an empty queue answers with a network error.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    responses: Mutex<VecDeque<Result<Envelope, GatewayError>>>,
    calls: Mutex<Vec<(Endpoint, Payload)>>,
    cancellations: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next call
    pub fn push(&self, outcome: Result<Envelope, GatewayError>) -> &Self {
        self.responses.lock().unwrap().push_back(outcome);
        self
    }

    /// Calls received so far
    pub fn calls(&self) -> Vec<(Endpoint, Payload)> {
        self.calls.lock().unwrap().clone()
    }

    /// Endpoints called so far
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.calls().into_iter().map(|(e, _)| e).collect()
    }

    /// Number of `cancel_all` invocations
    pub fn cancellations(&self) -> usize {
        self.cancellations.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Gateway for ScriptedGateway {
    async fn call(&self, endpoint: Endpoint, payload: Payload) -> Result<Envelope, GatewayError> {
        self.calls.lock().unwrap().push((endpoint, payload));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Network("no scripted response".to_string())))
    }

    fn cancel_all(&self) {
        self.cancellations.fetch_add(1, Ordering::SeqCst);
    }

    fn pending_count(&self) -> usize {
        0
    }
}

/// Sink that records everything it is asked to render
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub notifications: Mutex<Vec<Notification>>,
    pub hides: AtomicUsize,
    pub sessions: Mutex<Vec<Option<SessionId>>>,
    pub transcripts: Mutex<Vec<Vec<TranscriptEntry>>>,
}

impl RecordingSink {
    pub fn notification_messages(&self) -> Vec<String> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }

    pub fn last_transcript(&self) -> Option<Vec<TranscriptEntry>> {
        self.transcripts.lock().unwrap().last().cloned()
    }
}

impl RenderSink for RecordingSink {
    fn show_notification(&self, notification: &Notification) {
        self.notifications.lock().unwrap().push(notification.clone());
    }

    fn hide_notification(&self) {
        self.hides.fetch_add(1, Ordering::SeqCst);
    }

    fn render_session(&self, session: Option<SessionId>) {
        self.sessions.lock().unwrap().push(session);
    }

    fn render_transcript(&self, transcript: &[TranscriptEntry]) {
        self.transcripts.lock().unwrap().push(transcript.to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_file() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "test.txt", "content");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "content");
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: Result<(), PortalError> = Err(PortalError::Domain("index missing".to_string()));
        assert_error_contains(result, "index missing");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        let result: Result<(), PortalError> = Ok(());
        assert_error_contains(result, "error");
    }

    #[tokio::test]
    async fn test_scripted_gateway_replays_in_order() {
        let gateway = ScriptedGateway::new();
        gateway.push(Ok(ack_envelope())).push(Err(GatewayError::Cancelled));

        assert!(gateway.call(Endpoint::QaEnd, Payload::empty()).await.is_ok());
        assert_eq!(
            gateway.call(Endpoint::QaClear, Payload::empty()).await,
            Err(GatewayError::Cancelled)
        );
        assert!(matches!(
            gateway.call(Endpoint::QaTurn, Payload::empty()).await,
            Err(GatewayError::Network(_))
        ));
        assert_eq!(
            gateway.endpoints(),
            vec![Endpoint::QaEnd, Endpoint::QaClear, Endpoint::QaTurn]
        );
    }
}
