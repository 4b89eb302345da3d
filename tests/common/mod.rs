use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use docportal::config::{EndpointPaths, UploadConfig};
use docportal::conversation::ConversationController;
use docportal::gateway::HttpGateway;
use docportal::notify::{Notification, Notifier, RenderSink};
use docportal::session::SessionStore;
use docportal::types::{SessionId, TranscriptEntry};

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("docportal.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[allow(dead_code)]
pub fn write_document(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("failed to write document");
    path
}

#[allow(dead_code)]
pub fn gateway_for(base_url: &str, timeout: Duration) -> HttpGateway {
    HttpGateway::new(base_url, EndpointPaths::default(), timeout).expect("valid gateway")
}

/// Render sink that records what it was asked to show
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub notifications: Mutex<Vec<Notification>>,
    pub sessions: Mutex<Vec<Option<SessionId>>>,
    pub transcripts: Mutex<Vec<Vec<TranscriptEntry>>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }
}

impl RenderSink for RecordingSink {
    fn show_notification(&self, notification: &Notification) {
        self.notifications.lock().unwrap().push(notification.clone());
    }

    fn hide_notification(&self) {}

    fn render_session(&self, session: Option<SessionId>) {
        self.sessions.lock().unwrap().push(session);
    }

    fn render_transcript(&self, transcript: &[TranscriptEntry]) {
        self.transcripts.lock().unwrap().push(transcript.to_vec());
    }
}

/// Controller talking to `base_url`, with a fresh store and a recording sink
#[allow(dead_code)]
pub fn controller_for(base_url: &str) -> (ConversationController, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let controller = ConversationController::new(
        Arc::new(gateway_for(base_url, Duration::from_secs(5))),
        SessionStore::new(),
        Notifier::new(sink.clone(), Duration::from_secs(60)),
        UploadConfig::default(),
    );
    (controller, sink)
}
