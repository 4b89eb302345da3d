//! Session store: the single source of truth for the active session
//!
//! [`SessionStore`] holds the current [`SessionId`] and the authoritative
//! [`ConversationHistory`] as one unit. Both fields change together under a
//! single write lock, so a reader never sees a session paired with another
//! session's history.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::types::{ConversationHistory, SessionId};

#[derive(Debug, Default)]
struct SessionState {
    session: Option<SessionId>,
    history: ConversationHistory,
}

/// Shared handle to the session state.
///
/// Cloning is cheap and every clone observes the same state. Create one per
/// client lifetime and inject it into the components that need it.
///
/// # Examples
///
/// ```
/// use docportal::session::SessionStore;
/// use docportal::types::{ConversationEntry, SessionId};
///
/// let store = SessionStore::new();
/// store.adopt(
///     Some(SessionId::new("s1")),
///     vec![ConversationEntry::Upload { filenames: vec!["a.pdf".to_string()] }],
/// );
/// assert_eq!(store.current_session(), Some(SessionId::new("s1")));
///
/// store.clear();
/// assert!(store.current_session().is_none());
/// assert!(store.current_history().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    state: Arc<RwLock<SessionState>>,
}

impl SessionStore {
    /// Create an empty store (no session, empty history)
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace session and history in one step
    pub fn adopt(&self, session: Option<SessionId>, history: ConversationHistory) {
        let mut state = self.write();
        tracing::debug!(
            previous = ?state.session,
            session = ?session,
            entries = history.len(),
            "Adopting server session state"
        );
        state.session = session;
        state.history = history;
    }

    /// Reset to the no-session state
    pub fn clear(&self) {
        let mut state = self.write();
        if let Some(session) = state.session.take() {
            tracing::debug!(session = %session, "Clearing session state");
        }
        state.history.clear();
    }

    /// The current session, if any
    pub fn current_session(&self) -> Option<SessionId> {
        self.read().session.clone()
    }

    /// The current authoritative history
    pub fn current_history(&self) -> ConversationHistory {
        self.read().history.clone()
    }

    /// Session and history read under one lock
    pub fn snapshot(&self) -> (Option<SessionId>, ConversationHistory) {
        let state = self.read();
        (state.session.clone(), state.history.clone())
    }

    /// True when a session is active
    pub fn has_session(&self) -> bool {
        self.read().session.is_some()
    }

    // Writers replace whole fields, so a poisoned lock still holds a
    // consistent pair.
    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
