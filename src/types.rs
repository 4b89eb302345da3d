//! Wire and data model shared by the client components
//!
//! Every server response is a uniform [`Envelope`]. The conversation-related
//! payloads decode into [`SessionId`] and [`ConversationHistory`]; the
//! transcript exposed for rendering is a list of [`TranscriptEntry`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{GatewayError, PortalError};

/// Opaque, server-assigned session identifier.
///
/// The server has historically issued numeric session numbers; both JSON
/// strings and integers decode into the same opaque string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a raw identifier
    ///
    /// # Examples
    ///
    /// ```
    /// use docportal::types::SessionId;
    ///
    /// let id = SessionId::new("s1");
    /// assert_eq!(id.as_str(), "s1");
    /// ```
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => SessionId(s),
            RawId::Signed(n) => SessionId(n.to_string()),
            RawId::Unsigned(n) => SessionId(n.to_string()),
        })
    }
}

/// One entry of the authoritative conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConversationEntry {
    /// Documents were added to the session
    Upload {
        /// Names of the uploaded files, in upload order
        filenames: Vec<String>,
    },
    /// A question and the server's answer
    Qa {
        /// The user's question
        question: String,
        /// The server's answer
        answer: String,
    },
}

/// Ordered conversation history, always replaced wholesale from the server.
pub type ConversationHistory = Vec<ConversationEntry>;

/// Untagged history record persisted by older servers:
/// `{timestamp, question, answer, uploaded_files?}`.
#[derive(Deserialize)]
struct LegacyEntry {
    question: String,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    uploaded_files: Option<Vec<String>>,
}

/// Decode a `conversation_history` array, accepting tagged and legacy entries.
///
/// An entry carrying a `type` key must be a well-formed tagged entry; only
/// entries without one are read as legacy records.
pub fn deserialize_history<'de, D>(deserializer: D) -> Result<ConversationHistory, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    let mut history = Vec::new();
    for value in raw.unwrap_or_default() {
        if value.get("type").is_some() {
            let entry: ConversationEntry =
                serde_json::from_value(value).map_err(serde::de::Error::custom)?;
            history.push(entry);
            continue;
        }

        let legacy: LegacyEntry =
            serde_json::from_value(value).map_err(serde::de::Error::custom)?;
        if let Some(filenames) = legacy.uploaded_files.filter(|f| !f.is_empty()) {
            history.push(ConversationEntry::Upload { filenames });
        }
        history.push(ConversationEntry::Qa {
            question: legacy.question,
            answer: legacy.answer.unwrap_or_default(),
        });
    }
    Ok(history)
}

/// Uniform response envelope: `{success, result?, error?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Whether the server considers the operation successful
    pub success: bool,
    /// Operation-specific payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// User-facing error message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    /// Interpret the envelope as a successful result of type `T`.
    ///
    /// # Errors
    ///
    /// - [`PortalError::Domain`] when `success` is false
    /// - [`GatewayError::Protocol`] when `result` is missing or has the wrong shape
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, PortalError> {
        if !self.success {
            return Err(PortalError::Domain(
                self.error
                    .unwrap_or_else(|| "The request could not be completed.".to_string()),
            ));
        }
        let result = self.result.ok_or_else(|| {
            GatewayError::Protocol("successful response without a result".to_string())
        })?;
        serde_json::from_value(result)
            .map_err(|e| GatewayError::Protocol(format!("unexpected result shape: {}", e)).into())
    }

    /// Interpret the envelope as an acknowledgement with no payload
    pub fn into_ack(self) -> Result<(), PortalError> {
        if self.success {
            Ok(())
        } else {
            Err(PortalError::Domain(
                self.error
                    .unwrap_or_else(|| "The request could not be completed.".to_string()),
            ))
        }
    }
}

/// `result` object of a qa-turn or recovery response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TurnResult {
    /// Session the history belongs to; null when the server has none
    #[serde(default)]
    pub session: Option<SessionId>,
    /// Full, authoritative history
    #[serde(default, deserialize_with = "deserialize_history")]
    pub conversation_history: ConversationHistory,
    /// Files stored by this request, as named by the server
    #[serde(default)]
    pub uploaded_files: Vec<String>,
    /// Answer to the question carried by this request
    #[serde(default)]
    pub latest_answer: Option<String>,
}

/// Rendering state of the answer half of a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerState {
    /// The request is in flight
    Pending,
    /// Authoritative answer
    Answered(String),
    /// The turn failed; carries the apology shown in place of an answer
    Failed(String),
}

/// One row of the rendered transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEntry {
    /// Documents added to the session, with display names
    Upload {
        /// Display names of the uploaded files
        filenames: Vec<String>,
    },
    /// A question/answer exchange
    Turn {
        /// The user's question
        question: String,
        /// The answer, or its provisional state
        answer: AnswerState,
    },
}

impl From<&ConversationEntry> for TranscriptEntry {
    fn from(entry: &ConversationEntry) -> Self {
        match entry {
            ConversationEntry::Upload { filenames } => TranscriptEntry::Upload {
                filenames: filenames.iter().map(|f| display_filename(f)).collect(),
            },
            ConversationEntry::Qa { question, answer } => TranscriptEntry::Turn {
                question: question.clone(),
                answer: AnswerState::Answered(answer.clone()),
            },
        }
    }
}

/// Strip the `<32 hex>_` prefix the server puts on stored file names.
///
/// # Examples
///
/// ```
/// use docportal::types::display_filename;
///
/// assert_eq!(
///     display_filename("0123456789abcdef0123456789abcdef_report.pdf"),
///     "report.pdf"
/// );
/// assert_eq!(display_filename("report.pdf"), "report.pdf");
/// ```
pub fn display_filename(stored: &str) -> String {
    match stored.split_once('_') {
        Some((prefix, rest))
            if prefix.len() == 32
                && !rest.is_empty()
                && prefix.chars().all(|c| c.is_ascii_hexdigit()) =>
        {
            rest.to_string()
        }
        _ => stored.to_string(),
    }
}
