//! Request gateway: the only component that talks to the network
//!
//! This module defines the [`Gateway`] trait that the session-aware
//! components call through. The concrete implementation lives in a
//! submodule:
//!
//! - [`http::HttpGateway`] -- reqwest-backed gateway with a per-call timeout
//!   and cancellation handle.
//!
//! # Design
//!
//! A call names one of the enumerated [`Endpoint`]s and carries a
//! [`Payload`] (a file bundle, a field set, both, or nothing). Every call is
//! registered in a [`pending::PendingRegistry`] for its whole lifetime, so
//! [`Gateway::cancel_all`] can reach it; the registration is removed however
//! the call settles.
//!
//! The gateway normalizes transport outcomes into [`GatewayError`]. A
//! well-formed envelope with `success: false` is *not* a gateway error; the
//! caller decides what that means.

use bytes::Bytes;

use crate::error::GatewayError;
use crate::types::Envelope;

pub mod http;
pub mod pending;

pub use http::HttpGateway;
pub use pending::{PendingRegistry, PendingRequest, RequestId};

/// The fixed set of server endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Stateless document analysis
    Analysis,
    /// Stateless two-set document comparison
    Comparison,
    /// Upload documents and/or ask a question within the session
    QaTurn,
    /// Ask the server for the session it holds for this client
    QaSessionRecover,
    /// End the current session
    QaEnd,
    /// Clear the current session and its history
    QaClear,
}

impl Endpoint {
    /// HTTP method used for this endpoint
    pub fn method(self) -> reqwest::Method {
        match self {
            Endpoint::QaSessionRecover => reqwest::Method::GET,
            _ => reqwest::Method::POST,
        }
    }

    /// Stable name used in logs
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::Analysis => "analysis",
            Endpoint::Comparison => "comparison",
            Endpoint::QaTurn => "qa-turn",
            Endpoint::QaSessionRecover => "qa-session-recover",
            Endpoint::QaEnd => "qa-end",
            Endpoint::QaClear => "qa-clear",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One file inside a multipart bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Multipart field name (`files`, `files_a`, `files_b`)
    pub field: String,
    /// File name sent to the server
    pub file_name: String,
    /// File contents
    pub data: Bytes,
}

/// Request payload
///
/// An empty payload sends no body. Any file part turns the request into a
/// multipart form; fields then travel as text parts of the same form.
/// Without files, fields are sent as a multipart form too, matching the
/// form-encoded endpoints of the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    /// File parts, in order
    pub files: Vec<FilePart>,
    /// Simple text fields, in order
    pub fields: Vec<(String, String)>,
}

impl Payload {
    /// A payload with no body
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a file part
    pub fn with_file(mut self, field: &str, file_name: &str, data: Bytes) -> Self {
        self.files.push(FilePart {
            field: field.to_string(),
            file_name: file_name.to_string(),
            data,
        });
        self
    }

    /// Add a text field
    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    /// True when nothing would be sent
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.fields.is_empty()
    }
}

/// Abstraction over the transport used to reach the server.
///
/// Used polymorphically through `Arc<dyn Gateway>` so that the session
/// store, upload coordinator and conversation controller can share one
/// pending-request set.
#[async_trait::async_trait]
pub trait Gateway: Send + Sync + std::fmt::Debug {
    /// Issue one call and wait for it to settle.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Http`] for a non-2xx status
    /// - [`GatewayError::Network`] when no response arrived (including timeout)
    /// - [`GatewayError::Protocol`] when the body is not a valid envelope
    /// - [`GatewayError::Cancelled`] when [`Gateway::cancel_all`] reached the
    ///   call before it settled
    async fn call(&self, endpoint: Endpoint, payload: Payload) -> Result<Envelope, GatewayError>;

    /// Cancel every call that is currently pending.
    fn cancel_all(&self);

    /// Number of calls currently pending.
    fn pending_count(&self) -> usize;
}
