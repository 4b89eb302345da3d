//! Docportal - document analysis and Q&A client library
//!
//! This library provides the client side of a document question-answering
//! workflow: uploading documents, keeping a server-issued session and its
//! conversation history in sync, exchanging question/answer turns, and the
//! stateless analysis and comparison calls.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `gateway`: `Gateway` trait, reqwest-backed `HttpGateway`, pending-request registry
//! - `session`: `SessionStore`, the single source of truth for session and history
//! - `upload`: file selection, validation rules and the upload coordinator
//! - `conversation`: the session-scoped conversation state machine
//! - `notify`: user notifications and the `RenderSink` seam
//! - `documents`: stateless analysis and comparison
//! - `types`: wire and data model
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface and handlers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use docportal::{Config, ConversationController, HttpGateway, Notifier, SessionStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/docportal.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let gateway = Arc::new(HttpGateway::from_config(&config.server)?);
//!     let mut controller = ConversationController::new(
//!         gateway,
//!         SessionStore::new(),
//!         Notifier::detached(config.notifications.dismiss_after()),
//!         config.upload.clone(),
//!     );
//!     controller.recover_session().await;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod documents;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod session;
pub mod types;
pub mod upload;

// Re-export commonly used types
pub use config::Config;
pub use conversation::{ConversationController, ControllerState, TurnState, UnloadHook};
pub use documents::DocumentService;
pub use error::{GatewayError, PortalError, Result, ValidationError};
pub use gateway::{Endpoint, Gateway, HttpGateway, Payload};
pub use notify::{Notifier, RenderSink, Severity};
pub use session::SessionStore;
pub use types::{ConversationEntry, ConversationHistory, Envelope, SessionId, TranscriptEntry};
pub use upload::{FileSelection, SelectedFile, UploadCoordinator};

#[cfg(test)]
pub mod test_utils;
