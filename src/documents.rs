//! Stateless document analysis and comparison
//!
//! These calls never involve a session: the server answers from the files
//! in the request alone, and nothing is written to the [`SessionStore`].
//!
//! [`SessionStore`]: crate::session::SessionStore

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::config::UploadConfig;
use crate::error::{PortalError, ValidationError};
use crate::gateway::{Endpoint, Gateway, Payload};
use crate::upload::{self, FileSelection};

#[derive(Debug, Deserialize)]
struct AnalysisResult {
    analysis: Value,
}

#[derive(Debug, Deserialize)]
struct ComparisonResult {
    comparison: Value,
}

/// Client for the analysis and comparison endpoints
#[derive(Debug, Clone)]
pub struct DocumentService {
    gateway: Arc<dyn Gateway>,
    rules: UploadConfig,
}

impl DocumentService {
    pub fn new(gateway: Arc<dyn Gateway>, rules: UploadConfig) -> Self {
        Self { gateway, rules }
    }

    /// Analyze a set of documents and return the server's analysis.
    ///
    /// # Errors
    ///
    /// [`PortalError::Validation`] before any network call when the
    /// selection breaks the upload rules; otherwise the gateway or domain
    /// failure of the call.
    pub async fn analyze(&self, selection: &FileSelection) -> Result<Value, PortalError> {
        let payload = upload::package(selection, "files", &self.rules).await?;

        tracing::info!(files = selection.len(), "Requesting document analysis");
        let envelope = self.gateway.call(Endpoint::Analysis, payload).await?;
        let result: AnalysisResult = envelope.into_result()?;
        Ok(result.analysis)
    }

    /// Compare two document sets and return the server's comparison.
    ///
    /// Each side is validated on its own; violations of both sides are
    /// reported together.
    pub async fn compare(
        &self,
        a: &FileSelection,
        b: &FileSelection,
    ) -> Result<Value, PortalError> {
        let mut errors: Vec<ValidationError> = upload::validate(a, &self.rules);
        errors.extend(upload::validate(b, &self.rules));
        if !errors.is_empty() {
            return Err(PortalError::Validation(errors));
        }

        let side_a = upload::package(a, "files_a", &self.rules).await?;
        let side_b = upload::package(b, "files_b", &self.rules).await?;
        let payload = Payload {
            files: side_a.files.into_iter().chain(side_b.files).collect(),
            fields: Vec::new(),
        };

        tracing::info!(
            files_a = a.len(),
            files_b = b.len(),
            "Requesting document comparison"
        );
        let envelope = self.gateway.call(Endpoint::Comparison, payload).await?;
        let result: ComparisonResult = envelope.into_result()?;
        Ok(result.comparison)
    }
}
