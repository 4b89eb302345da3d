//! HTTP gateway backed by `reqwest`
//!
//! [`HttpGateway`] maps each [`Endpoint`] to a configured path under the
//! server base URL and issues the call with a client-wide timeout. Each call
//! is raced against its cancellation token; a cancelled call settles as
//! [`GatewayError::Cancelled`] even if a response arrived in the meantime.
//!
//! # Status handling
//!
//! - 2xx with a JSON envelope: returned as-is (including `success: false`)
//! - 2xx with an unreadable body: [`GatewayError::Protocol`]
//! - non-2xx: [`GatewayError::Http`], carrying the envelope's `error` (or a
//!   framework-style `detail`) when the body has one
//! - no response or timeout: [`GatewayError::Network`]

use std::time::{Duration, Instant};

use reqwest::multipart::{Form, Part};

use super::pending::PendingRegistry;
use super::{Endpoint, Gateway, Payload};
use crate::config::{EndpointPaths, ServerConfig};
use crate::error::{GatewayError, PortalError};
use crate::types::Envelope;

/// Gateway issuing real HTTP requests.
///
/// # Examples
///
/// ```no_run
/// use docportal::config::ServerConfig;
/// use docportal::gateway::HttpGateway;
///
/// let gateway = HttpGateway::from_config(&ServerConfig::default()).unwrap();
/// ```
#[derive(Debug)]
pub struct HttpGateway {
    /// Underlying reqwest HTTP client, carries the timeout
    client: reqwest::Client,
    /// Base URL without trailing slash
    base_url: String,
    /// Endpoint paths
    paths: EndpointPaths,
    /// Per-request timeout, kept for diagnostics
    timeout: Duration,
    /// In-flight calls
    pending: PendingRegistry,
}

impl HttpGateway {
    /// Construct a gateway targeting `base_url`.
    ///
    /// No network I/O is performed at construction time.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Config`] if the base URL does not parse or the
    /// HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        paths: EndpointPaths,
        timeout: Duration,
    ) -> Result<Self, PortalError> {
        url::Url::parse(base_url)
            .map_err(|e| PortalError::Config(format!("Invalid base URL {}: {}", base_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortalError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            paths,
            timeout,
            pending: PendingRegistry::new(),
        })
    }

    /// Construct a gateway from the `server` configuration section
    pub fn from_config(server: &ServerConfig) -> Result<Self, PortalError> {
        Self::new(&server.base_url, server.endpoints.clone(), server.timeout())
    }

    /// The pending-request set of this gateway
    pub fn pending(&self) -> &PendingRegistry {
        &self.pending
    }

    /// Full URL for an endpoint
    pub fn url_for(&self, endpoint: Endpoint) -> String {
        let path = match endpoint {
            Endpoint::Analysis => &self.paths.analysis,
            Endpoint::Comparison => &self.paths.comparison,
            Endpoint::QaTurn => &self.paths.qa_turn,
            Endpoint::QaSessionRecover => &self.paths.qa_session_recover,
            Endpoint::QaEnd => &self.paths.qa_end,
            Endpoint::QaClear => &self.paths.qa_clear,
        };
        format!("{}{}", self.base_url, path)
    }

    fn build_request(&self, endpoint: Endpoint, payload: Payload) -> reqwest::RequestBuilder {
        let request = self
            .client
            .request(endpoint.method(), self.url_for(endpoint))
            .header("Accept", "application/json");

        if payload.is_empty() {
            return request;
        }

        let mut form = Form::new();
        for (name, value) in payload.fields {
            form = form.text(name, value);
        }
        for file in payload.files {
            let part = Part::bytes(file.data.to_vec()).file_name(file.file_name);
            form = form.part(file.field, part);
        }
        request.multipart(form)
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Envelope, GatewayError> {
        let response = request.send().await.map_err(|e| self.network_error(e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.network_error(e))?;

        if !status.is_success() {
            return Err(GatewayError::Http {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        serde_json::from_slice::<Envelope>(&body)
            .map_err(|e| GatewayError::Protocol(format!("invalid response envelope: {}", e)))
    }

    fn network_error(&self, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::Network(format!("timed out after {:?}", self.timeout))
        } else {
            GatewayError::Network(error.to_string())
        }
    }
}

#[async_trait::async_trait]
impl Gateway for HttpGateway {
    async fn call(&self, endpoint: Endpoint, payload: Payload) -> Result<Envelope, GatewayError> {
        let guard = self.pending.register(endpoint);
        let request_id = guard.id();
        let started = Instant::now();
        tracing::debug!(request_id, endpoint = %endpoint, "Sending request");

        let request = self.build_request(endpoint, payload);
        let outcome = tokio::select! {
            biased;
            _ = guard.token().cancelled() => Err(GatewayError::Cancelled),
            result = self.execute(request) => result,
        };

        // A call that settled while cancel_all ran still settles as cancelled.
        let outcome = if guard.token().is_cancelled() {
            Err(GatewayError::Cancelled)
        } else {
            outcome
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(envelope) => tracing::debug!(
                request_id,
                endpoint = %endpoint,
                success = envelope.success,
                elapsed_ms,
                "Request settled"
            ),
            Err(GatewayError::Cancelled) => {
                tracing::debug!(request_id, endpoint = %endpoint, elapsed_ms, "Request cancelled")
            }
            Err(e) => tracing::warn!(
                request_id,
                endpoint = %endpoint,
                elapsed_ms,
                error = %e,
                "Request failed"
            ),
        }

        drop(guard);
        outcome
    }

    fn cancel_all(&self) {
        let cancelled = self.pending.cancel_all();
        tracing::info!(cancelled, "Cancelled all pending requests");
    }

    fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// Extract a user-facing message from an error response body.
fn error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["error", "detail"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base: &str) -> HttpGateway {
        HttpGateway::new(base, EndpointPaths::default(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_url_for_joins_without_double_slash() {
        let gateway = gateway("http://localhost:8080/");
        assert_eq!(
            gateway.url_for(Endpoint::QaTurn),
            "http://localhost:8080/document_qa_chat"
        );
    }

    #[test]
    fn test_url_for_keeps_base_path_prefix() {
        let gateway = gateway("https://example.com/portal");
        assert_eq!(
            gateway.url_for(Endpoint::QaClear),
            "https://example.com/portal/document_qa_chat/clear"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = HttpGateway::new(
            "localhost without scheme",
            EndpointPaths::default(),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(PortalError::Config(_))));
    }

    #[test]
    fn test_error_message_from_envelope_or_detail() {
        assert_eq!(
            error_message(br#"{"success":false,"error":"Please upload documents first."}"#),
            Some("Please upload documents first.".to_string())
        );
        assert_eq!(
            error_message(br#"{"detail":"No files uploaded"}"#),
            Some("No files uploaded".to_string())
        );
        assert_eq!(error_message(b"<html>bad gateway</html>"), None);
    }

    #[test]
    fn test_endpoint_methods() {
        assert_eq!(Endpoint::QaSessionRecover.method(), reqwest::Method::GET);
        assert_eq!(Endpoint::QaTurn.method(), reqwest::Method::POST);
        assert_eq!(Endpoint::QaClear.method(), reqwest::Method::POST);
    }
}
