use thiserror::Error;

use crate::transport::TransportError;

pub type Result<T> = std::result::Result<T, AnalyzeError>;

/// Run-fatal failures of an analysis. Enrichment and narrative failures are
/// absorbed inside the pipeline and never appear here.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// The alerts payload was neither a bare array nor any known wrapper.
    #[error("unexpected alerts payload shape: {shape}")]
    MalformedResponse { shape: String },

    /// The classifier is unreachable, unconfigured, or broke its contract.
    /// No partial incident list is produced without classification.
    #[error("classification unavailable: {reason}")]
    ClassificationUnavailable { reason: String },

    /// Network-level failure with no HTTP response received.
    #[error("network blocked or unreachable: {reason}")]
    Transport { reason: String },

    /// The upstream answered with a non-success HTTP status.
    #[error("upstream returned HTTP {status}")]
    Http { status: u16 },

    /// Anything else an upstream surfaced; rethrown for logging.
    #[error("{reason}")]
    Upstream { reason: String },
}

impl AnalyzeError {
    pub fn user_message(&self) -> String {
        match self {
            AnalyzeError::MalformedResponse { shape } => format!(
                "Invalid response format from the alerts API. Expected an array but got: {shape}."
            ),
            AnalyzeError::ClassificationUnavailable { reason } => {
                format!("Alert classification is unavailable: {reason}.")
            }
            AnalyzeError::Transport { .. } => {
                "The API server is blocking requests from this origin or is unreachable. \
                 Check the CORS configuration of the upstream, verify the endpoint, or \
                 route requests through the forwarding proxy."
                    .to_string()
            }
            AnalyzeError::Http { status: 404 } => {
                "API endpoint not found. Please check the configuration.".to_string()
            }
            AnalyzeError::Http { status: 401 } | AnalyzeError::Http { status: 403 } => {
                "Authentication failed. Please check your API credentials.".to_string()
            }
            AnalyzeError::Http { status } if *status >= 500 => {
                "Server error. The API is experiencing issues. Please try again later."
                    .to_string()
            }
            AnalyzeError::Http { status } => format!("The alerts API returned HTTP {status}."),
            AnalyzeError::Upstream { reason } => reason.clone(),
        }
    }
}

impl From<TransportError> for AnalyzeError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status { status, .. } => AnalyzeError::Http { status },
            TransportError::Network(reason) => AnalyzeError::Transport { reason },
            TransportError::Timeout => AnalyzeError::Transport {
                reason: "request timed out".into(),
            },
            TransportError::Proxy(reason) | TransportError::Decode(reason) => {
                AnalyzeError::Upstream { reason }
            }
        }
    }
}
