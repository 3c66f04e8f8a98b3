use thiserror::Error;

/// Failures surfaced by the remote gateway.
///
/// The variant encodes *where* the failure belongs: facet and keyword reads
/// degrade to `Unavailable`, while search and analysis carry their own kinds so
/// the controllers can show a message the user can act on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// No response at all (connection refused, TLS, DNS, reset).
    #[error("network error calling {endpoint}: {message}")]
    Network { endpoint: String, message: String },

    /// Facet list or keyword lookup answered with a non-success status or an
    /// unreadable body.
    #[error("{endpoint} unavailable: {reason}")]
    Unavailable { endpoint: String, reason: String },

    #[error("search failed: {reason}")]
    SearchFailed { reason: String },

    #[error("analysis failed: {reason}")]
    AnalysisFailed { reason: String },

    /// Caller broke a precondition; nothing was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    pub fn network(endpoint: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Network {
            endpoint: endpoint.into(),
            message: err.to_string(),
        }
    }

    pub fn unavailable(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Text shown to the user in place of results or analysis.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { .. } => "Network error. Please check your connection.".to_string(),
            Self::SearchFailed { .. } => "Search failed. Please try again.".to_string(),
            Self::AnalysisFailed { .. } => "Analysis failed. Please try again.".to_string(),
            Self::Unavailable { .. } => "Service unavailable. Please try again later.".to_string(),
            Self::InvalidRequest(msg) => format!("Invalid request: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_and_search_failures_read_differently() {
        let net = GatewayError::network("/search/", "connection refused");
        let failed = GatewayError::SearchFailed {
            reason: "HTTP 500".into(),
        };
        assert!(net.is_network());
        assert!(!failed.is_network());
        assert_ne!(net.user_message(), failed.user_message());
        assert_eq!(failed.user_message(), "Search failed. Please try again.");
    }

    #[test]
    fn display_includes_endpoint() {
        let err = GatewayError::unavailable("/departments", "HTTP 503");
        assert_eq!(err.to_string(), "/departments unavailable: HTTP 503");
    }
}
