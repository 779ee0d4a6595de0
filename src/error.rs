//! Error types for run logging, model selection, and the tracking
//! service boundary.

use thiserror::Error;

/// Errors surfaced by a tracking service client (transport and storage).
///
/// These pass through the component layer unwrapped; callers that can
/// attach context (which model, which version) convert them into a
/// [`TrackingError`] variant instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid request to tracking service: {0}")]
    InvalidRequest(String),

    #[error("Invalid response from tracking service: {0}")]
    InvalidResponse(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Errors surfaced by the run logging and model selection components.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackingError {
    #[error("Invalid tracking configuration: {0}")]
    Configuration(String),

    #[error("Unsupported model flavor: '{0}'")]
    UnsupportedFlavor(String),

    #[error("Logging session is closed")]
    SessionClosed,

    #[error("No version of '{model}' is bound to run {run_id}")]
    VersionNotFound { model: String, run_id: String },

    #[error("{count} versions of '{model}' are bound to run {run_id}, refusing to promote")]
    AmbiguousVersion {
        model: String,
        run_id: String,
        count: usize,
    },

    #[error("No matching version of '{model}': {criteria}")]
    NotFound { model: String, criteria: String },

    #[error("Tracking client error: {0}")]
    Client(#[from] ClientError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::NotFound("model 'churn'".to_string());
        assert_eq!(err.to_string(), "Resource not found: model 'churn'");

        let err = ClientError::Network("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));

        let err = ClientError::InvalidRequest("unquotable filter".to_string());
        assert!(err.to_string().starts_with("Invalid request"));

        let err = ClientError::Storage("Lock error: poisoned".to_string());
        assert!(err.to_string().starts_with("Storage error"));
    }

    #[test]
    fn test_tracking_error_display() {
        let err = TrackingError::Configuration("experiment path is empty".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid tracking configuration: experiment path is empty"
        );

        let err = TrackingError::UnsupportedFlavor("onnx".to_string());
        assert_eq!(err.to_string(), "Unsupported model flavor: 'onnx'");

        let err = TrackingError::SessionClosed;
        assert_eq!(err.to_string(), "Logging session is closed");
    }

    #[test]
    fn test_version_not_found_names_model_and_run() {
        let err = TrackingError::VersionNotFound {
            model: "churn".to_string(),
            run_id: "abc123".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("churn"));
        assert!(text.contains("abc123"));
    }

    #[test]
    fn test_ambiguous_version_reports_count() {
        let err = TrackingError::AmbiguousVersion {
            model: "churn".to_string(),
            run_id: "abc123".to_string(),
            count: 2,
        };
        assert!(err.to_string().starts_with("2 versions"));
    }

    #[test]
    fn test_client_error_converts_into_tracking_error() {
        let client_err = ClientError::Network("timeout".to_string());
        let err: TrackingError = client_err.clone().into();
        assert_eq!(err, TrackingError::Client(client_err));
        assert!(err.to_string().starts_with("Tracking client error"));
    }
}
