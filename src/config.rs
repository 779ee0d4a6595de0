//! Tracking configuration.
//!
//! Components receive their configuration as an explicit object;
//! nothing in this crate reads ambient process state or mutates a
//! global client. That keeps every component constructible against a
//! fake service in tests.

use serde::{Deserialize, Serialize};

/// Connection and logging settings for the tracking service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Base URI of the tracking service
    pub tracking_uri: String,

    /// Bearer token sent with every request, when the service requires one
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Artifact path under which uploaded models land inside a run's
    /// artifact area
    pub artifact_path: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            tracking_uri: "http://localhost:5000".to_string(),
            token: None,
            timeout_secs: 30,
            artifact_path: "model".to_string(),
        }
    }
}

impl TrackingConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Set the tracking service base URI.
    pub fn with_tracking_uri(mut self, uri: impl Into<String>) -> Self {
        self.tracking_uri = uri.into();
        self
    }

    /// Set the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the artifact path for uploaded models.
    pub fn with_artifact_path(mut self, path: impl Into<String>) -> Self {
        self.artifact_path = path.into();
        self
    }
}
