//! Domain types shared across run logging and model selection.
//!
//! These mirror the records held by the tracking service: runs with
//! their metric/parameter maps, registered models, and the versions
//! attached to them. All of them serialize cleanly so fakes and wire
//! clients can exchange the same shapes.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::TrackingError;

// ============================================================================
// Lifecycle stages
// ============================================================================

/// Lifecycle stage of a registered model version.
///
/// The set is closed and any stage may transition to any other; only a
/// promotion triggers a transition. Freshly created versions start in
/// [`Stage::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    None,
    Staging,
    Production,
    Archived,
}

impl Stage {
    /// Every stage, in lifecycle order.
    pub const ALL: [Stage; 4] = [Stage::None, Stage::Staging, Stage::Production, Stage::Archived];

    /// Canonical text used by the tracking service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::None => "None",
            Stage::Staging => "Staging",
            Stage::Production => "Production",
            Stage::Archived => "Archived",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Stage {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| TrackingError::Configuration(format!("Unknown stage: '{}'", s)))
    }
}

// ============================================================================
// Runs
// ============================================================================

/// Run status as reported by the tracking service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Finished,
}

/// A single tracking run with its logged data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Service-assigned run ID
    pub run_id: String,
    /// Owning experiment ID
    pub experiment_id: String,
    /// Root URI of the run's artifact area
    pub artifact_uri: String,
    /// Metrics logged so far (last write wins per key)
    pub metrics: HashMap<String, f64>,
    /// Parameters logged so far (last write wins per key)
    pub params: HashMap<String, serde_json::Value>,
    /// Status
    pub status: RunStatus,
    /// Start time (RFC 3339)
    pub started_at: String,
    /// End time (RFC 3339), present once finished
    pub ended_at: Option<String>,
}

impl Run {
    /// Create a freshly started run.
    pub fn new(
        run_id: impl Into<String>,
        experiment_id: impl Into<String>,
        artifact_uri: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            experiment_id: experiment_id.into(),
            artifact_uri: artifact_uri.into(),
            metrics: HashMap::new(),
            params: HashMap::new(),
            status: RunStatus::Running,
            started_at: chrono::Utc::now().to_rfc3339(),
            ended_at: None,
        }
    }

    /// Log a metric (overwrites any previous value for the name).
    pub fn log_metric(&mut self, name: impl Into<String>, value: f64) {
        self.metrics.insert(name.into(), value);
    }

    /// Log a parameter (overwrites any previous value for the name).
    pub fn log_param(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.params.insert(name.into(), value);
    }

    /// Close the run.
    pub fn finish(&mut self) {
        self.ended_at = Some(chrono::Utc::now().to_rfc3339());
        self.status = RunStatus::Finished;
    }
}

// ============================================================================
// Registered models and versions
// ============================================================================

/// One version of a registered model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    /// Registered model this version belongs to
    pub name: String,
    /// Version number: a monotonically increasing integer, carried as
    /// text because that is the service's canonical representation
    pub version: String,
    /// Current lifecycle stage
    pub stage: Stage,
    /// Run that produced this version (immutable once set)
    pub run_id: String,
    /// Locator for the stored artifact
    pub source: String,
    /// Identity that created the version
    pub created_by: String,
    /// Creation time (RFC 3339)
    pub created_at: String,
}

impl ModelVersion {
    /// Create a version record in the initial [`Stage::None`].
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        run_id: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            stage: Stage::None,
            run_id: run_id.into(),
            source: source.into(),
            created_by: "unknown".to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_created_by(mut self, creator: impl Into<String>) -> Self {
        self.created_by = creator.into();
        self
    }
}

/// A registry entry: a name plus every version recorded under it.
///
/// Versions appear in creation order, which is not necessarily numeric
/// order; callers that need "latest" must sort by version number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredModel {
    pub name: String,
    pub versions: Vec<ModelVersion>,
}

impl RegisteredModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: Vec::new(),
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Opaque serialized model bytes in a flavor's native format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPayload {
    bytes: Vec<u8>,
}

impl ModelPayload {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ============================================================================
// Version ordering
// ============================================================================

/// Compare two version numbers in their textual representation.
///
/// Both sides parsing as integers compares numerically ("10" > "9");
/// anything else falls back to lexicographic order. Service-assigned
/// versions are always integers, so the fallback only guards against
/// foreign data.
pub(crate) fn compare_versions(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(lhs), Ok(rhs)) => lhs.cmp(&rhs),
        _ => a.cmp(b),
    }
}
