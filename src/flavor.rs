//! Model flavor tags and loader dispatch keys.
//!
//! Flavors form a closed set: tags cross the public API as text, are
//! parsed into [`ModelFlavor`] exactly once at the boundary, and every
//! downstream dispatch (artifact upload, materialization) keys on the
//! enum. Unknown tags are rejected before any remote traffic happens.

use crate::error::TrackingError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Serialization format family of a trained model artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelFlavor {
    /// Gradient-boosted tree ensembles.
    TreeEnsembleBoosting,
    /// Bagged tree ensembles (random forests and friends).
    TreeEnsembleBagging,
    /// Generic estimators serialized through the common pipeline format.
    GenericEstimator,
}

impl ModelFlavor {
    /// Every supported flavor, in canonical order.
    pub const ALL: [ModelFlavor; 3] = [
        ModelFlavor::TreeEnsembleBoosting,
        ModelFlavor::TreeEnsembleBagging,
        ModelFlavor::GenericEstimator,
    ];

    /// Canonical text tag accepted at the public boundary.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::TreeEnsembleBoosting => "tree-ensemble-boosting",
            Self::TreeEnsembleBagging => "tree-ensemble-bagging",
            Self::GenericEstimator => "generic-estimator",
        }
    }

    /// Parse a flavor tag, rejecting anything outside the closed set.
    ///
    /// Matching is exact: tags are lowercase kebab-case and no aliases
    /// or case folding are applied.
    pub fn parse(tag: &str) -> Result<Self, TrackingError> {
        Self::ALL
            .iter()
            .copied()
            .find(|flavor| flavor.tag() == tag)
            .ok_or_else(|| TrackingError::UnsupportedFlavor(tag.to_string()))
    }
}

impl std::fmt::Display for ModelFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for ModelFlavor {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
