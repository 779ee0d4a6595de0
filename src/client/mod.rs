//! Tracking service clients.
//!
//! [`TrackingClient`] is the boundary between this crate's components
//! and the external tracking service. Two implementations ship here:
//!
//! - [`InMemoryTrackingClient`]: a complete in-process fake for tests
//!   and embedders that need one
//! - [`RestTrackingClient`]: a synchronous HTTP client for real
//!   deployments

mod memory;
mod rest;
mod types;

pub use memory::InMemoryTrackingClient;
pub use rest::RestTrackingClient;

use crate::error::ClientError;
use crate::flavor::ModelFlavor;
use crate::types::{ModelPayload, ModelVersion, RegisteredModel, Run, Stage};
use std::collections::HashMap;

/// Boundary to the external tracking service.
///
/// All operations are synchronous, blocking calls with no retries;
/// failures surface immediately as [`ClientError`]. Implementations
/// take `&self` so one client instance can serve several components
/// at once.
pub trait TrackingClient: Send + Sync {
    /// Create the named experiment if it does not exist yet and return
    /// its ID.
    fn create_or_get_experiment(&self, path: &str) -> Result<String, ClientError>;

    /// Open a new run under an experiment.
    fn start_run(&self, experiment_id: &str) -> Result<Run, ClientError>;

    /// Log metrics against a run. Re-logged names overwrite.
    fn log_metrics(&self, run_id: &str, metrics: &HashMap<String, f64>)
        -> Result<(), ClientError>;

    /// Log parameters against a run. Re-logged names overwrite.
    fn log_params(
        &self,
        run_id: &str,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<(), ClientError>;

    /// Upload a model artifact into the run's artifact area and create
    /// a version under the registered model `register_as`, bound to
    /// `run_id`. Creates the registered model on first use.
    fn log_model_artifact(
        &self,
        run_id: &str,
        payload: &ModelPayload,
        flavor: ModelFlavor,
        artifact_path: &str,
        register_as: &str,
    ) -> Result<ModelVersion, ClientError>;

    /// Fetch a registered model with every version recorded under it,
    /// in creation order.
    fn get_registered_model(&self, name: &str) -> Result<RegisteredModel, ClientError>;

    /// List every version of a registered model. Unknown names yield an
    /// empty list, not an error.
    fn search_model_versions(&self, name: &str) -> Result<Vec<ModelVersion>, ClientError>;

    /// Move a version to a new lifecycle stage and return the updated
    /// record. The version's run binding never changes.
    fn transition_stage(
        &self,
        name: &str,
        version: &str,
        stage: Stage,
    ) -> Result<ModelVersion, ClientError>;

    /// Materialize a stored model artifact in the given flavor.
    fn load_model(&self, flavor: ModelFlavor, source: &str) -> Result<ModelPayload, ClientError>;

    /// Close a run and return its final record.
    fn end_run(&self, run_id: &str) -> Result<Run, ClientError>;

    /// Fetch a run with its logged data.
    fn get_run(&self, run_id: &str) -> Result<Run, ClientError>;
}
