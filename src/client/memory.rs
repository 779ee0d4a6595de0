//! In-memory tracking service for tests and offline embedding.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::RwLock;

use super::TrackingClient;
use crate::error::ClientError;
use crate::flavor::ModelFlavor;
use crate::types::{ModelPayload, ModelVersion, RegisteredModel, Run, Stage};

/// Everything the fake service remembers, behind one lock.
#[derive(Debug, Default)]
struct RegistryState {
    /// Experiment path -> experiment ID
    experiments: HashMap<String, String>,
    /// Run ID -> run record
    runs: HashMap<String, Run>,
    /// Model name -> versions keyed by version text, in creation order
    models: HashMap<String, IndexMap<String, ModelVersion>>,
    /// Artifact locator -> upload flavor and stored payload
    artifacts: HashMap<String, (ModelFlavor, ModelPayload)>,
    next_experiment_id: u64,
}

/// A complete in-process tracking service.
///
/// Behaves like the real thing for every [`TrackingClient`] operation:
/// it assigns run IDs and monotonically increasing version numbers,
/// keeps versions in creation order, and stores artifacts under their
/// locator together with the flavor they were uploaded as. Loading an
/// artifact under a different flavor fails the way a native format
/// loader would.
#[derive(Debug)]
pub struct InMemoryTrackingClient {
    state: RwLock<RegistryState>,
    /// Identity recorded as creator of new versions
    user: String,
}

impl Default for InMemoryTrackingClient {
    fn default() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            user: "local".to_string(),
        }
    }
}

impl InMemoryTrackingClient {
    /// Create an empty fake service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the identity recorded as creator of new versions.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Pre-seed a version record, bypassing the run/artifact flow.
    ///
    /// Intended for arranging registry fixtures with explicit version
    /// numbers (including out-of-order creation). Versions are keyed by
    /// their number, so seeding a number the model already has replaces
    /// that record.
    pub fn seed_version(&self, version: ModelVersion) -> Result<(), ClientError> {
        let mut state = self.write_state()?;
        state
            .models
            .entry(version.name.clone())
            .or_default()
            .insert(version.version.clone(), version);
        Ok(())
    }

    /// Pre-seed an artifact at a locator.
    pub fn seed_artifact(
        &self,
        source: impl Into<String>,
        flavor: ModelFlavor,
        payload: ModelPayload,
    ) -> Result<(), ClientError> {
        let mut state = self.write_state()?;
        state.artifacts.insert(source.into(), (flavor, payload));
        Ok(())
    }

    /// Number of artifacts currently stored. Lets tests assert that a
    /// rejected operation wrote nothing.
    pub fn artifact_count(&self) -> Result<usize, ClientError> {
        Ok(self.read_state()?.artifacts.len())
    }

    /// Number of versions recorded across all registered models.
    pub fn version_count(&self) -> Result<usize, ClientError> {
        let state = self.read_state()?;
        Ok(state.models.values().map(IndexMap::len).sum())
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, RegistryState>, ClientError> {
        self.state
            .read()
            .map_err(|e| ClientError::Storage(format!("Lock error: {}", e)))
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, RegistryState>, ClientError> {
        self.state
            .write()
            .map_err(|e| ClientError::Storage(format!("Lock error: {}", e)))
    }

    fn next_version_number(versions: &IndexMap<String, ModelVersion>) -> u64 {
        versions
            .keys()
            .filter_map(|v| v.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            .saturating_add(1)
    }
}

impl TrackingClient for InMemoryTrackingClient {
    fn create_or_get_experiment(&self, path: &str) -> Result<String, ClientError> {
        let mut state = self.write_state()?;
        if let Some(id) = state.experiments.get(path) {
            return Ok(id.clone());
        }
        state.next_experiment_id += 1;
        let id = state.next_experiment_id.to_string();
        state.experiments.insert(path.to_string(), id.clone());
        Ok(id)
    }

    fn start_run(&self, experiment_id: &str) -> Result<Run, ClientError> {
        let mut state = self.write_state()?;
        if !state.experiments.values().any(|id| id == experiment_id) {
            return Err(ClientError::NotFound(format!(
                "experiment '{}'",
                experiment_id
            )));
        }
        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let artifact_uri = format!(
            "mem://experiments/{}/runs/{}/artifacts",
            experiment_id, run_id
        );
        let run = Run::new(run_id.clone(), experiment_id, artifact_uri);
        state.runs.insert(run_id, run.clone());
        Ok(run)
    }

    fn log_metrics(
        &self,
        run_id: &str,
        metrics: &HashMap<String, f64>,
    ) -> Result<(), ClientError> {
        let mut state = self.write_state()?;
        let run = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| ClientError::NotFound(format!("run '{}'", run_id)))?;
        for (name, value) in metrics {
            run.log_metric(name.clone(), *value);
        }
        Ok(())
    }

    fn log_params(
        &self,
        run_id: &str,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<(), ClientError> {
        let mut state = self.write_state()?;
        let run = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| ClientError::NotFound(format!("run '{}'", run_id)))?;
        for (name, value) in params {
            run.log_param(name.clone(), value.clone());
        }
        Ok(())
    }

    fn log_model_artifact(
        &self,
        run_id: &str,
        payload: &ModelPayload,
        flavor: ModelFlavor,
        artifact_path: &str,
        register_as: &str,
    ) -> Result<ModelVersion, ClientError> {
        let mut state = self.write_state()?;
        let run = state
            .runs
            .get(run_id)
            .ok_or_else(|| ClientError::NotFound(format!("run '{}'", run_id)))?;
        let source = format!("{}/{}", run.artifact_uri, artifact_path);

        state
            .artifacts
            .insert(source.clone(), (flavor, payload.clone()));

        let versions = state.models.entry(register_as.to_string()).or_default();
        let number = Self::next_version_number(versions).to_string();
        let version = ModelVersion::new(register_as, number.clone(), run_id, source)
            .with_created_by(self.user.clone());
        versions.insert(number, version.clone());
        Ok(version)
    }

    fn get_registered_model(&self, name: &str) -> Result<RegisteredModel, ClientError> {
        let state = self.read_state()?;
        let versions = state
            .models
            .get(name)
            .ok_or_else(|| ClientError::NotFound(format!("registered model '{}'", name)))?;
        Ok(RegisteredModel {
            name: name.to_string(),
            versions: versions.values().cloned().collect(),
        })
    }

    fn search_model_versions(&self, name: &str) -> Result<Vec<ModelVersion>, ClientError> {
        let state = self.read_state()?;
        Ok(state
            .models
            .get(name)
            .map(|versions| versions.values().cloned().collect())
            .unwrap_or_default())
    }

    fn transition_stage(
        &self,
        name: &str,
        version: &str,
        stage: Stage,
    ) -> Result<ModelVersion, ClientError> {
        let mut state = self.write_state()?;
        let record = state
            .models
            .get_mut(name)
            .and_then(|versions| versions.get_mut(version))
            .ok_or_else(|| {
                ClientError::NotFound(format!("version {} of registered model '{}'", version, name))
            })?;
        // stage moves, run binding never does
        record.stage = stage;
        Ok(record.clone())
    }

    fn load_model(&self, flavor: ModelFlavor, source: &str) -> Result<ModelPayload, ClientError> {
        let state = self.read_state()?;
        let (stored_flavor, payload) = state
            .artifacts
            .get(source)
            .ok_or_else(|| ClientError::NotFound(format!("artifact '{}'", source)))?;
        if *stored_flavor != flavor {
            return Err(ClientError::InvalidResponse(format!(
                "artifact '{}' was stored as '{}', not '{}'",
                source,
                stored_flavor.tag(),
                flavor.tag()
            )));
        }
        Ok(payload.clone())
    }

    fn end_run(&self, run_id: &str) -> Result<Run, ClientError> {
        let mut state = self.write_state()?;
        let run = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| ClientError::NotFound(format!("run '{}'", run_id)))?;
        run.finish();
        Ok(run.clone())
    }

    fn get_run(&self, run_id: &str) -> Result<Run, ClientError> {
        let state = self.read_state()?;
        state
            .runs
            .get(run_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("run '{}'", run_id)))
    }
}
