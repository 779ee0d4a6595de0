//! Run logging: open a tracking run, record training data, register a
//! trained model, and promote the version that run produced.

use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

use crate::client::TrackingClient;
use crate::config::TrackingConfig;
use crate::error::TrackingError;
use crate::flavor::ModelFlavor;
use crate::types::{ModelPayload, ModelVersion, Run, Stage};

/// Logs one tracking run at a time against a named experiment.
///
/// A logger owns at most one open run: [`begin`](Self::begin) opens
/// one, the logging operations write against it, and
/// [`end`](Self::end) closes it. After `end`, every logging operation
/// fails with [`TrackingError::SessionClosed`] until `begin` opens a
/// fresh run. Two loggers never share a run, and concurrent promotions
/// of the same version resolve to whoever wrote last.
#[derive(Debug)]
pub struct RunLogger<'a, C: TrackingClient> {
    client: &'a C,
    /// Artifact path for uploaded models inside the run's artifact area
    artifact_path: String,
    current_run: Option<Run>,
}

impl<'a, C: TrackingClient> RunLogger<'a, C> {
    /// Create a logger with no open run.
    pub fn new(client: &'a C, config: &TrackingConfig) -> Self {
        Self {
            client,
            artifact_path: config.artifact_path.clone(),
            current_run: None,
        }
    }

    /// Open a run under the named experiment, creating the experiment
    /// on first use.
    ///
    /// Fails with [`TrackingError::Configuration`] when the path is
    /// empty, when a run is already open, or when the experiment cannot
    /// be established (unreachable service included).
    #[instrument(name = "logger.begin", skip(self), fields(experiment = experiment_path))]
    pub fn begin(&mut self, experiment_path: &str) -> Result<&Run, TrackingError> {
        if experiment_path.trim().is_empty() {
            return Err(TrackingError::Configuration(
                "experiment path is empty".to_string(),
            ));
        }
        if self.current_run.is_some() {
            return Err(TrackingError::Configuration(
                "a run is already open; end it before beginning another".to_string(),
            ));
        }

        let experiment_id = self
            .client
            .create_or_get_experiment(experiment_path)
            .map_err(|e| {
                TrackingError::Configuration(format!(
                    "cannot establish experiment '{}': {}",
                    experiment_path, e
                ))
            })?;
        let run = self.client.start_run(&experiment_id).map_err(|e| {
            TrackingError::Configuration(format!(
                "cannot open run under experiment '{}': {}",
                experiment_path, e
            ))
        })?;

        info!(run_id = %run.run_id, experiment_id = %run.experiment_id, "Run opened");
        Ok(self.current_run.insert(run))
    }

    /// Run ID of the open run, when one is open.
    pub fn current_run_id(&self) -> Option<&str> {
        self.current_run.as_ref().map(|run| run.run_id.as_str())
    }

    /// Record metrics and parameters against the open run.
    ///
    /// Either mapping may be empty. Re-recorded names overwrite: the
    /// external log keeps the last value written per name.
    #[instrument(
        name = "logger.record",
        skip_all,
        fields(metrics = metrics.len(), params = params.len())
    )]
    pub fn record(
        &self,
        metrics: &HashMap<String, f64>,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<(), TrackingError> {
        let run = self.open_run()?;
        self.client.log_metrics(&run.run_id, metrics)?;
        self.client.log_params(&run.run_id, params)?;
        debug!(run_id = %run.run_id, "Training data recorded");
        Ok(())
    }

    /// Upload a trained model into the run's artifact area and register
    /// it under `model_name`.
    ///
    /// The flavor tag must name a supported flavor; unknown tags fail
    /// with [`TrackingError::UnsupportedFlavor`] before anything
    /// reaches the service. The created version starts in
    /// [`Stage::None`] and is bound to the open run's ID.
    #[instrument(
        name = "logger.register_model",
        skip(self, model),
        fields(model = model_name, flavor = flavor_tag)
    )]
    pub fn register_model(
        &self,
        model: &ModelPayload,
        flavor_tag: &str,
        model_name: &str,
    ) -> Result<ModelVersion, TrackingError> {
        let flavor = ModelFlavor::parse(flavor_tag)?;
        let run = self.open_run()?;
        let version = self.client.log_model_artifact(
            &run.run_id,
            model,
            flavor,
            &self.artifact_path,
            model_name,
        )?;
        info!(version = %version.version, run_id = %run.run_id, "Model registered");
        Ok(version)
    }

    /// Promote the version of `model_name` that the open run registered.
    ///
    /// Exactly one version of the model may be bound to the run's ID:
    /// zero fails with [`TrackingError::VersionNotFound`], several with
    /// [`TrackingError::AmbiguousVersion`]. On success only the stage
    /// moves; the version's run binding never changes.
    #[instrument(
        name = "logger.promote",
        skip(self),
        fields(model = model_name, stage = %target_stage)
    )]
    pub fn promote(
        &self,
        model_name: &str,
        target_stage: Stage,
    ) -> Result<ModelVersion, TrackingError> {
        let run = self.open_run()?;
        let versions = self.client.search_model_versions(model_name)?;
        let matches: Vec<ModelVersion> = versions
            .into_iter()
            .filter(|version| version.run_id == run.run_id)
            .collect();

        let candidate = match matches.as_slice() {
            [] => {
                warn!(run_id = %run.run_id, "No version of the model is bound to this run");
                return Err(TrackingError::VersionNotFound {
                    model: model_name.to_string(),
                    run_id: run.run_id.clone(),
                });
            }
            [single] => single,
            many => {
                warn!(
                    run_id = %run.run_id,
                    count = many.len(),
                    "Several versions of the model are bound to this run"
                );
                return Err(TrackingError::AmbiguousVersion {
                    model: model_name.to_string(),
                    run_id: run.run_id.clone(),
                    count: many.len(),
                });
            }
        };

        let updated = self
            .client
            .transition_stage(model_name, &candidate.version, target_stage)?;
        info!(version = %updated.version, "Model promoted");
        Ok(updated)
    }

    /// Close the open run and return its final record.
    ///
    /// The run stays open if the service rejects the finalization, so
    /// the call can be repeated. Once closed, logging operations fail
    /// with [`TrackingError::SessionClosed`] until the next `begin`.
    #[instrument(name = "logger.end", skip(self))]
    pub fn end(&mut self) -> Result<Run, TrackingError> {
        let run_id = self.open_run()?.run_id.clone();
        let finished = self.client.end_run(&run_id)?;
        self.current_run = None;
        info!(run_id = %finished.run_id, "Run closed");
        Ok(finished)
    }

    fn open_run(&self) -> Result<&Run, TrackingError> {
        self.current_run
            .as_ref()
            .ok_or(TrackingError::SessionClosed)
    }
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
