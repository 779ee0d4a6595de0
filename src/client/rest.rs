//! Synchronous REST client for the tracking service.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::types::{
    metrics_to_wire, params_to_wire, CreateExperimentRequest, CreateExperimentResponse,
    CreateModelVersionRequest, CreateRegisteredModelRequest, CreateRunRequest, ErrorResponse,
    GetExperimentResponse, GetRegisteredModelResponse, LogBatchRequest, ModelVersionResponse,
    RunResponse, SearchModelVersionsResponse, TransitionStageRequest, UpdateRunRequest,
};
use super::TrackingClient;
use crate::config::TrackingConfig;
use crate::error::{ClientError, TrackingError};
use crate::flavor::ModelFlavor;
use crate::types::{ModelPayload, ModelVersion, RegisteredModel, Run, Stage};

/// Client for the tracking service's HTTP protocol.
///
/// Every call is a single blocking request with no retries; failures
/// surface immediately. Artifact upload and download go through the
/// service's proxied artifact endpoint, so only `mlflow-artifacts:/`
/// locators can be materialized.
#[derive(Debug)]
pub struct RestTrackingClient {
    http: reqwest::blocking::Client,
    base_url: String,
    token: Option<String>,
}

impl RestTrackingClient {
    /// Build a client from explicit configuration.
    pub fn new(config: &TrackingConfig) -> Result<Self, TrackingError> {
        if config.tracking_uri.trim().is_empty() {
            return Err(TrackingError::Configuration(
                "tracking URI is empty".to_string(),
            ));
        }

        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("bitacora/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                TrackingError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url: config.tracking_uri.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api/2.0/mlflow/{}", self.base_url, endpoint)
    }

    fn artifact_url(&self, rest_path: &str) -> String {
        format!(
            "{}/api/2.0/mlflow-artifacts/artifacts/{}",
            self.base_url, rest_path
        )
    }

    fn authorize(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// GET + status check + JSON parse helper.
    fn get_and_parse<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        context: &str,
    ) -> Result<T, ClientError> {
        let request = self.authorize(self.http.get(self.api_url(endpoint)).query(query));
        let response = request
            .send()
            .map_err(|e| ClientError::Network(format!("Failed to fetch {}: {}", context, e)))?;
        Self::parse_response(response, context)
    }

    /// POST + status check + JSON parse helper.
    fn post_and_parse<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
        context: &str,
    ) -> Result<T, ClientError> {
        let request = self.authorize(self.http.post(self.api_url(endpoint)).json(body));
        let response = request
            .send()
            .map_err(|e| ClientError::Network(format!("Failed to reach {}: {}", context, e)))?;
        Self::parse_response(response, context)
    }

    fn parse_response<T: DeserializeOwned>(
        response: reqwest::blocking::Response,
        context: &str,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(context.to_string()));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ClientError::PermissionDenied(context.to_string()));
        }
        if !status.is_success() {
            // the service reports the real failure kind in the body
            let error: Result<ErrorResponse, _> = response.json();
            return Err(match error {
                Ok(body) if body.error_code == "RESOURCE_DOES_NOT_EXIST" => {
                    ClientError::NotFound(context.to_string())
                }
                Ok(body) => ClientError::InvalidResponse(format!(
                    "Failed to {}: {} ({})",
                    context, body.message, body.error_code
                )),
                Err(_) => {
                    ClientError::InvalidResponse(format!("Failed to {}: HTTP {}", context, status))
                }
            });
        }
        response.json().map_err(|e| {
            ClientError::InvalidResponse(format!("Failed to parse {} response: {}", context, e))
        })
    }

    /// Quote a name as a search filter string literal.
    ///
    /// The filter grammar has no escape sequence, so the surrounding
    /// quote character must be one the name does not contain.
    fn filter_literal(name: &str) -> Result<String, ClientError> {
        if !name.contains('\'') {
            Ok(format!("'{}'", name))
        } else if !name.contains('"') {
            Ok(format!("\"{}\"", name))
        } else {
            Err(ClientError::InvalidRequest(format!(
                "model name {:?} cannot appear in a search filter: it contains both quote characters",
                name
            )))
        }
    }

    /// Relative artifact path for the proxied artifact endpoint.
    fn artifact_rest_path(uri: &str) -> Result<&str, ClientError> {
        uri.strip_prefix("mlflow-artifacts:")
            .map(|path| path.trim_start_matches('/'))
            .ok_or_else(|| {
                ClientError::InvalidResponse(format!(
                    "Unsupported artifact locator '{}': only service-proxied artifacts are supported",
                    uri
                ))
            })
    }

    /// Create the registered model if the registry does not know it yet.
    fn ensure_registered_model(&self, name: &str) -> Result<(), ClientError> {
        let context = format!("registered model '{}'", name);
        let existing: Result<GetRegisteredModelResponse, ClientError> =
            self.get_and_parse("registered-models/get", &[("name", name)], &context);
        match existing {
            Ok(_) => Ok(()),
            Err(ClientError::NotFound(_)) => {
                debug!(model = name, "Creating registered model");
                let request = CreateRegisteredModelRequest {
                    name: name.to_string(),
                };
                let _: serde_json::Value =
                    self.post_and_parse("registered-models/create", &request, &context)?;
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

impl TrackingClient for RestTrackingClient {
    #[instrument(name = "tracking.experiment.ensure", skip(self), fields(path = path))]
    fn create_or_get_experiment(&self, path: &str) -> Result<String, ClientError> {
        let context = format!("experiment '{}'", path);
        let existing: Result<GetExperimentResponse, ClientError> = self.get_and_parse(
            "experiments/get-by-name",
            &[("experiment_name", path)],
            &context,
        );
        match existing {
            Ok(response) => {
                debug!(
                    experiment_id = %response.experiment.experiment_id,
                    "Experiment already exists"
                );
                Ok(response.experiment.experiment_id)
            }
            Err(ClientError::NotFound(_)) => {
                let request = CreateExperimentRequest {
                    name: path.to_string(),
                };
                let created: CreateExperimentResponse =
                    self.post_and_parse("experiments/create", &request, &context)?;
                info!(experiment_id = %created.experiment_id, "Experiment created");
                Ok(created.experiment_id)
            }
            Err(other) => Err(other),
        }
    }

    #[instrument(name = "tracking.run.start", skip(self), fields(experiment_id = experiment_id))]
    fn start_run(&self, experiment_id: &str) -> Result<Run, ClientError> {
        let request = CreateRunRequest {
            experiment_id: experiment_id.to_string(),
            start_time: Self::now_millis(),
        };
        let context = format!("run under experiment '{}'", experiment_id);
        let response: RunResponse = self.post_and_parse("runs/create", &request, &context)?;
        let run = response.run.into_domain()?;
        info!(run_id = %run.run_id, "Run started");
        Ok(run)
    }

    #[instrument(
        name = "tracking.run.log_metrics",
        skip(self, metrics),
        fields(run_id = run_id, count = metrics.len())
    )]
    fn log_metrics(
        &self,
        run_id: &str,
        metrics: &HashMap<String, f64>,
    ) -> Result<(), ClientError> {
        let request = LogBatchRequest {
            run_id: run_id.to_string(),
            metrics: metrics_to_wire(metrics, Self::now_millis()),
            params: Vec::new(),
        };
        let context = format!("metrics for run '{}'", run_id);
        let _: serde_json::Value = self.post_and_parse("runs/log-batch", &request, &context)?;
        debug!("Metrics logged");
        Ok(())
    }

    #[instrument(
        name = "tracking.run.log_params",
        skip(self, params),
        fields(run_id = run_id, count = params.len())
    )]
    fn log_params(
        &self,
        run_id: &str,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<(), ClientError> {
        let request = LogBatchRequest {
            run_id: run_id.to_string(),
            metrics: Vec::new(),
            params: params_to_wire(params),
        };
        let context = format!("params for run '{}'", run_id);
        let _: serde_json::Value = self.post_and_parse("runs/log-batch", &request, &context)?;
        debug!("Params logged");
        Ok(())
    }

    #[instrument(
        name = "tracking.model.register",
        skip(self, payload),
        fields(run_id = run_id, model = register_as, flavor = %flavor, bytes = payload.len())
    )]
    fn log_model_artifact(
        &self,
        run_id: &str,
        payload: &ModelPayload,
        flavor: ModelFlavor,
        artifact_path: &str,
        register_as: &str,
    ) -> Result<ModelVersion, ClientError> {
        let run = self.get_run(run_id)?;
        let source = format!("{}/{}", run.artifact_uri, artifact_path);
        let rest_path = Self::artifact_rest_path(&source)?;

        let upload_context = format!("artifact upload for run '{}'", run_id);
        let response = self
            .authorize(
                self.http
                    .put(self.artifact_url(rest_path))
                    .body(payload.as_bytes().to_vec()),
            )
            .send()
            .map_err(|e| {
                ClientError::Network(format!("Failed to reach {}: {}", upload_context, e))
            })?;
        if !response.status().is_success() {
            return Err(ClientError::InvalidResponse(format!(
                "Failed to {}: HTTP {}",
                upload_context,
                response.status()
            )));
        }
        debug!(source = %source, "Artifact uploaded");

        self.ensure_registered_model(register_as)?;

        let request = CreateModelVersionRequest {
            name: register_as.to_string(),
            source: source.clone(),
            run_id: run_id.to_string(),
        };
        let context = format!("version of registered model '{}'", register_as);
        let response: ModelVersionResponse =
            self.post_and_parse("model-versions/create", &request, &context)?;
        let version = response.model_version.into_domain()?;
        info!(version = %version.version, "Model version registered");
        Ok(version)
    }

    #[instrument(name = "tracking.model.get", skip(self), fields(model = name))]
    fn get_registered_model(&self, name: &str) -> Result<RegisteredModel, ClientError> {
        let context = format!("registered model '{}'", name);
        let response: GetRegisteredModelResponse =
            self.get_and_parse("registered-models/get", &[("name", name)], &context)?;
        let versions = self.search_model_versions(&response.registered_model.name)?;
        Ok(RegisteredModel {
            name: response.registered_model.name,
            versions,
        })
    }

    #[instrument(name = "tracking.model.search", skip(self), fields(model = name))]
    fn search_model_versions(&self, name: &str) -> Result<Vec<ModelVersion>, ClientError> {
        let filter = format!("name={}", Self::filter_literal(name)?);
        let context = format!("versions of registered model '{}'", name);
        let response: Result<SearchModelVersionsResponse, ClientError> =
            self.get_and_parse("model-versions/search", &[("filter", &filter)], &context);
        let versions = match response {
            Ok(body) => body.model_versions,
            // unknown model names are an empty listing, not an error
            Err(ClientError::NotFound(_)) => Vec::new(),
            Err(other) => return Err(other),
        };
        debug!(count = versions.len(), "Versions listed");
        versions
            .into_iter()
            .map(|version| version.into_domain())
            .collect()
    }

    #[instrument(
        name = "tracking.model.transition",
        skip(self),
        fields(model = name, version = version, stage = %stage)
    )]
    fn transition_stage(
        &self,
        name: &str,
        version: &str,
        stage: Stage,
    ) -> Result<ModelVersion, ClientError> {
        let request = TransitionStageRequest {
            name: name.to_string(),
            version: version.to_string(),
            stage: stage.as_str().to_string(),
            archive_existing_versions: false,
        };
        let context = format!("stage transition for '{}' version {}", name, version);
        let response: ModelVersionResponse =
            self.post_and_parse("model-versions/transition-stage", &request, &context)?;
        let updated = response.model_version.into_domain()?;
        info!("Stage transition applied");
        Ok(updated)
    }

    #[instrument(name = "tracking.model.load", skip(self), fields(flavor = %flavor, source = source))]
    fn load_model(&self, flavor: ModelFlavor, source: &str) -> Result<ModelPayload, ClientError> {
        let rest_path = Self::artifact_rest_path(source)?;
        let context = format!("artifact '{}'", source);
        let response = self
            .authorize(self.http.get(self.artifact_url(rest_path)))
            .send()
            .map_err(|e| ClientError::Network(format!("Failed to fetch {}: {}", context, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(context));
        }
        if !status.is_success() {
            return Err(ClientError::InvalidResponse(format!(
                "Failed to fetch {}: HTTP {}",
                context, status
            )));
        }
        let bytes = response.bytes().map_err(|e| {
            ClientError::Network(format!("Failed to read {}: {}", context, e))
        })?;
        debug!(bytes = bytes.len(), "Artifact downloaded");
        Ok(ModelPayload::from_bytes(bytes.to_vec()))
    }

    #[instrument(name = "tracking.run.end", skip(self), fields(run_id = run_id))]
    fn end_run(&self, run_id: &str) -> Result<Run, ClientError> {
        let request = UpdateRunRequest {
            run_id: run_id.to_string(),
            status: "FINISHED".to_string(),
            end_time: Self::now_millis(),
        };
        let context = format!("run '{}'", run_id);
        let _: serde_json::Value = self.post_and_parse("runs/update", &request, &context)?;
        info!("Run finished");
        self.get_run(run_id)
    }

    #[instrument(name = "tracking.run.get", skip(self), fields(run_id = run_id))]
    fn get_run(&self, run_id: &str) -> Result<Run, ClientError> {
        let context = format!("run '{}'", run_id);
        let response: RunResponse =
            self.get_and_parse("runs/get", &[("run_id", run_id)], &context)?;
        response.run.into_domain()
    }
}
