//! Wire types for the tracking service REST protocol.
//!
//! Request and response shapes follow the server's JSON contract;
//! conversions into the crate's domain types live next to the shapes
//! they convert. Params travel as text on the wire because that is how
//! the service stores them, so values read back as JSON strings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ClientError;
use crate::types::{ModelVersion, Run, RunStatus, Stage};

// ============================================================================
// Experiments
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CreateExperimentRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateExperimentResponse {
    pub experiment_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetExperimentResponse {
    pub experiment: ExperimentData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentData {
    pub experiment_id: String,
}

// ============================================================================
// Runs
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CreateRunRequest {
    pub experiment_id: String,
    pub start_time: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateRunRequest {
    pub run_id: String,
    pub status: String,
    pub end_time: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunResponse {
    pub run: RunRecord,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunRecord {
    pub info: RunInfo,
    #[serde(default)]
    pub data: RunData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub experiment_id: String,
    #[serde(default)]
    pub artifact_uri: String,
    pub status: String,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub end_time: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunData {
    #[serde(default)]
    pub metrics: Vec<MetricData>,
    #[serde(default)]
    pub params: Vec<ParamData>,
}

/// One metric entry. The service reports the latest value per key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricData {
    pub key: String,
    pub value: f64,
    pub timestamp: i64,
    #[serde(default)]
    pub step: i64,
}

/// One parameter entry. The service stores values as text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamData {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogBatchRequest {
    pub run_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<MetricData>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamData>,
}

// ============================================================================
// Registered models and versions
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CreateRegisteredModelRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetRegisteredModelResponse {
    pub registered_model: RegisteredModelData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredModelData {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateModelVersionRequest {
    pub name: String,
    pub source: String,
    pub run_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelVersionResponse {
    pub model_version: ModelVersionData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchModelVersionsResponse {
    #[serde(default)]
    pub model_versions: Vec<ModelVersionData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitionStageRequest {
    pub name: String,
    pub version: String,
    pub stage: String,
    /// The server can archive whatever already holds the target stage;
    /// promotion here moves exactly one version, so this stays off.
    pub archive_existing_versions: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelVersionData {
    pub name: String,
    pub version: String,
    pub current_stage: String,
    pub source: String,
    pub run_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub creation_timestamp: Option<i64>,
}

// ============================================================================
// Errors
// ============================================================================

/// Error body the service attaches to non-success responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Conversions
// ============================================================================

fn millis_to_rfc3339(millis: Option<i64>) -> Option<String> {
    millis
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map(|dt| dt.to_rfc3339())
}

impl RunRecord {
    /// Convert the wire record into a domain [`Run`].
    pub fn into_domain(self) -> Result<Run, ClientError> {
        // the domain only distinguishes active from closed runs, so
        // every terminal service status maps to Finished
        let status = match self.info.status.as_str() {
            "RUNNING" => RunStatus::Running,
            _ => RunStatus::Finished,
        };
        let metrics = self
            .data
            .metrics
            .into_iter()
            .map(|m| (m.key, m.value))
            .collect();
        let params = self
            .data
            .params
            .into_iter()
            .map(|p| (p.key, serde_json::Value::String(p.value)))
            .collect();
        Ok(Run {
            run_id: self.info.run_id,
            experiment_id: self.info.experiment_id,
            artifact_uri: self.info.artifact_uri,
            metrics,
            params,
            status,
            started_at: millis_to_rfc3339(self.info.start_time).unwrap_or_default(),
            ended_at: millis_to_rfc3339(self.info.end_time),
        })
    }
}

impl ModelVersionData {
    /// Convert the wire record into a domain [`ModelVersion`].
    pub fn into_domain(self) -> Result<ModelVersion, ClientError> {
        let stage: Stage = self.current_stage.parse().map_err(|_| {
            ClientError::InvalidResponse(format!(
                "Unknown stage '{}' on version {} of '{}'",
                self.current_stage, self.version, self.name
            ))
        })?;
        Ok(ModelVersion {
            name: self.name,
            version: self.version,
            stage,
            run_id: self.run_id,
            source: self.source,
            created_by: self.user_id.unwrap_or_else(|| "unknown".to_string()),
            created_at: millis_to_rfc3339(self.creation_timestamp).unwrap_or_default(),
        })
    }
}

/// Flatten a metrics map into wire entries with one shared timestamp.
pub fn metrics_to_wire(metrics: &HashMap<String, f64>, timestamp: i64) -> Vec<MetricData> {
    metrics
        .iter()
        .map(|(key, value)| MetricData {
            key: key.clone(),
            value: *value,
            timestamp,
            step: 0,
        })
        .collect()
}

/// Flatten a params map into wire entries. String values travel as
/// their raw text, everything else as compact JSON.
pub fn params_to_wire(params: &HashMap<String, serde_json::Value>) -> Vec<ParamData> {
    params
        .iter()
        .map(|(key, value)| ParamData {
            key: key.clone(),
            value: match value {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_record_into_domain() {
        let json = r#"{
            "run": {
                "info": {
                    "run_id": "abc123",
                    "experiment_id": "7",
                    "artifact_uri": "mlflow-artifacts:/7/abc123/artifacts",
                    "status": "RUNNING",
                    "start_time": 1666309693000
                },
                "data": {
                    "metrics": [{"key": "auc", "value": 0.93, "timestamp": 1666309693000}],
                    "params": [{"key": "date", "value": "2022-01-01"}]
                }
            }
        }"#;
        let response: RunResponse = serde_json::from_str(json).unwrap();
        let run = response.run.into_domain().unwrap();
        assert_eq!(run.run_id, "abc123");
        assert_eq!(run.experiment_id, "7");
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.metrics.get("auc"), Some(&0.93));
        assert_eq!(
            run.params.get("date"),
            Some(&serde_json::Value::String("2022-01-01".to_string()))
        );
        assert!(run.started_at.starts_with("2022-10-2"));
        assert!(run.ended_at.is_none());
    }

    #[test]
    fn test_run_record_missing_data_section_defaults_empty() {
        let json = r#"{
            "run": {
                "info": {
                    "run_id": "abc123",
                    "experiment_id": "7",
                    "status": "FINISHED",
                    "end_time": 1666309700000
                }
            }
        }"#;
        let response: RunResponse = serde_json::from_str(json).unwrap();
        let run = response.run.into_domain().unwrap();
        assert_eq!(run.status, RunStatus::Finished);
        assert!(run.metrics.is_empty());
        assert!(run.params.is_empty());
        assert!(run.ended_at.is_some());
    }

    #[test]
    fn test_model_version_into_domain() {
        let json = r#"{
            "model_version": {
                "name": "churn",
                "version": "3",
                "current_stage": "Production",
                "source": "mlflow-artifacts:/7/abc123/artifacts/model",
                "run_id": "abc123",
                "user_id": "ana",
                "creation_timestamp": 1666309693000
            }
        }"#;
        let response: ModelVersionResponse = serde_json::from_str(json).unwrap();
        let version = response.model_version.into_domain().unwrap();
        assert_eq!(version.version, "3");
        assert_eq!(version.stage, Stage::Production);
        assert_eq!(version.created_by, "ana");
    }

    #[test]
    fn test_model_version_unknown_stage_is_invalid_response() {
        let data = ModelVersionData {
            name: "churn".to_string(),
            version: "1".to_string(),
            current_stage: "Shadow".to_string(),
            source: "mem://x".to_string(),
            run_id: "r1".to_string(),
            user_id: None,
            creation_timestamp: None,
        };
        let err = data.into_domain().unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse(_)));
        assert!(err.to_string().contains("Shadow"));
    }

    #[test]
    fn test_search_response_defaults_to_empty_list() {
        let response: SearchModelVersionsResponse = serde_json::from_str("{}").unwrap();
        assert!(response.model_versions.is_empty());
    }

    #[test]
    fn test_params_to_wire_keeps_strings_raw() {
        let mut params = HashMap::new();
        params.insert(
            "date".to_string(),
            serde_json::Value::String("2022-01-01".to_string()),
        );
        params.insert("depth".to_string(), serde_json::json!(8));

        let mut wire = params_to_wire(&params);
        wire.sort_by(|a, b| a.key.cmp(&b.key));
        assert_eq!(wire[0].key, "date");
        assert_eq!(wire[0].value, "2022-01-01");
        assert_eq!(wire[1].key, "depth");
        assert_eq!(wire[1].value, "8");
    }
}
