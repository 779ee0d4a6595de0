//! Model selection: pick a version of a registered model by stage or
//! by exact version number, then materialize its artifact.

use tracing::{debug, info, instrument};

use crate::client::TrackingClient;
use crate::error::{ClientError, TrackingError};
use crate::flavor::ModelFlavor;
use crate::types::{compare_versions, ModelPayload, ModelVersion, RegisteredModel, Stage};

/// A registered model version materialized for inference.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    /// Version record the payload came from
    pub version: ModelVersion,
    /// Flavor the payload was materialized as
    pub flavor: ModelFlavor,
    /// Serialized model bytes
    pub payload: ModelPayload,
}

/// Selects versions of one registered model and loads their artifacts.
///
/// The flavor is fixed at construction, so unsupported tags are
/// rejected before the selector can touch the service.
#[derive(Debug)]
pub struct ModelSelector<'a, C: TrackingClient> {
    client: &'a C,
    model_name: String,
    flavor: ModelFlavor,
}

impl<'a, C: TrackingClient> ModelSelector<'a, C> {
    /// Create a selector for one registered model.
    ///
    /// Fails with [`TrackingError::UnsupportedFlavor`] when the tag
    /// does not name a supported flavor.
    pub fn new(client: &'a C, model_name: &str, flavor_tag: &str) -> Result<Self, TrackingError> {
        let flavor = ModelFlavor::parse(flavor_tag)?;
        Ok(Self {
            client,
            model_name: model_name.to_string(),
            flavor,
        })
    }

    /// Name of the registered model this selector reads.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Flavor artifacts are materialized as.
    pub fn flavor(&self) -> ModelFlavor {
        self.flavor
    }

    /// Registry metadata for the model: its name plus every version in
    /// creation order.
    #[instrument(name = "selector.describe", skip(self), fields(model = %self.model_name))]
    pub fn registered_model(&self) -> Result<RegisteredModel, TrackingError> {
        self.client
            .get_registered_model(&self.model_name)
            .map_err(|e| match e {
                ClientError::NotFound(_) => TrackingError::NotFound {
                    model: self.model_name.clone(),
                    criteria: "model is not registered".to_string(),
                },
                other => TrackingError::Client(other),
            })
    }

    /// Load the newest version, optionally restricted to a stage.
    ///
    /// Versions sort by version number, newest first; the sort is
    /// stable, so equal numbers keep their creation order. With a
    /// stage given, the newest version currently in that stage wins.
    /// Fails with [`TrackingError::NotFound`] when nothing matches.
    #[instrument(
        name = "selector.load_latest",
        skip(self),
        fields(model = %self.model_name, stage = ?stage)
    )]
    pub fn load_latest(&self, stage: Option<Stage>) -> Result<LoadedModel, TrackingError> {
        let mut versions = self.client.search_model_versions(&self.model_name)?;
        versions.sort_by(|a, b| compare_versions(&b.version, &a.version));
        debug!(count = versions.len(), "Versions retrieved");

        let selected = versions
            .into_iter()
            .find(|version| stage.map_or(true, |wanted| version.stage == wanted))
            .ok_or_else(|| TrackingError::NotFound {
                model: self.model_name.clone(),
                criteria: match stage {
                    Some(wanted) => format!("no version in stage {}", wanted),
                    None => "no versions registered".to_string(),
                },
            })?;
        self.materialize(selected)
    }

    /// Load a version by its exact version number.
    ///
    /// The match is textual, exactly as the registry represents
    /// version numbers; "02" never matches version "2".
    #[instrument(
        name = "selector.load_by_version",
        skip(self),
        fields(model = %self.model_name, version = version)
    )]
    pub fn load_by_version(&self, version: &str) -> Result<LoadedModel, TrackingError> {
        let versions = self.client.search_model_versions(&self.model_name)?;
        let selected = versions
            .into_iter()
            .find(|candidate| candidate.version == version)
            .ok_or_else(|| TrackingError::NotFound {
                model: self.model_name.clone(),
                criteria: format!("no version {}", version),
            })?;
        self.materialize(selected)
    }

    fn materialize(&self, version: ModelVersion) -> Result<LoadedModel, TrackingError> {
        info!(
            model = %self.model_name,
            version = %version.version,
            trained_by = %version.created_by,
            "Loading model version"
        );
        let payload = self.client.load_model(self.flavor, &version.source)?;
        debug!(bytes = payload.len(), "Model materialized");
        Ok(LoadedModel {
            version,
            flavor: self.flavor,
            payload,
        })
    }
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
