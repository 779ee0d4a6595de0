//! Experiment tracking and model registry client.
//!
//! bitacora wraps an external tracking service behind two components.
//! [`RunLogger`] opens runs under a named experiment, records metrics
//! and parameters, registers trained models, and promotes the versions
//! its runs produce. [`ModelSelector`] picks registered versions by
//! lifecycle stage or exact version number and materializes their
//! artifacts. The service itself stays behind the [`TrackingClient`]
//! trait; an in-memory fake and a synchronous REST client ship in
//! [`client`].

pub mod client;
pub mod config;
pub mod error;
pub mod flavor;
pub mod logger;
pub mod selector;
pub mod types;

// Re-export key types for convenience
pub use client::{InMemoryTrackingClient, RestTrackingClient, TrackingClient};
pub use config::TrackingConfig;
pub use error::{ClientError, TrackingError};
pub use flavor::ModelFlavor;
pub use logger::RunLogger;
pub use selector::{LoadedModel, ModelSelector};
pub use types::{ModelPayload, ModelVersion, RegisteredModel, Run, RunStatus, Stage};
