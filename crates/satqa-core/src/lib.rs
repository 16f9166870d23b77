//! Shared contract types and configuration for the SATQA services.
//!
//! The [`AnalysisResult`] shape defined here is the only thing the Inspection
//! Service and the Upload Front-End agree on; [`analysis_response_schema`] is
//! the same shape expressed as the schema handed to the model.

pub mod analysis;
pub mod app_config;
pub mod config;
pub mod schema;

use thiserror::Error;

pub use analysis::{AnalysisResult, Assessment, IssueCategory};
pub use app_config::{Environment, FrontendConfig, InspectorConfig};
pub use config::{
    load_frontend_config, load_frontend_config_from_env, load_inspector_config,
    load_inspector_config_from_env,
};
pub use schema::analysis_response_schema;

/// MIME type assumed for images whose type was not declared.
pub const DEFAULT_IMAGE_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{category} confidence {value} is outside [0.0, 1.0]")]
    ConfidenceOutOfRange {
        category: IssueCategory,
        value: f64,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
