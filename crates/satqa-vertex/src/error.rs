use std::path::PathBuf;

use thiserror::Error;

/// Errors returned while asking the model for a verdict.
#[derive(Debug, Error)]
pub enum VertexError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No bearer token could be obtained.
    #[error("credential error: {0}")]
    Auth(#[from] satqa_gcp::GcpError),

    /// Vertex AI answered with a non-2xx status.
    #[error("Vertex AI returned HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The response envelope could not be deserialized.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The prompt was blocked before any candidate was produced.
    #[error("request blocked by the model: {0}")]
    Blocked(String),

    /// The model produced no text to parse.
    #[error("model returned no text (finish reason: {})", .finish_reason.as_deref().unwrap_or("none"))]
    EmptyResponse { finish_reason: Option<String> },

    /// The model's text is not an analysis result.
    #[error("model output does not match the analysis schema: {0}")]
    MalformedVerdict(#[source] serde_json::Error),

    /// The verdict parsed but failed range checks.
    #[error("invalid verdict: {0}")]
    Verdict(#[from] satqa_core::CoreError),

    #[error("image not found at {}", .0.display())]
    ImageNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid Vertex AI endpoint \"{url}\": {reason}")]
    InvalidEndpoint { url: String, reason: String },
}
