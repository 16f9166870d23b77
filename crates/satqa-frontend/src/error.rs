use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("No files selected")]
    NoFiles,

    #[error("invalid upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("storage error: {0}")]
    Storage(#[from] satqa_gcp::GcpError),

    #[error("inspection service request failed: {0}")]
    InspectorHttp(#[from] reqwest::Error),

    #[error("inspection service returned HTTP {status}: {body}")]
    InspectorStatus { status: u16, body: String },

    #[error("inspection service response is not an analysis result: {0}")]
    InspectorResponse(#[source] serde_json::Error),

    #[error("invalid inspection service URL \"{url}\": {reason}")]
    InvalidInspectorUrl { url: String, reason: String },
}

impl FrontendError {
    fn status(&self) -> StatusCode {
        match self {
            FrontendError::NoFiles => StatusCode::BAD_REQUEST,
            FrontendError::Multipart(e) => e.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failures render as plain text carrying the raw error message.
impl IntoResponse for FrontendError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "upload failed");
        } else {
            tracing::warn!(error = %self, "upload rejected");
        }
        (status, self.to_string()).into_response()
    }
}
