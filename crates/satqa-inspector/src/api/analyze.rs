//! Inspection handlers.
//!
//! - `POST /analyze`: image referenced by `gs://` URI
//! - `POST /analyze/image`: image bytes as the request body

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    Extension, Json,
};
use satqa_core::AnalysisResult;
use satqa_vertex::VertexError;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct AnalyzeRequest {
    pub gcs_uri: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

pub(super) async fn analyze(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        ApiError::new(req_id.0.clone(), "bad_request", rejection.body_text())
    })?;
    let uri = body.gcs_uri.trim();
    if uri.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "gcs_uri must not be empty",
        ));
    }

    state
        .inspector
        .analyze_from_uri(uri, body.mime_type.as_deref())
        .await
        .map(Json)
        .map_err(|e| map_inspection_error(req_id.0, &e))
}

pub(super) async fn analyze_image(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AnalysisResult>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "request body must contain the image bytes",
        ));
    }

    let mime_type = declared_image_type(&headers);
    state
        .inspector
        .analyze_bytes(body.to_vec(), mime_type)
        .await
        .map(Json)
        .map_err(|e| map_inspection_error(req_id.0, &e))
}

/// `Content-Type` without parameters; generic binary types count as undeclared.
fn declared_image_type(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let essence = value.split(';').next().unwrap_or(value).trim();
    match essence {
        "" | "application/octet-stream" => None,
        other => Some(other),
    }
}

fn map_inspection_error(request_id: String, error: &VertexError) -> ApiError {
    tracing::error!(request_id = %request_id, error = %error, "inspection failed");
    ApiError::new(request_id, "inspection_failed", error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn declared_image_type_strips_parameters() {
        assert_eq!(
            declared_image_type(&headers("image/tiff; name=scene.tif")),
            Some("image/tiff")
        );
    }

    #[test]
    fn octet_stream_and_missing_type_are_undeclared() {
        assert_eq!(declared_image_type(&headers("application/octet-stream")), None);
        assert_eq!(declared_image_type(&HeaderMap::new()), None);
    }
}
