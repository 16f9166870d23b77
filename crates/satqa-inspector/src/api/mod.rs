mod analyze;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use satqa_vertex::SatelliteInspector;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id;

/// Largest raw image accepted by `POST /analyze/image`.
const MAX_IMAGE_BYTES: usize = 32 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub inspector: Arc<SatelliteInspector>,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct ServiceInfo {
    message: &'static str,
    model: String,
    routes: [&'static str; 4],
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "bad_request" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

pub fn build_app(state: AppState) -> Router {
    let analyze_routes = Router::new()
        .route("/analyze", post(analyze::analyze))
        .route(
            "/analyze/image",
            post(analyze::analyze_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        );

    Router::new()
        .route("/", get(info))
        .route("/health", get(health))
        .merge(analyze_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn info(State(state): State<AppState>) -> impl IntoResponse {
    Json(ServiceInfo {
        message: "Satellite Inspector Tool is running.",
        model: state.inspector.model().to_owned(),
        routes: [
            "GET /",
            "GET /health",
            "POST /analyze",
            "POST /analyze/image",
        ],
    })
}

async fn health() -> impl IntoResponse {
    Json(HealthData { status: "ok" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use satqa_gcp::TokenSource;
    use satqa_vertex::{GeminiClient, VertexSettings};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app_for(server: &MockServer) -> Router {
        let settings = VertexSettings {
            project_id: "sat-project".to_owned(),
            location: "us-central1".to_owned(),
            model: "gemini-2.5-flash".to_owned(),
            endpoint: Some(server.uri()),
            timeout_secs: 10,
        };
        let client = GeminiClient::new(&settings, TokenSource::Static("test-token".to_owned()))
            .expect("gemini client");
        build_app(AppState {
            inspector: Arc::new(SatelliteInspector::new(client)),
        })
    }

    fn verdict() -> Value {
        json!({
            "has_clouds": { "detected": false, "confidence": 0.95, "reason": "Clear sky over the whole scene." },
            "has_snow": { "detected": false, "confidence": 0.9, "reason": "Vegetated lowland, no white cover." },
            "has_color_issues": { "detected": true, "confidence": 0.7, "reason": "Magenta cast in the eastern strip." },
            "has_other_issues": { "detected": false, "confidence": 0.85, "reason": "No voids or seams." }
        })
    }

    async fn mount_model_reply(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    fn model_ok() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": verdict().to_string() }] },
                "finishReason": "STOP"
            }]
        }))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json parse")
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[test]
    fn api_error_bad_request_maps_to_400() {
        let response = ApiError::new("req-1", "bad_request", "gcs_uri is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_other_codes_map_to_500() {
        let response = ApiError::new("req-1", "inspection_failed", "boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn health_returns_ok_with_request_id() {
        let server = MockServer::start().await;
        let response = app_for(&server)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_json(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn info_names_model_and_routes() {
        let server = MockServer::start().await;
        let response = app_for(&server)
            .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Satellite Inspector Tool is running.");
        assert_eq!(json["model"], "gemini-2.5-flash");
        assert!(json["routes"]
            .as_array()
            .expect("routes")
            .contains(&json!("POST /analyze")));
    }

    #[tokio::test]
    async fn analyze_returns_bare_analysis_result() {
        let server = MockServer::start().await;
        mount_model_reply(&server, model_ok()).await;

        let response = app_for(&server)
            .oneshot(post_json(
                "/analyze",
                &json!({ "gcs_uri": "gs://sat-bucket/uploads/scene.jpg" }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json, verdict());
        assert_eq!(json.as_object().map(serde_json::Map::len), Some(4));
    }

    #[tokio::test]
    async fn analyze_empty_uri_is_bad_request_without_model_call() {
        let server = MockServer::start().await;

        let response = app_for(&server)
            .oneshot(post_json("/analyze", &json!({ "gcs_uri": "  " })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "bad_request");
        assert!(json["meta"]["request_id"].is_string());
        assert!(server
            .received_requests()
            .await
            .unwrap_or_default()
            .is_empty());
    }

    #[tokio::test]
    async fn analyze_missing_uri_field_uses_error_envelope() {
        let server = MockServer::start().await;

        let response = app_for(&server)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/analyze")
                    .header("content-type", "application/json")
                    .header("x-request-id", "req-missing-field")
                    .body(Body::from("{}"))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "bad_request");
        assert!(json["error"]["message"]
            .as_str()
            .expect("message")
            .contains("gcs_uri"));
        assert_eq!(json["meta"]["request_id"], "req-missing-field");
        assert!(server
            .received_requests()
            .await
            .unwrap_or_default()
            .is_empty());
    }

    #[tokio::test]
    async fn analyze_non_json_body_uses_error_envelope() {
        let server = MockServer::start().await;

        let response = app_for(&server)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/analyze")
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "bad_request");
        assert!(json["meta"]["request_id"].is_string());
        assert!(json["meta"]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn analyze_model_failure_is_500_with_raw_text() {
        let server = MockServer::start().await;
        mount_model_reply(
            &server,
            ResponseTemplate::new(404).set_body_string("Object gs://sat-bucket/missing.jpg not found"),
        )
        .await;

        let response = app_for(&server)
            .oneshot(post_json(
                "/analyze",
                &json!({ "gcs_uri": "gs://sat-bucket/missing.jpg" }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "inspection_failed");
        let message = json["error"]["message"].as_str().expect("message");
        assert!(message.contains("404"), "{message}");
        assert!(message.contains("missing.jpg not found"), "{message}");
    }

    #[tokio::test]
    async fn analyze_image_sends_inline_bytes_with_declared_type() {
        let server = MockServer::start().await;
        mount_model_reply(&server, model_ok()).await;

        let response = app_for(&server)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/analyze/image")
                    .header("content-type", "image/png")
                    .body(Body::from(&b"fake png"[..]))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, verdict());

        let requests = server.received_requests().await.expect("recorded");
        let sent: Value = serde_json::from_slice(&requests[0].body).expect("json");
        assert_eq!(
            sent["contents"][0]["parts"][1]["inlineData"],
            json!({ "mimeType": "image/png", "data": "ZmFrZSBwbmc=" })
        );
    }

    #[tokio::test]
    async fn analyze_image_empty_body_is_bad_request() {
        let server = MockServer::start().await;

        let response = app_for(&server)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/analyze/image")
                    .header("content-type", "image/jpeg")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "bad_request");
    }
}
