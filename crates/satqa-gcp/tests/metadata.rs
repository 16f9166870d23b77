//! Integration tests for `MetadataClient` and metadata-backed `TokenSource`.

use satqa_gcp::{GcpError, MetadataClient, TokenSource};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn metadata_client(server: &MockServer) -> MetadataClient {
    MetadataClient::with_base_url(
        reqwest::Client::new(),
        &format!("{}/computeMetadata/v1", server.uri()),
    )
    .expect("metadata client")
}

#[tokio::test]
async fn access_token_sends_metadata_flavor_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(
            "/computeMetadata/v1/instance/service-accounts/default/token",
        ))
        .and(header("Metadata-Flavor", "Google"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.from-metadata",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let tokens = TokenSource::Metadata(metadata_client(&server));
    assert_eq!(tokens.access_token().await.unwrap(), "ya29.from-metadata");
    // Not cached: a second call asks the server again.
    assert_eq!(tokens.access_token().await.unwrap(), "ya29.from-metadata");
}

#[tokio::test]
async fn project_id_is_trimmed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/computeMetadata/v1/project/project-id"))
        .and(header("Metadata-Flavor", "Google"))
        .respond_with(ResponseTemplate::new(200).set_body_string("sat-project\n"))
        .mount(&server)
        .await;

    let project = metadata_client(&server).project_id().await.unwrap();
    assert_eq!(project, "sat-project");
}

#[tokio::test]
async fn empty_project_id_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/computeMetadata/v1/project/project-id"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let err = metadata_client(&server).project_id().await.unwrap_err();
    assert!(matches!(err, GcpError::EmptyMetadata(_)), "got: {err:?}");
}

#[tokio::test]
async fn metadata_error_status_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(
            "/computeMetadata/v1/instance/service-accounts/default/token",
        ))
        .respond_with(ResponseTemplate::new(404).set_body_string("no service account"))
        .mount(&server)
        .await;

    let err = metadata_client(&server).access_token().await.unwrap_err();
    assert!(
        matches!(err, GcpError::UnexpectedStatus { status: 404, .. }),
        "got: {err:?}"
    );
}
