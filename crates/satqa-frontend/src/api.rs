use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::Html,
    routing::{get, post},
    Extension, Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::error::FrontendError;
use crate::middleware::{request_id, RequestId};
use crate::render::render_page;
use crate::upload::{IncomingFile, UploadPipeline};

/// Form field carrying the images.
const FILES_FIELD: &str = "files";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<UploadPipeline>,
}

pub fn build_app(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(request_id))
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(state)
}

async fn index() -> Html<String> {
    Html(render_page(&[]))
}

async fn upload(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    mut multipart: Multipart,
) -> Result<Html<String>, FrontendError> {
    let files = read_files(&mut multipart).await?;
    if files.is_empty() {
        return Err(FrontendError::NoFiles);
    }

    tracing::info!(request_id = %req_id.0, files = files.len(), "processing upload");
    let records = state.pipeline.process(files).await?;
    tracing::info!(
        request_id = %req_id.0,
        objects = ?records.iter().map(|r| r.object_key.as_str()).collect::<Vec<_>>(),
        "upload complete"
    );

    Ok(Html(render_page(&records)))
}

/// Collects the `files` fields in submission order, skipping empty selections.
async fn read_files(multipart: &mut Multipart) -> Result<Vec<IncomingFile>, FrontendError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        let Some(filename) = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
        else {
            continue;
        };
        let content_type = field.content_type().map(str::to_owned);
        let data = field.bytes().await?;
        files.push(IncomingFile {
            filename,
            content_type,
            data: data.to_vec(),
        });
    }
    Ok(files)
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
