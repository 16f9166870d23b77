//! Upload pipeline: store each file, make it public, then ask for a verdict.

use satqa_core::AnalysisResult;
use satqa_gcp::GcsClient;
use uuid::Uuid;

use crate::error::FrontendError;
use crate::inspector_client::InspectorClient;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// One file taken from the multipart form.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// A stored and inspected file, kept only for rendering the response.
#[derive(Debug, Clone)]
pub struct UploadRecord {
    pub object_key: String,
    pub filename: String,
    pub public_url: String,
    pub gs_uri: String,
    pub analysis: AnalysisResult,
}

/// `{prefix}/{uuid}-{basename}`. Directory parts of the client-supplied name
/// are dropped so uploads cannot escape the prefix.
#[must_use]
pub fn object_key(prefix: &str, filename: &str) -> String {
    let basename = filename
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("upload");
    let id = Uuid::new_v4();
    if prefix.is_empty() {
        format!("{id}-{basename}")
    } else {
        format!("{prefix}/{id}-{basename}")
    }
}

pub struct UploadPipeline {
    storage: GcsClient,
    inspector: InspectorClient,
    prefix: String,
}

impl UploadPipeline {
    #[must_use]
    pub fn new(storage: GcsClient, inspector: InspectorClient, prefix: &str) -> Self {
        Self {
            storage,
            inspector,
            prefix: prefix.to_owned(),
        }
    }

    /// Processes `files` one after another, in order.
    ///
    /// # Errors
    ///
    /// The first storage or inspection failure aborts the whole batch.
    pub async fn process(&self, files: Vec<IncomingFile>) -> Result<Vec<UploadRecord>, FrontendError> {
        let mut records = Vec::with_capacity(files.len());
        for file in files {
            records.push(self.process_one(file).await?);
        }
        Ok(records)
    }

    async fn process_one(&self, file: IncomingFile) -> Result<UploadRecord, FrontendError> {
        let key = object_key(&self.prefix, &file.filename);
        let content_type = file
            .content_type
            .as_deref()
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        let stored = self
            .storage
            .upload_object(&key, file.data, content_type)
            .await?;
        self.storage.make_public(&stored.name).await?;

        let analysis = self.inspector.analyze(&stored.gs_uri).await?;
        tracing::info!(
            object = %stored.name,
            filename = %file.filename,
            detected = ?analysis.detected(),
            "file inspected"
        );

        Ok(UploadRecord {
            object_key: stored.name,
            filename: file.filename,
            public_url: stored.public_url,
            gs_uri: stored.gs_uri,
            analysis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_has_prefix_uuid_and_name() {
        let key = object_key("uploads", "scene.jpg");
        let rest = key.strip_prefix("uploads/").expect("prefix");
        let (id, name) = rest.split_at(36);
        assert!(Uuid::parse_str(id).is_ok(), "not a uuid: {id}");
        assert_eq!(name, "-scene.jpg");
    }

    #[test]
    fn object_key_drops_client_directories() {
        assert!(object_key("uploads", "../../etc/passwd").ends_with("-passwd"));
        assert!(object_key("uploads", r"C:\images\tile 7.png").ends_with("-tile 7.png"));
    }

    #[test]
    fn object_key_is_unique_per_call() {
        assert_ne!(object_key("uploads", "a.jpg"), object_key("uploads", "a.jpg"));
    }

    #[test]
    fn object_key_without_prefix_has_no_leading_slash() {
        let key = object_key("", "a.jpg");
        assert!(!key.starts_with('/'));
        assert!(key.ends_with("-a.jpg"));
    }
}
