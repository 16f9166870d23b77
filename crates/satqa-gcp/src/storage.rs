//! Minimal Cloud Storage JSON API client: media upload, public ACL, URL helpers.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{parse_base_url, TokenSource};
use crate::error::GcpError;

const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com";

/// Characters left unescaped in public object URLs (`/` keeps the
/// pseudo-directory structure readable).
const OBJECT_URL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'~')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.');

/// Object resource returned by a successful upload. Only the fields we use.
#[derive(Debug, Deserialize)]
struct ObjectResource {
    name: String,
    bucket: String,
}

/// Where an uploaded object ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub name: String,
    /// `gs://bucket/name`, the form the model reads images from.
    pub gs_uri: String,
    /// Browser-reachable URL, valid once the object is public.
    pub public_url: String,
}

/// Cloud Storage client bound to a single bucket.
pub struct GcsClient {
    client: Client,
    tokens: TokenSource,
    base_url: Url,
    bucket: String,
}

impl GcsClient {
    /// Creates a client for `bucket` on the production Cloud Storage endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`GcpError::Http`] if the underlying `reqwest::Client` cannot be
    /// constructed.
    pub fn new(tokens: TokenSource, bucket: &str, timeout_secs: u64) -> Result<Self, GcpError> {
        Self::with_base_url(tokens, bucket, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (emulators, wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`GcpError::Http`] if the `reqwest::Client` cannot be built or
    /// [`GcpError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        tokens: TokenSource,
        bucket: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, GcpError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("satqa/0.1 (upload-frontend)")
            .build()?;
        Ok(Self {
            client,
            tokens,
            base_url: parse_base_url(base_url)?,
            bucket: bucket.to_owned(),
        })
    }

    /// `gs://` URI of `name` in this bucket.
    #[must_use]
    pub fn gs_uri(&self, name: &str) -> String {
        format!("gs://{}/{name}", self.bucket)
    }

    /// Public HTTP URL of `name` in this bucket.
    #[must_use]
    pub fn public_url(&self, name: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            self.bucket,
            utf8_percent_encode(name, OBJECT_URL_ENCODE_SET)
        )
    }

    /// Uploads `data` as object `name` with the given content type.
    ///
    /// # Errors
    ///
    /// - [`GcpError::Http`] on network failure.
    /// - [`GcpError::UnexpectedStatus`] if Cloud Storage rejects the upload.
    /// - [`GcpError::Deserialize`] if the object resource cannot be parsed.
    pub async fn upload_object(
        &self,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, GcpError> {
        let mut url = self.endpoint(&["upload", "storage", "v1", "b", self.bucket.as_str(), "o"])?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", name);

        let size = data.len();
        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GcpError::from_response(response).await);
        }

        let body = response.text().await?;
        let object: ObjectResource =
            serde_json::from_str(&body).map_err(|e| GcpError::Deserialize {
                context: format!("upload of {name}"),
                source: e,
            })?;

        tracing::info!(
            bucket = %object.bucket,
            object = %object.name,
            size,
            content_type,
            "uploaded object"
        );

        Ok(StoredObject {
            gs_uri: self.gs_uri(&object.name),
            public_url: self.public_url(&object.name),
            bucket: object.bucket,
            name: object.name,
        })
    }

    /// Grants `allUsers` read access to object `name`.
    ///
    /// # Errors
    ///
    /// - [`GcpError::Http`] on network failure.
    /// - [`GcpError::UnexpectedStatus`] if the ACL insert is rejected (for
    ///   example on buckets with uniform bucket-level access).
    pub async fn make_public(&self, name: &str) -> Result<(), GcpError> {
        let url = self.endpoint(&["storage", "v1", "b", self.bucket.as_str(), "o", name, "acl"])?;
        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "entity": "allUsers", "role": "READER" }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GcpError::from_response(response).await);
        }
        tracing::debug!(bucket = %self.bucket, object = name, "object made public");
        Ok(())
    }

    /// Appends `segments` to the base URL, percent-encoding each one
    /// (including any `/` inside object names).
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GcpError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GcpError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "cannot be a base".to_owned(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> GcsClient {
        GcsClient::with_base_url(
            TokenSource::Static("test-token".to_owned()),
            "sat-bucket",
            30,
            base_url,
        )
        .expect("client construction should not fail")
    }

    #[test]
    fn gs_uri_uses_raw_object_name() {
        let client = test_client(DEFAULT_BASE_URL);
        assert_eq!(
            client.gs_uri("uploads/1234-scene 1.jpg"),
            "gs://sat-bucket/uploads/1234-scene 1.jpg"
        );
    }

    #[test]
    fn public_url_encodes_name_but_keeps_slashes() {
        let client = test_client(DEFAULT_BASE_URL);
        assert_eq!(
            client.public_url("uploads/1234-scene 1.jpg"),
            "https://storage.googleapis.com/sat-bucket/uploads/1234-scene%201.jpg"
        );
    }

    #[test]
    fn endpoint_encodes_slashes_inside_object_names() {
        let client = test_client("https://storage.googleapis.com/");
        let url = client
            .endpoint(&["storage", "v1", "b", "sat-bucket", "o", "uploads/a.jpg", "acl"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/sat-bucket/o/uploads%2Fa.jpg/acl"
        );
    }
}
