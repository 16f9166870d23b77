//! Bearer tokens for Google APIs.
//!
//! On Cloud Run and GCE the instance metadata server hands out short-lived
//! tokens for the attached service account. Tokens are fetched per call and
//! never cached.

use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::GcpError;

const DEFAULT_METADATA_URL: &str = "http://metadata.google.internal/computeMetadata/v1/";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client for the instance metadata server.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    client: Client,
    base_url: Url,
}

impl MetadataClient {
    /// Creates a client pointed at `metadata.google.internal`.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in URL; the `Result` mirrors
    /// [`MetadataClient::with_base_url`].
    pub fn new(client: Client) -> Result<Self, GcpError> {
        Self::with_base_url(client, DEFAULT_METADATA_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`GcpError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(client: Client, base_url: &str) -> Result<Self, GcpError> {
        let base_url = parse_base_url(base_url)?;
        Ok(Self { client, base_url })
    }

    /// Fetches an access token for the default service account.
    ///
    /// # Errors
    ///
    /// - [`GcpError::Http`] on network failure.
    /// - [`GcpError::UnexpectedStatus`] on a non-2xx response.
    /// - [`GcpError::Deserialize`] if the body is not a token response.
    /// - [`GcpError::EmptyMetadata`] if the token is empty.
    pub async fn access_token(&self) -> Result<String, GcpError> {
        let body = self.get_text("instance/service-accounts/default/token").await?;
        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| GcpError::Deserialize {
                context: "metadata token".to_owned(),
                source: e,
            })?;
        if token.access_token.is_empty() {
            return Err(GcpError::EmptyMetadata("access token"));
        }
        Ok(token.access_token)
    }

    /// Fetches the project ID of the project the instance runs in.
    ///
    /// # Errors
    ///
    /// - [`GcpError::Http`] on network failure.
    /// - [`GcpError::UnexpectedStatus`] on a non-2xx response.
    /// - [`GcpError::EmptyMetadata`] if the project ID is empty.
    pub async fn project_id(&self) -> Result<String, GcpError> {
        let body = self.get_text("project/project-id").await?;
        let project = body.trim();
        if project.is_empty() {
            return Err(GcpError::EmptyMetadata("project ID"));
        }
        Ok(project.to_owned())
    }

    async fn get_text(&self, path: &str) -> Result<String, GcpError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| GcpError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        let response = self
            .client
            .get(url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GcpError::from_response(response).await);
        }
        Ok(response.text().await?)
    }
}

/// Where bearer tokens for Google APIs come from.
#[derive(Clone)]
pub enum TokenSource {
    /// A token supplied through configuration, used as-is.
    Static(String),
    /// Fetched from the metadata server on every call.
    Metadata(MetadataClient),
}

impl TokenSource {
    /// Uses `access_token` when configured, otherwise the metadata server.
    ///
    /// # Errors
    ///
    /// Propagates [`MetadataClient::new`] failures.
    pub fn from_config(access_token: Option<&str>, client: &Client) -> Result<Self, GcpError> {
        match access_token {
            Some(token) => Ok(TokenSource::Static(token.to_owned())),
            None => Ok(TokenSource::Metadata(MetadataClient::new(client.clone())?)),
        }
    }

    /// Returns a bearer token for the next request.
    ///
    /// # Errors
    ///
    /// Propagates metadata-server failures; a static token never fails.
    pub async fn access_token(&self) -> Result<String, GcpError> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Metadata(metadata) => metadata.access_token().await,
        }
    }
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSource::Static(_) => f.write_str("TokenSource::Static([redacted])"),
            TokenSource::Metadata(m) => write!(f, "TokenSource::Metadata({})", m.base_url),
        }
    }
}

/// Parses `raw` and ensures it ends with exactly one slash so that
/// [`Url::join`] appends rather than replacing the last segment.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, GcpError> {
    let normalised = format!("{}/", raw.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| GcpError::InvalidBaseUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_base_url_adds_trailing_slash() {
        let url = parse_base_url("http://localhost:9000/computeMetadata/v1").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/computeMetadata/v1/");
        let joined = url.join("project/project-id").unwrap();
        assert_eq!(
            joined.as_str(),
            "http://localhost:9000/computeMetadata/v1/project/project-id"
        );
    }

    #[test]
    fn parse_base_url_rejects_garbage() {
        assert!(matches!(
            parse_base_url("not a url"),
            Err(GcpError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn debug_redacts_static_token() {
        let source = TokenSource::Static("ya29.secret".to_owned());
        assert!(!format!("{source:?}").contains("ya29.secret"));
    }

    #[tokio::test]
    async fn static_token_is_returned_verbatim() {
        let source = TokenSource::from_config(Some("ya29.abc"), &Client::new()).unwrap();
        assert_eq!(source.access_token().await.unwrap(), "ya29.abc");
    }
}
