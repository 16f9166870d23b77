use thiserror::Error;

#[derive(Debug, Error)]
pub enum GcpError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}: {body}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("metadata server returned an empty {0}")]
    EmptyMetadata(&'static str),

    #[error("invalid base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl GcpError {
    /// Reads the body of a non-2xx response into an [`GcpError::UnexpectedStatus`].
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        GcpError::UnexpectedStatus { status, url, body }
    }
}
