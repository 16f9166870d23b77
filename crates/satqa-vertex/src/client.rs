//! HTTP client for the Vertex AI `generateContent` method.

use std::time::Duration;

use reqwest::{Client, Url};
use satqa_gcp::TokenSource;

use crate::error::VertexError;
use crate::types::{GenerateContentRequest, GenerateContentResponse};

/// Where and which model to call.
#[derive(Debug, Clone)]
pub struct VertexSettings {
    pub project_id: String,
    pub location: String,
    pub model: String,
    /// Overrides the regional endpoint derived from `location`.
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

impl VertexSettings {
    /// Regional API host for `location`; `global` has no region prefix.
    #[must_use]
    pub fn default_endpoint(location: &str) -> String {
        if location == "global" {
            "https://aiplatform.googleapis.com".to_owned()
        } else {
            format!("https://{location}-aiplatform.googleapis.com")
        }
    }

    /// Full `…:generateContent` URL for these settings.
    ///
    /// # Errors
    ///
    /// Returns [`VertexError::InvalidEndpoint`] if the endpoint does not parse.
    pub fn model_url(&self) -> Result<Url, VertexError> {
        let endpoint = self
            .endpoint
            .clone()
            .unwrap_or_else(|| Self::default_endpoint(&self.location));
        let raw = format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            endpoint.trim_end_matches('/'),
            self.project_id,
            self.location,
            self.model
        );
        Url::parse(&raw).map_err(|e| VertexError::InvalidEndpoint {
            url: endpoint,
            reason: e.to_string(),
        })
    }
}

/// Client for one Gemini model on Vertex AI.
pub struct GeminiClient {
    client: Client,
    tokens: TokenSource,
    model_url: Url,
    model: String,
}

impl GeminiClient {
    /// Creates a client for the model described by `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`VertexError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`VertexError::InvalidEndpoint`] if the model URL does not parse.
    pub fn new(settings: &VertexSettings, tokens: TokenSource) -> Result<Self, VertexError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("satqa/0.1 (satellite-inspector)")
            .build()?;
        Ok(Self {
            client,
            tokens,
            model_url: settings.model_url()?,
            model: settings.model.clone(),
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn model_url(&self) -> &Url {
        &self.model_url
    }

    /// Sends one `generateContent` request.
    ///
    /// # Errors
    ///
    /// - [`VertexError::Auth`] if no bearer token can be obtained.
    /// - [`VertexError::Http`] on network failure.
    /// - [`VertexError::UnexpectedStatus`] on a non-2xx response.
    /// - [`VertexError::Deserialize`] if the envelope does not parse.
    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, VertexError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .post(self.model_url.clone())
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(VertexError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| VertexError::Deserialize {
                context: format!("generateContent({})", self.model),
                source: e,
            })?;

        if let Some(usage) = &parsed.usage_metadata {
            tracing::debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_token_count,
                candidate_tokens = usage.candidates_token_count,
                total_tokens = usage.total_token_count,
                "generateContent usage"
            );
        }

        Ok(parsed)
    }
}
