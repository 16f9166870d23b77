//! Client for the Inspection Service's `POST /analyze`.

use std::time::Duration;

use reqwest::{Client, Url};
use satqa_core::AnalysisResult;
use serde_json::json;

use crate::error::FrontendError;

pub struct InspectorClient {
    client: Client,
    analyze_url: Url,
}

impl InspectorClient {
    /// `base_url` is either the service root or its full `/analyze` URL.
    ///
    /// # Errors
    ///
    /// Returns [`FrontendError::InvalidInspectorUrl`] if `base_url` does not
    /// parse, or [`FrontendError::InspectorHttp`] if the client cannot be built.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, FrontendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("satqa/0.1 (upload-frontend)")
            .build()?;
        Ok(Self {
            client,
            analyze_url: analyze_url(base_url)?,
        })
    }

    #[must_use]
    pub fn analyze_url(&self) -> &Url {
        &self.analyze_url
    }

    /// Asks the service to inspect the object at `gcs_uri`.
    ///
    /// # Errors
    ///
    /// - [`FrontendError::InspectorHttp`] on network failure.
    /// - [`FrontendError::InspectorStatus`] on a non-2xx response.
    /// - [`FrontendError::InspectorResponse`] if the body is not an analysis result.
    pub async fn analyze(&self, gcs_uri: &str) -> Result<AnalysisResult, FrontendError> {
        let response = self
            .client
            .post(self.analyze_url.clone())
            .json(&json!({ "gcs_uri": gcs_uri }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FrontendError::InspectorStatus {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(FrontendError::InspectorResponse)
    }
}

fn analyze_url(base_url: &str) -> Result<Url, FrontendError> {
    let trimmed = base_url.trim_end_matches('/');
    let raw = if trimmed.ends_with("/analyze") {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/analyze")
    };
    Url::parse(&raw).map_err(|e| FrontendError::InvalidInspectorUrl {
        url: base_url.to_owned(),
        reason: e.to_string(),
    })
}
