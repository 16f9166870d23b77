use std::path::Path;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use satqa_core::{
    analysis_response_schema, AnalysisResult, InspectorConfig, DEFAULT_IMAGE_MIME_TYPE,
};
use satqa_gcp::{MetadataClient, TokenSource};

use crate::client::{GeminiClient, VertexSettings};
use crate::error::VertexError;
use crate::types::{
    Blob, Content, FileData, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    Part, SafetySetting,
};

/// Remote-sensing instruction sent verbatim ahead of every image.
pub const SYSTEM_INSTRUCTION: &str = "\
You are an expert Remote Sensing Analyst AI.
Your job is to analyze satellite imagery (optical/RGB) and detect quality issues.

Definitions for your analysis:
1. CLOUDS: Look for white, puffy, opaque textures that obscure the ground. Distinguish from smoke or haze if possible.
2. SNOW: Look for white, smooth textures on terrain, specifically on mountain peaks or covering large flat areas. Distinguish from clouds by looking for ground features (valleys, rivers) cut into the white.
3. COLOR ISSUES: Look for unnatural color casts (e.g., whole image is purple/green), oversaturation, banding (colored stripes), or severe atmospheric haze that washes out color.
4. OTHER ISSUES: Look for missing data (black pixels/voids), severe blurriness, stitching artifacts, or digital noise.

Provide a confidence score (0.0 to 1.0) and specific visual reasoning for every assessment.";

/// Prompt sent after the image.
pub const ANALYSIS_PROMPT: &str = "Analyze this satellite image for issues.";

/// The image to inspect: a URI the model fetches, or inline bytes.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Uri { uri: String, mime_type: String },
    Bytes { data: Vec<u8>, mime_type: String },
}

impl ImageSource {
    #[must_use]
    pub fn uri(uri: impl Into<String>, mime_type: Option<&str>) -> Self {
        ImageSource::Uri {
            uri: uri.into(),
            mime_type: mime_type.unwrap_or(DEFAULT_IMAGE_MIME_TYPE).to_owned(),
        }
    }

    #[must_use]
    pub fn bytes(data: Vec<u8>, mime_type: Option<&str>) -> Self {
        ImageSource::Bytes {
            data,
            mime_type: mime_type.unwrap_or(DEFAULT_IMAGE_MIME_TYPE).to_owned(),
        }
    }

    /// Short description for log lines; never includes the image bytes.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Uri { uri, mime_type } => format!("{uri} ({mime_type})"),
            ImageSource::Bytes { data, mime_type } => {
                format!("{} inline bytes ({mime_type})", data.len())
            }
        }
    }

    fn into_part(self) -> Part {
        match self {
            ImageSource::Uri { uri, mime_type } => Part::FileData(FileData {
                mime_type,
                file_uri: uri,
            }),
            ImageSource::Bytes { data, mime_type } => Part::InlineData(Blob {
                mime_type,
                data: STANDARD.encode(data),
            }),
        }
    }
}

/// MIME type for a local image, from its extension. Unknown extensions fall
/// back to JPEG.
#[must_use]
pub fn mime_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("tif" | "tiff") => "image/tiff",
        Some("heic") => "image/heic",
        _ => DEFAULT_IMAGE_MIME_TYPE,
    }
}

/// Asks the model for a four-category quality verdict on one image.
pub struct SatelliteInspector {
    client: GeminiClient,
}

impl SatelliteInspector {
    #[must_use]
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    /// Builds an inspector from service configuration. Without a configured
    /// project ID or access token, the instance metadata server supplies them.
    ///
    /// # Errors
    ///
    /// See [`SatelliteInspector::from_config_with_metadata`].
    pub async fn from_config(config: &InspectorConfig) -> Result<Self, VertexError> {
        let metadata_http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Self::from_config_with_metadata(config, MetadataClient::new(metadata_http)?).await
    }

    /// Like [`SatelliteInspector::from_config`], with an explicit metadata
    /// server client (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`VertexError::Auth`] if the project ID lookup fails, plus
    /// anything [`GeminiClient::new`] can return.
    pub async fn from_config_with_metadata(
        config: &InspectorConfig,
        metadata: MetadataClient,
    ) -> Result<Self, VertexError> {
        let project_id = match &config.project_id {
            Some(project) => project.clone(),
            None => {
                let project = metadata.project_id().await?;
                tracing::info!(project = %project, "project ID taken from metadata server");
                project
            }
        };

        let tokens = match &config.access_token {
            Some(token) => TokenSource::Static(token.clone()),
            None => TokenSource::Metadata(metadata),
        };

        let settings = VertexSettings {
            project_id,
            location: config.vertex_location.clone(),
            model: config.vertex_model.clone(),
            endpoint: config.vertex_endpoint.clone(),
            timeout_secs: config.http_timeout_secs,
        };
        let client = GeminiClient::new(&settings, tokens)?;
        tracing::debug!(url = %client.model_url(), "vertex model endpoint");
        Ok(Self::new(client))
    }

    #[must_use]
    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Builds the request: instruction, image, prompt, JSON schema, safety setting.
    #[must_use]
    pub fn build_request(source: ImageSource) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_owned(),
                parts: vec![
                    Part::Text(SYSTEM_INSTRUCTION.to_owned()),
                    source.into_part(),
                    Part::Text(ANALYSIS_PROMPT.to_owned()),
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_owned(),
                response_schema: analysis_response_schema(),
            },
            safety_settings: vec![SafetySetting {
                category: "HARM_CATEGORY_DANGEROUS_CONTENT".to_owned(),
                threshold: "BLOCK_ONLY_HIGH".to_owned(),
            }],
        }
    }

    /// Runs one inspection.
    ///
    /// # Errors
    ///
    /// Any transport, provider, parse or range-check failure; see [`VertexError`].
    pub async fn analyze(&self, source: ImageSource) -> Result<AnalysisResult, VertexError> {
        let description = source.describe();
        tracing::info!(image = %description, model = %self.client.model(), "analyzing image");

        let request = Self::build_request(source);
        let response = self.client.generate_content(&request).await?;
        let verdict = parse_verdict(&response)?;

        tracing::info!(
            image = %description,
            detected = ?verdict.detected(),
            "analysis complete"
        );
        Ok(verdict)
    }

    /// Inspects an image the model reads directly, e.g. `gs://bucket/image.jpg`.
    ///
    /// # Errors
    ///
    /// See [`SatelliteInspector::analyze`].
    pub async fn analyze_from_uri(
        &self,
        uri: &str,
        mime_type: Option<&str>,
    ) -> Result<AnalysisResult, VertexError> {
        self.analyze(ImageSource::uri(uri, mime_type)).await
    }

    /// Inspects image bytes sent inline with the request.
    ///
    /// # Errors
    ///
    /// See [`SatelliteInspector::analyze`].
    pub async fn analyze_bytes(
        &self,
        data: Vec<u8>,
        mime_type: Option<&str>,
    ) -> Result<AnalysisResult, VertexError> {
        self.analyze(ImageSource::bytes(data, mime_type)).await
    }

    /// Reads a local image and inspects it inline. Without `mime_type` the
    /// type is guessed from the extension.
    ///
    /// # Errors
    ///
    /// Returns [`VertexError::ImageNotFound`] if `path` does not exist, plus
    /// everything [`SatelliteInspector::analyze`] can return.
    pub async fn analyze_file(
        &self,
        path: &Path,
        mime_type: Option<&str>,
    ) -> Result<AnalysisResult, VertexError> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VertexError::ImageNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(VertexError::Io(e)),
        };
        let mime_type = mime_type.unwrap_or_else(|| mime_type_for_path(path));
        self.analyze_bytes(data, Some(mime_type)).await
    }
}

/// Extracts and validates the verdict from a model response.
///
/// # Errors
///
/// - [`VertexError::Blocked`] if the prompt was blocked.
/// - [`VertexError::EmptyResponse`] if the first candidate carries no text.
/// - [`VertexError::MalformedVerdict`] if the text is not an analysis result.
/// - [`VertexError::Verdict`] if a confidence is out of range.
pub fn parse_verdict(response: &GenerateContentResponse) -> Result<AnalysisResult, VertexError> {
    if response.candidates.is_empty() {
        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            return Err(VertexError::Blocked(reason));
        }
    }

    let text = response
        .first_candidate_text()
        .ok_or_else(|| VertexError::EmptyResponse {
            finish_reason: response
                .candidates
                .first()
                .and_then(|c| c.finish_reason.clone()),
        })?;

    let verdict: AnalysisResult =
        serde_json::from_str(text.trim()).map_err(VertexError::MalformedVerdict)?;
    verdict.validate()?;
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn verdict_json() -> serde_json::Value {
        json!({
            "has_clouds": { "detected": false, "confidence": 0.97, "reason": "Ground fully visible." },
            "has_snow": { "detected": true, "confidence": 0.81, "reason": "Snow on ridgelines with valleys cut through." },
            "has_color_issues": { "detected": false, "confidence": 0.9, "reason": "Natural colour balance." },
            "has_other_issues": { "detected": false, "confidence": 0.85, "reason": "No voids or stitching seams." }
        })
    }

    fn response_with_text(text: &str) -> GenerateContentResponse {
        serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap()
    }

    #[test]
    fn uri_request_has_instruction_image_prompt_in_order() {
        let request = SatelliteInspector::build_request(ImageSource::uri(
            "gs://sat-bucket/uploads/a.jpg",
            None,
        ));
        let value = serde_json::to_value(&request).unwrap();
        let parts = value["contents"][0]["parts"].as_array().unwrap();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["text"], SYSTEM_INSTRUCTION);
        assert_eq!(
            parts[1]["fileData"],
            json!({ "mimeType": "image/jpeg", "fileUri": "gs://sat-bucket/uploads/a.jpg" })
        );
        assert_eq!(parts[2]["text"], ANALYSIS_PROMPT);
        assert_eq!(value["contents"][0]["role"], "user");
    }

    #[test]
    fn request_forces_json_schema_and_safety_threshold() {
        let request = SatelliteInspector::build_request(ImageSource::bytes(vec![0, 1, 2], None));
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            value["generationConfig"]["responseSchema"],
            analysis_response_schema()
        );
        assert_eq!(
            value["safetySettings"],
            json!([{ "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_ONLY_HIGH" }])
        );
    }

    #[test]
    fn bytes_source_is_base64_inline_data() {
        let request =
            SatelliteInspector::build_request(ImageSource::bytes(b"img".to_vec(), Some("image/png")));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value["contents"][0]["parts"][1]["inlineData"],
            json!({ "mimeType": "image/png", "data": "aW1n" })
        );
    }

    #[test]
    fn instruction_defines_all_four_categories() {
        for term in ["CLOUDS", "SNOW", "COLOR ISSUES", "OTHER ISSUES"] {
            assert!(SYSTEM_INSTRUCTION.contains(term), "missing {term}");
        }
    }

    #[test]
    fn parse_verdict_accepts_schema_conforming_text() {
        let response = response_with_text(&verdict_json().to_string());
        let verdict = parse_verdict(&response).unwrap();
        assert!(verdict.has_snow.detected);
        assert_eq!(serde_json::to_value(&verdict).unwrap(), verdict_json());
    }

    #[test]
    fn parse_verdict_rejects_partial_result() {
        let mut partial = verdict_json();
        partial.as_object_mut().unwrap().remove("has_other_issues");
        let response = response_with_text(&partial.to_string());
        assert!(matches!(
            parse_verdict(&response),
            Err(VertexError::MalformedVerdict(_))
        ));
    }

    #[test]
    fn parse_verdict_rejects_out_of_range_confidence() {
        let mut value = verdict_json();
        value["has_clouds"]["confidence"] = json!(97);
        let response = response_with_text(&value.to_string());
        assert!(matches!(
            parse_verdict(&response),
            Err(VertexError::Verdict(_))
        ));
    }

    #[test]
    fn parse_verdict_reports_block_reason() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "PROHIBITED_CONTENT" }
        }))
        .unwrap();
        let err = parse_verdict(&response).unwrap_err();
        assert!(matches!(err, VertexError::Blocked(ref r) if r == "PROHIBITED_CONTENT"));
    }

    #[test]
    fn parse_verdict_reports_finish_reason_when_empty() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        let err = parse_verdict(&response).unwrap_err();
        assert_eq!(err.to_string(), "model returned no text (finish reason: SAFETY)");
    }

    #[test]
    fn mime_type_follows_extension() {
        assert_eq!(mime_type_for_path(Path::new("scene.PNG")), "image/png");
        assert_eq!(mime_type_for_path(Path::new("scene.tif")), "image/tiff");
        assert_eq!(mime_type_for_path(Path::new("scene.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for_path(Path::new("scene")), "image/jpeg");
    }
}
