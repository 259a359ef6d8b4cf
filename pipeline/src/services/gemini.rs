//! Gemini REST client: analysis and generation adapters
//!
//! Both adapters speak `models/<id>:generateContent` on the Generative
//! Language API: an ordered list of text/inline-image parts goes in, zero or
//! one candidates with text and/or inline-image parts comes out. Failures
//! are classified here; retrying them is the pipeline's job.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::traits::ModelClient;
use crate::types::{AnalysisResult, GenerationRequest, RequestPart};
use shared::{ApiFailure, SourceImage};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const ANALYSIS_MODEL: &str = "gemini-2.5-flash";
const IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Longest diagnostic prefix embedded in classified failures.
const PREVIEW_LIMIT: usize = 160;

const ANALYSIS_INSTRUCTION: &str = "Describe the product in this photo for an \
    image-generation brief. Reply with a strict JSON object only, no prose and no \
    code fences: {\"description\": \"one dense sentence covering product type, \
    colors, materials, printed text and logos\", \"filename\": \
    \"short-kebab-case-filename-stem\"}";

/// Thin client over the Gemini REST surface.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
}

impl GeminiClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Override the API base URL (used by tests against a local server).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    async fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        body: Value,
    ) -> Result<GenerateContentResponse, ApiFailure> {
        let response = self
            .http
            .post(self.endpoint(model))
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiFailure::NetworkError(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiFailure::NetworkError(e.to_string()))?;
        if !status.is_success() {
            return Err(classify_http_failure(status.as_u16(), &text));
        }

        serde_json::from_str(&text)
            .map_err(|e| ApiFailure::InvalidResponse(format!("malformed service response: {e}")))
    }
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn analyze(
        &self,
        api_key: &str,
        image: SourceImage,
    ) -> Result<AnalysisResult, ApiFailure> {
        tracing::debug!("analyzing source image '{}'", image.label);
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    inline_image_json(&image.mime_type, &image.bytes),
                    { "text": ANALYSIS_INSTRUCTION },
                ],
            }],
            "generationConfig": { "responseMimeType": "application/json" },
        });

        let response = self.generate_content(api_key, ANALYSIS_MODEL, body).await?;
        let reply = collect_text(&response);
        if reply.trim().is_empty() {
            return Err(ApiFailure::InvalidResponse(
                "analysis returned no text".to_string(),
            ));
        }
        parse_analysis_reply(&reply)
    }

    async fn generate(
        &self,
        api_key: &str,
        request: GenerationRequest,
    ) -> Result<Vec<u8>, ApiFailure> {
        let mut generation_config = json!({
            "responseModalities": ["IMAGE", "TEXT"],
            "imageConfig": { "imageSize": request.resolution.as_str() },
        });
        if let Some(ratio) = &request.aspect_ratio {
            generation_config["imageConfig"]["aspectRatio"] = json!(ratio);
        }

        let parts: Vec<Value> = request.parts.iter().map(part_json).collect();
        let body = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": generation_config,
            "safetySettings": safety_settings(),
        });

        tracing::debug!(
            "requesting generation ({} parts, {} / {:?})",
            request.parts.len(),
            request.resolution.as_str(),
            request.aspect_ratio,
        );
        let response = self.generate_content(api_key, IMAGE_MODEL, body).await?;
        extract_image(response)
    }
}

fn part_json(part: &RequestPart) -> Value {
    match part {
        RequestPart::Text(text) => json!({ "text": text }),
        RequestPart::Image { mime_type, data } => inline_image_json(mime_type, data),
    }
}

fn inline_image_json(mime_type: &str, data: &[u8]) -> Value {
    json!({
        "inlineData": {
            "mimeType": mime_type,
            "data": BASE64.encode(data),
        }
    })
}

fn safety_settings() -> Value {
    json!([
        { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_NONE" },
        { "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_NONE" },
        { "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_NONE" },
        { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_NONE" },
    ])
}

fn classify_http_failure(status: u16, body: &str) -> ApiFailure {
    match status {
        429 => ApiFailure::RateLimited,
        503 => ApiFailure::Overloaded,
        401 | 403 => ApiFailure::AuthFailed(truncate_text(body, PREVIEW_LIMIT)),
        _ => {
            // Some deployments tunnel the real condition through the body.
            if body.contains("RESOURCE_EXHAUSTED") || body.contains("quota") {
                ApiFailure::RateLimited
            } else if body.contains("UNAVAILABLE") || body.contains("overloaded") {
                ApiFailure::Overloaded
            } else if body.contains("API key") || body.contains("not found") {
                ApiFailure::AuthFailed(truncate_text(body, PREVIEW_LIMIT))
            } else {
                ApiFailure::ServerError(format!(
                    "HTTP {status}: {}",
                    truncate_text(body, PREVIEW_LIMIT)
                ))
            }
        }
    }
}

fn truncate_text(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let prefix: String = text.chars().take(limit).collect();
        format!("{prefix}…")
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(rename = "inlineData", alias = "inline_data")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: Option<String>,
}

fn collect_text(response: &GenerateContentResponse) -> String {
    let mut out = String::new();
    for candidate in response.candidates.iter().flatten() {
        for part in candidate
            .content
            .iter()
            .flat_map(|content| content.parts.iter().flatten())
        {
            if let Some(text) = &part.text {
                out.push_str(text);
            }
        }
    }
    out
}

/// Pull the first inline image out of the response, or classify why there
/// is none. A text-only reply keeps a prefix of the text as a diagnostic:
/// it usually means the prompt was rejected or answered conversationally.
fn extract_image(response: GenerateContentResponse) -> Result<Vec<u8>, ApiFailure> {
    let candidates = response.candidates.unwrap_or_default();
    if candidates.is_empty() {
        return Err(ApiFailure::NoOutput("no candidates returned".to_string()));
    }

    let parts = candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .unwrap_or_default();

    let mut text_reply = String::new();
    for part in &parts {
        if let Some(data) = part
            .inline_data
            .as_ref()
            .and_then(|inline| inline.data.as_deref())
        {
            if !data.is_empty() {
                return BASE64.decode(data).map_err(|e| {
                    ApiFailure::InvalidResponse(format!("image payload decode failed: {e}"))
                });
            }
        }
        if let Some(text) = &part.text {
            text_reply.push_str(text);
        }
    }

    if !text_reply.trim().is_empty() {
        Err(ApiFailure::NoOutput(format!(
            "model replied with text instead of an image: {}",
            truncate_text(text_reply.trim(), PREVIEW_LIMIT)
        )))
    } else {
        Err(ApiFailure::NoOutput("no image generated".to_string()))
    }
}

fn parse_analysis_reply(reply: &str) -> Result<AnalysisResult, ApiFailure> {
    let trimmed = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    serde_json::from_str(trimmed)
        .map_err(|e| ApiFailure::InvalidResponse(format!("analysis reply was not valid JSON: {e}")))
}
