//! Pipeline-internal data types

use serde::Deserialize;
use shared::ResolutionTier;
use std::fmt;

/// One ordered segment of a remote request body.
#[derive(Clone, PartialEq, Eq)]
pub enum RequestPart {
    Text(String),
    Image { mime_type: String, data: Vec<u8> },
}

impl fmt::Debug for RequestPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestPart::Text(text) => f.debug_tuple("Text").field(text).finish(),
            RequestPart::Image { mime_type, data } => f
                .debug_struct("Image")
                .field("mime_type", mime_type)
                .field("data", &format_args!("<{} bytes>", data.len()))
                .finish(),
        }
    }
}

/// Best-effort product description extracted by the analysis pass.
///
/// Absence must never block generation: any analysis failure collapses to
/// `AnalysisResult::default()` and the batch continues.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub description: String,
    #[serde(rename = "filename", default = "AnalysisResult::generic_stem")]
    pub filename_stem: String,
}

impl AnalysisResult {
    fn generic_stem() -> String {
        "processed-product".to_string()
    }
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self {
            description: String::new(),
            filename_stem: Self::generic_stem(),
        }
    }
}

/// Payload for one generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub parts: Vec<RequestPart>,
    pub resolution: ResolutionTier,
    /// `None` leaves the source frame untouched (used by upscaling).
    pub aspect_ratio: Option<String>,
}

/// One planned remote generation call. Constructed per unit of work and
/// discarded once the call completes.
#[derive(Debug, Clone)]
pub struct GenerationUnit {
    pub parts: Vec<RequestPart>,
    pub resolution: ResolutionTier,
    pub aspect_ratio: Option<String>,
    /// Output filename decided at planning time so results can be zipped
    /// back in unit order.
    pub filename: String,
}

impl GenerationUnit {
    pub fn request(&self) -> GenerationRequest {
        GenerationRequest {
            parts: self.parts.clone(),
            resolution: self.resolution,
            aspect_ratio: self.aspect_ratio.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_result_default() {
        let fallback = AnalysisResult::default();
        assert_eq!(fallback.description, "");
        assert_eq!(fallback.filename_stem, "processed-product");
    }

    #[test]
    fn test_analysis_result_deserialization() {
        let parsed: AnalysisResult =
            serde_json::from_str(r#"{"description": "blue denim jacket", "filename": "denim-jacket"}"#)
                .unwrap();
        assert_eq!(parsed.description, "blue denim jacket");
        assert_eq!(parsed.filename_stem, "denim-jacket");

        // Missing fields fall back rather than failing the parse.
        let partial: AnalysisResult = serde_json::from_str(r#"{"description": "x"}"#).unwrap();
        assert_eq!(partial.filename_stem, "processed-product");
    }
}
