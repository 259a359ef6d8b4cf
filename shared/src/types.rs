//! Core types used throughout the generation pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// A caller-supplied product photograph.
///
/// The pipeline only ever reads the content and the viewpoint label; it
/// never mutates a source image.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// Human-readable viewpoint label, e.g. "Front View".
    pub label: String,
}

impl SourceImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            label: label.into(),
        }
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("label", &self.label)
            .field("mime_type", &self.mime_type)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// One generated asset: binary image content plus the suggested filename.
#[derive(Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub bytes: Vec<u8>,
    pub filename: String,
}

impl fmt::Debug for ProcessedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessedImage")
            .field("filename", &self.filename)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// Named transformation strategies, each with its own fan-out shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// One independent output per source image, identical instructions.
    PerImage,
    /// Shared context, one output per requested angle label.
    PerAngle,
    /// One output, all source images as joint context.
    SingleComposite,
    /// `SingleComposite`, but the style reference is never attached.
    SingleCompositeNoReference,
}

impl Strategy {
    /// The immutable instruction template this strategy starts from.
    ///
    /// Recognized placeholders: `<BodyType>`, `{{ANGLE}}`, `{{PROMPT}}`.
    /// Callers may hand an edited copy of this text to the pipeline; the
    /// composer appends its constraint clauses after whatever body it gets.
    pub fn default_template(&self) -> &'static str {
        match self {
            Strategy::PerImage => {
                "Transform this product photo into a clean e-commerce studio shot. \
                 Remove the background and place the product on a seamless white \
                 backdrop with soft, even lighting. If the product is a garment, \
                 present it ghost-mannequin style as worn by an invisible <BodyType> \
                 form. {{PROMPT}}"
            }
            Strategy::PerAngle => {
                "Using the tagged reference photos as the single source of truth, \
                 render the product from the {{ANGLE}} on a seamless white studio \
                 backdrop. Garments keep a ghost-mannequin presentation fitted to a \
                 <BodyType> build. The product must stay identical to the references \
                 in every detail."
            }
            Strategy::SingleComposite | Strategy::SingleCompositeNoReference => {
                "Create a lifestyle product photograph: place the product from the \
                 tagged reference photos into a realistic scene. {{PROMPT}}"
            }
        }
    }

    /// Lifestyle/composite strategies compose scene addenda and use the
    /// stricter compositor framing for analysis grounding.
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            Strategy::SingleComposite | Strategy::SingleCompositeNoReference
        )
    }

    /// Whether an available style-reference image may be attached.
    pub fn attaches_style_reference(&self) -> bool {
        !matches!(self, Strategy::SingleCompositeNoReference)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::PerImage => write!(f, "per-image"),
            Strategy::PerAngle => write!(f, "per-angle"),
            Strategy::SingleComposite => write!(f, "composite"),
            Strategy::SingleCompositeNoReference => write!(f, "composite-no-reference"),
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "per-image" | "perimage" => Ok(Strategy::PerImage),
            "per-angle" | "perangle" => Ok(Strategy::PerAngle),
            "composite" | "single-composite" => Ok(Strategy::SingleComposite),
            "composite-no-reference" | "no-reference" => Ok(Strategy::SingleCompositeNoReference),
            _ => Err(format!("Unknown strategy: {s}")),
        }
    }
}

/// Target output resolution, smallest to largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResolutionTier {
    OneK,
    TwoK,
    FourK,
}

impl ResolutionTier {
    /// Wire string expected by the generation service.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionTier::OneK => "1K",
            ResolutionTier::TwoK => "2K",
            ResolutionTier::FourK => "4K",
        }
    }
}

impl std::str::FromStr for ResolutionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1k" => Ok(ResolutionTier::OneK),
            "2k" => Ok(ResolutionTier::TwoK),
            "4k" => Ok(ResolutionTier::FourK),
            _ => Err(format!("Unknown resolution tier: {s}")),
        }
    }
}

/// Caller-selectable aspect-ratio family for composite outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatioFamily {
    Square,
    FourThree,
    SixteenNine,
}

impl AspectRatioFamily {
    /// Resolve the family plus orientation into the literal ratio string
    /// passed to the generation service. Square ignores orientation.
    pub fn resolve(&self, portrait: bool) -> &'static str {
        match (self, portrait) {
            (AspectRatioFamily::Square, _) => "1:1",
            (AspectRatioFamily::FourThree, false) => "4:3",
            (AspectRatioFamily::FourThree, true) => "3:4",
            (AspectRatioFamily::SixteenNine, false) => "16:9",
            (AspectRatioFamily::SixteenNine, true) => "9:16",
        }
    }
}

impl std::str::FromStr for AspectRatioFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1:1" => Ok(AspectRatioFamily::Square),
            "4:3" => Ok(AspectRatioFamily::FourThree),
            "16:9" => Ok(AspectRatioFamily::SixteenNine),
            _ => Err(format!("Unknown aspect ratio family: {s}")),
        }
    }
}

/// Options accompanying one `run` request.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub resolution: ResolutionTier,
    pub aspect_ratio: AspectRatioFamily,
    pub portrait: bool,
    /// Mood/lighting/background cues only; never defines subject geometry.
    pub style_reference: Option<SourceImage>,
    pub body_type: Option<String>,
    pub environment: Option<String>,
    pub scene_prompt: Option<String>,
    /// `None` falls back to the default angle triple for `PerAngle`;
    /// an explicitly empty list is a precondition error.
    pub angles: Option<Vec<String>>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            resolution: ResolutionTier::TwoK,
            aspect_ratio: AspectRatioFamily::Square,
            portrait: false,
            style_reference: None,
            body_type: None,
            environment: None,
            scene_prompt: None,
            angles: None,
        }
    }
}

/// Classified failure of one remote service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiFailure {
    /// Quota exhaustion; retried with backoff.
    RateLimited,
    /// Service overload; retried with backoff.
    Overloaded,
    /// Invalid or expired credential. The caller should re-authenticate.
    AuthFailed(String),
    /// The service answered but produced no usable image.
    NoOutput(String),
    /// The service answered with something we could not parse.
    InvalidResponse(String),
    NetworkError(String),
    ServerError(String),
}

impl ApiFailure {
    /// Transient failures are retried; everything else is terminal.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiFailure::RateLimited | ApiFailure::Overloaded)
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiFailure::RateLimited => write!(f, "rate limit exceeded"),
            ApiFailure::Overloaded => write!(f, "service overloaded"),
            ApiFailure::AuthFailed(detail) => write!(f, "authentication failed: {detail}"),
            ApiFailure::NoOutput(detail) => write!(f, "no output: {detail}"),
            ApiFailure::InvalidResponse(detail) => write!(f, "invalid response: {detail}"),
            ApiFailure::NetworkError(detail) => write!(f, "network error: {detail}"),
            ApiFailure::ServerError(detail) => write!(f, "server error: {detail}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_strategy_roundtrip() {
        for strategy in [
            Strategy::PerImage,
            Strategy::PerAngle,
            Strategy::SingleComposite,
            Strategy::SingleCompositeNoReference,
        ] {
            let parsed = Strategy::from_str(&strategy.to_string()).unwrap();
            assert_eq!(parsed, strategy);
        }
        assert!(Strategy::from_str("mystery").is_err());
    }

    #[test]
    fn test_aspect_ratio_resolution() {
        assert_eq!(AspectRatioFamily::FourThree.resolve(true), "3:4");
        assert_eq!(AspectRatioFamily::FourThree.resolve(false), "4:3");
        assert_eq!(AspectRatioFamily::Square.resolve(true), "1:1");
        assert_eq!(AspectRatioFamily::Square.resolve(false), "1:1");
        assert_eq!(AspectRatioFamily::SixteenNine.resolve(true), "9:16");
        assert_eq!(AspectRatioFamily::SixteenNine.resolve(false), "16:9");
    }

    #[test]
    fn test_resolution_tier_ordering() {
        assert!(ResolutionTier::OneK < ResolutionTier::TwoK);
        assert!(ResolutionTier::TwoK < ResolutionTier::FourK);
        assert_eq!(ResolutionTier::from_str("4K").unwrap(), ResolutionTier::FourK);
    }

    #[test]
    fn test_transient_classification() {
        assert!(ApiFailure::RateLimited.is_transient());
        assert!(ApiFailure::Overloaded.is_transient());
        assert!(!ApiFailure::AuthFailed("expired".into()).is_transient());
        assert!(!ApiFailure::NoOutput("empty".into()).is_transient());
    }

    #[test]
    fn test_style_reference_attachment() {
        assert!(Strategy::SingleComposite.attaches_style_reference());
        assert!(!Strategy::SingleCompositeNoReference.attaches_style_reference());
    }
}
