//! Batch planning: strategy dispatch reduced to unit construction
//!
//! Each strategy plans its fan-out as a list of `GenerationUnit`s; the
//! pipeline then runs every unit concurrently and zips results back in
//! planning order. Planning is pure: analysis grounding is computed before
//! this module runs and passed in by value.

use crate::core::compose::{compose, UnitContext};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{AnalysisResult, GenerationUnit, RequestPart};
use shared::{GenerationOptions, SourceImage, Strategy};

/// Fixed aspect override for per-image and per-angle product shots.
pub const PRODUCT_ASPECT_RATIO: &str = "3:4";

/// Fallback angle selection when the caller supplies none.
pub const DEFAULT_ANGLES: [&str; 3] = ["Front View", "Side View", "Back View"];

const STYLE_REFERENCE_FRAMING: &str = "The first image is a style reference: match its \
    mood, lighting, and background treatment only. It does not define the product; \
    never copy objects from it.";

/// Analysis grounding for one batch.
///
/// Per-image batches ground every unit in its own image's analysis; every
/// other shape shares the primary image's analysis across all units, which
/// keeps independently generated variants consistent in product identity.
#[derive(Debug, Clone)]
pub enum BatchGrounding {
    PerImage(Vec<AnalysisResult>),
    Shared(AnalysisResult),
}

/// Preconditions checked before any remote call is attempted.
pub fn validate_request(
    strategy: Strategy,
    images: &[SourceImage],
    options: &GenerationOptions,
    api_key: &str,
) -> PipelineResult<()> {
    if api_key.trim().is_empty() {
        return Err(PipelineError::precondition("access credential is missing"));
    }
    if images.is_empty() {
        return Err(PipelineError::precondition(
            "at least one source image is required",
        ));
    }
    if strategy == Strategy::PerAngle {
        if let Some(angles) = &options.angles {
            if angles.is_empty() {
                return Err(PipelineError::precondition(
                    "angle selection must contain at least one angle",
                ));
            }
        }
    }
    Ok(())
}

/// Index of the designated primary image: the first one labeled
/// "Front View", else the first image.
pub fn primary_index(images: &[SourceImage]) -> usize {
    images
        .iter()
        .position(|image| image.label.eq_ignore_ascii_case("front view"))
        .unwrap_or(0)
}

/// Filename suffix for an angle: its first word, lower-cased.
fn angle_suffix(angle: &str) -> String {
    angle
        .split_whitespace()
        .next()
        .unwrap_or("view")
        .to_lowercase()
}

fn image_part(image: &SourceImage) -> RequestPart {
    RequestPart::Image {
        mime_type: image.mime_type.clone(),
        data: image.bytes.clone(),
    }
}

fn style_reference_parts(options: &GenerationOptions, strategy: Strategy) -> Vec<RequestPart> {
    match &options.style_reference {
        Some(reference) if strategy.attaches_style_reference() => vec![
            RequestPart::Text(STYLE_REFERENCE_FRAMING.to_string()),
            image_part(reference),
        ],
        _ => Vec::new(),
    }
}

/// Shared context for multi-reference shapes: style reference first, then
/// every source image tagged with its viewpoint label.
fn shared_context(
    images: &[SourceImage],
    options: &GenerationOptions,
    strategy: Strategy,
) -> Vec<RequestPart> {
    let mut parts = style_reference_parts(options, strategy);
    for image in images {
        parts.push(RequestPart::Text(image.label.clone()));
        parts.push(image_part(image));
    }
    parts
}

/// Plan the full batch for one request.
///
/// Unit order is the deterministic result order: source-image order for
/// `PerImage`, angle order for `PerAngle`.
pub fn plan(
    strategy: Strategy,
    images: &[SourceImage],
    instructions: &str,
    options: &GenerationOptions,
    grounding: &BatchGrounding,
) -> PipelineResult<Vec<GenerationUnit>> {
    let template = if instructions.trim().is_empty() {
        strategy.default_template()
    } else {
        instructions
    };

    match strategy {
        Strategy::PerImage => {
            let units = images
                .iter()
                .enumerate()
                .map(|(index, image)| {
                    let analysis = match grounding {
                        BatchGrounding::PerImage(all) => {
                            all.get(index).cloned().unwrap_or_default()
                        }
                        BatchGrounding::Shared(shared) => shared.clone(),
                    };
                    let instruction = compose(template, &analysis, options, UnitContext::default());

                    let mut parts = style_reference_parts(options, strategy);
                    parts.push(image_part(image));
                    parts.push(RequestPart::Text(instruction));

                    let filename = if images.len() == 1 {
                        format!("{}.png", analysis.filename_stem)
                    } else {
                        format!("{}-{}.png", analysis.filename_stem, index + 1)
                    };

                    GenerationUnit {
                        parts,
                        resolution: options.resolution,
                        aspect_ratio: Some(PRODUCT_ASPECT_RATIO.to_string()),
                        filename,
                    }
                })
                .collect();
            Ok(units)
        }

        Strategy::PerAngle => {
            let analysis = match grounding {
                BatchGrounding::Shared(shared) => shared.clone(),
                BatchGrounding::PerImage(all) => {
                    all.get(primary_index(images)).cloned().unwrap_or_default()
                }
            };
            let angles: Vec<String> = match &options.angles {
                Some(angles) if !angles.is_empty() => angles.clone(),
                Some(_) => {
                    return Err(PipelineError::precondition(
                        "angle selection must contain at least one angle",
                    ))
                }
                None => DEFAULT_ANGLES.iter().map(|a| a.to_string()).collect(),
            };
            let context = shared_context(images, options, strategy);

            let units = angles
                .iter()
                .map(|angle| {
                    let instruction = compose(
                        template,
                        &analysis,
                        options,
                        UnitContext {
                            angle: Some(angle),
                            lifestyle: false,
                        },
                    );
                    let mut parts = context.clone();
                    parts.push(RequestPart::Text(instruction));

                    GenerationUnit {
                        parts,
                        resolution: options.resolution,
                        aspect_ratio: Some(PRODUCT_ASPECT_RATIO.to_string()),
                        filename: format!("{}-{}.png", analysis.filename_stem, angle_suffix(angle)),
                    }
                })
                .collect();
            Ok(units)
        }

        Strategy::SingleComposite | Strategy::SingleCompositeNoReference => {
            let analysis = match grounding {
                BatchGrounding::Shared(shared) => shared.clone(),
                BatchGrounding::PerImage(all) => {
                    all.get(primary_index(images)).cloned().unwrap_or_default()
                }
            };
            let instruction = compose(
                template,
                &analysis,
                options,
                UnitContext {
                    angle: None,
                    lifestyle: true,
                },
            );
            let mut parts = shared_context(images, options, strategy);
            parts.push(RequestPart::Text(instruction));

            Ok(vec![GenerationUnit {
                parts,
                resolution: options.resolution,
                aspect_ratio: Some(options.aspect_ratio.resolve(options.portrait).to_string()),
                filename: format!("{}.png", analysis.filename_stem),
            }])
        }
    }
}
