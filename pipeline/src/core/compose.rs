//! Instruction composition for generation units
//!
//! Pure string assembly: placeholder substitution first, then the fixed
//! constraint appendix. Constraint clauses always land after the
//! user-editable template body so an edited template cannot delete them.

use crate::types::AnalysisResult;
use shared::GenerationOptions;

pub const DEFAULT_BODY_TYPE: &str = "Men";

const BODY_TYPE_SLOT: &str = "<BodyType>";
const ANGLE_SLOT: &str = "{{ANGLE}}";
const PROMPT_SLOT: &str = "{{PROMPT}}";

/// Identity-preserving instruction used by the standalone upscale operation.
pub const UPSCALE_INSTRUCTION: &str = "Upscale this image to a higher resolution. \
    Reproduce it exactly: identical composition, framing, colors, printed text, \
    and details. Do not add, remove, restyle, or reinterpret anything.";

/// Strategy-specific context for one unit under composition.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitContext<'a> {
    /// Concrete angle this unit renders, when the strategy is per-angle.
    pub angle: Option<&'a str>,
    /// Lifestyle composites get scene addenda and the compositor framing.
    pub lifestyle: bool,
}

/// Build the final instruction text for one generation unit.
///
/// Deterministic: the same template, analysis, options, and context always
/// produce byte-identical output.
pub fn compose(
    template: &str,
    analysis: &AnalysisResult,
    options: &GenerationOptions,
    ctx: UnitContext<'_>,
) -> String {
    let body_type = options.body_type.as_deref().unwrap_or(DEFAULT_BODY_TYPE);
    let mut text = template.replace(BODY_TYPE_SLOT, body_type);

    if let Some(angle) = ctx.angle {
        if text.contains(ANGLE_SLOT) {
            text = text.replace(ANGLE_SLOT, angle);
        } else {
            text = format!("Generate view: {angle}. {text}");
        }
    }

    // A scene prompt consumed by its slot must not be appended again below.
    let mut prompt_slotted = false;
    if text.contains(PROMPT_SLOT) {
        match options.scene_prompt.as_deref() {
            Some(prompt) => {
                text = text.replace(PROMPT_SLOT, prompt);
                prompt_slotted = true;
            }
            None => text = text.replace(PROMPT_SLOT, ""),
        }
    }

    let mut out = text.trim().to_string();

    out.push_str(&format!(
        "\n\nStrict requirement: any human figure or implied wearer must match a \
         {body_type} body type. Never reshape or restyle the product to fit a \
         different build."
    ));

    if ctx.lifestyle {
        if let Some(environment) = options.environment.as_deref() {
            out.push_str(&format!("\nScene environment: {environment}."));
        }
        if !prompt_slotted {
            if let Some(prompt) = options.scene_prompt.as_deref() {
                out.push_str(&format!("\nScene notes: {prompt}"));
            }
        }
    }

    if !analysis.description.is_empty() {
        if ctx.lifestyle {
            out.push_str(&format!(
                "\nYou are a compositor, not a designer: place the exact product \
                 shown in the reference photos into the scene. Do not regenerate \
                 or alter its geometry, printed text, or logos. Detected product \
                 details to preserve: {}",
                analysis.description
            ));
        } else {
            out.push_str(&format!(
                "\nPreserve these detected product details exactly: {}",
                analysis.description
            ));
        }
    }

    out
}
