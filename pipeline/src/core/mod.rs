//! Pure pipeline logic: prompt composition and batch planning

pub mod compose;
pub mod plan;

pub use compose::{compose, UnitContext, DEFAULT_BODY_TYPE, UPSCALE_INSTRUCTION};
pub use plan::{plan, validate_request, BatchGrounding, DEFAULT_ANGLES, PRODUCT_ASPECT_RATIO};
