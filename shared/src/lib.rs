//! Shared types for the product-photo generation pipeline
//!
//! Contains only the types that cross crate boundaries: source/result image
//! types, the strategy catalogue, generation options, remote-failure
//! classification, and the progress event stream. Pipeline-internal types
//! (planned units, analysis grounding) live in the pipeline crate.

pub mod events;
pub mod logging;
pub mod types;

pub use events::{ProgressEvent, StatusSink};
pub use types::*;
