//! Generation orchestration pipeline for product photography
//!
//! Turns raw product photographs into production assets by coordinating an
//! external generative image service: a best-effort analysis pass grounds an
//! expensive generation pass, a four-way strategy dispatch shapes the
//! fan-out, and a bounded-retry controller absorbs transient provider
//! failures. The pipeline neither renders UI nor persists state; it is a
//! pure request-orchestration and response-normalization layer.

pub mod core;
pub mod error;
pub mod pipeline_impl;
pub mod retry;
pub mod services;
pub mod traits;
pub mod types;

// Re-export main types
pub use error::{PipelineError, PipelineResult};
pub use pipeline_impl::Pipeline;
pub use retry::{with_retry, RetryPolicy};
pub use services::GeminiClient;
pub use traits::ModelClient;
pub use types::{AnalysisResult, GenerationRequest, GenerationUnit, RequestPart};
