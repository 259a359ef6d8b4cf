//! Remote model client trait for dependency injection

use async_trait::async_trait;

use crate::types::{AnalysisResult, GenerationRequest};
use shared::{ApiFailure, SourceImage};

/// The seam between the pipeline and the external generative service.
///
/// Implementations perform exactly one remote call per method invocation;
/// retry and analysis degradation are the pipeline's responsibility, so the
/// same policy applies to every client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Ask the lightweight analysis model for a product description and a
    /// suggested filename stem.
    async fn analyze(
        &self,
        api_key: &str,
        image: SourceImage,
    ) -> Result<AnalysisResult, ApiFailure>;

    /// Ask the generation model for one image built from the ordered parts.
    async fn generate(
        &self,
        api_key: &str,
        request: GenerationRequest,
    ) -> Result<Vec<u8>, ApiFailure>;
}
