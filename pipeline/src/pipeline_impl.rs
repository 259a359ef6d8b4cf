//! Pipeline implementation with dependency injection
//!
//! The dispatcher reduces to: validate, ground, plan, run all units
//! concurrently, normalize. Batches are all-or-nothing: the first terminal
//! failure fails the whole batch and completed sibling results are
//! discarded. Analysis failures never fail a batch.

use futures_util::future::{join_all, try_join_all};

use crate::core::compose::UPSCALE_INSTRUCTION;
use crate::core::plan::{plan, primary_index, validate_request, BatchGrounding};
use crate::error::{PipelineError, PipelineResult};
use crate::retry::{with_retry, RetryPolicy};
use crate::traits::ModelClient;
use crate::types::{AnalysisResult, GenerationRequest, GenerationUnit, RequestPart};
use shared::{
    GenerationOptions, ProcessedImage, ProgressEvent, ResolutionTier, SourceImage, StatusSink,
    Strategy,
};

/// Generation pipeline over an injected model client.
///
/// Credential and options are threaded through each call rather than held as
/// ambient state; the only shared state between concurrent units is this
/// struct's immutable configuration.
pub struct Pipeline<C: ModelClient> {
    client: C,
    retry: RetryPolicy,
    status: StatusSink,
}

impl<C: ModelClient> Pipeline<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
            status: StatusSink::disabled(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_status_sink(mut self, status: StatusSink) -> Self {
        self.status = status;
        self
    }

    /// Run one transformation batch and return its results in deterministic
    /// order: source-image order for `PerImage`, angle order for `PerAngle`.
    pub async fn run(
        &self,
        images: &[SourceImage],
        strategy: Strategy,
        instructions: &str,
        api_key: &str,
        options: &GenerationOptions,
    ) -> PipelineResult<Vec<ProcessedImage>> {
        validate_request(strategy, images, options, api_key)?;
        tracing::info!("dispatching {strategy} batch over {} image(s)", images.len());

        self.status.emit(ProgressEvent::Stage {
            message: "Analyzing product photos".to_string(),
        });
        let grounding = match strategy {
            Strategy::PerImage => {
                let analyses = join_all(
                    images
                        .iter()
                        .map(|image| self.analyze_or_default(api_key, image)),
                )
                .await;
                BatchGrounding::PerImage(analyses)
            }
            _ => {
                let primary = &images[primary_index(images)];
                BatchGrounding::Shared(self.analyze_or_default(api_key, primary).await)
            }
        };

        let units = plan(strategy, images, instructions, options, &grounding)?;
        self.status.emit(ProgressEvent::Stage {
            message: format!("Generating {} asset(s)", units.len()),
        });
        self.execute_units(&units, api_key).await
    }

    /// Single identity-preserving upscale call; no analysis phase.
    pub async fn upscale(
        &self,
        image: &SourceImage,
        resolution: ResolutionTier,
        api_key: &str,
    ) -> PipelineResult<ProcessedImage> {
        if api_key.trim().is_empty() {
            return Err(PipelineError::precondition("access credential is missing"));
        }

        self.status.emit(ProgressEvent::Stage {
            message: "Upscaling image".to_string(),
        });
        let request = GenerationRequest {
            parts: vec![
                RequestPart::Image {
                    mime_type: image.mime_type.clone(),
                    data: image.bytes.clone(),
                },
                RequestPart::Text(UPSCALE_INSTRUCTION.to_string()),
            ],
            resolution,
            aspect_ratio: None,
        };

        let bytes = with_retry(&self.retry, &self.status, || {
            self.client.generate(api_key, request.clone())
        })
        .await
        .map_err(PipelineError::Provider)?;

        Ok(ProcessedImage {
            bytes,
            filename: "upscaled-product.png".to_string(),
        })
    }

    /// Analysis is an optimization, not a correctness requirement: every
    /// failure collapses to the default grounding and the batch continues.
    async fn analyze_or_default(&self, api_key: &str, image: &SourceImage) -> AnalysisResult {
        match with_retry(&self.retry, &self.status, || {
            self.client.analyze(api_key, image.clone())
        })
        .await
        {
            Ok(analysis) => analysis,
            Err(failure) => {
                tracing::warn!("analysis degraded for '{}': {failure}", image.label);
                AnalysisResult::default()
            }
        }
    }

    /// Start every unit together and reassemble results in unit order.
    async fn execute_units(
        &self,
        units: &[GenerationUnit],
        api_key: &str,
    ) -> PipelineResult<Vec<ProcessedImage>> {
        let total = units.len();
        try_join_all(units.iter().enumerate().map(|(index, unit)| async move {
            let bytes = with_retry(&self.retry, &self.status, || {
                self.client.generate(api_key, unit.request())
            })
            .await
            .map_err(PipelineError::Provider)?;

            self.status
                .emit(ProgressEvent::UnitFinished { index, total });
            Ok(ProcessedImage {
                bytes,
                filename: unit.filename.clone(),
            })
        }))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockModelClient;
    use assert_matches::assert_matches;
    use shared::{ApiFailure, AspectRatioFamily};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn image(label: &str) -> SourceImage {
        SourceImage::new(vec![7, 7, 7], "image/png", label)
    }

    fn analysis(description: &str, stem: &str) -> AnalysisResult {
        AnalysisResult {
            description: description.to_string(),
            filename_stem: stem.to_string(),
        }
    }

    fn instant_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_single_composite_produces_one_result() {
        let mut mock = MockModelClient::new();
        mock.expect_analyze()
            .times(1)
            .returning(|_, _| Ok(analysis("enamel pin", "enamel-pin")));
        mock.expect_generate()
            .times(1)
            .returning(|_, _| Ok(vec![1, 2, 3]));

        let options = GenerationOptions {
            aspect_ratio: AspectRatioFamily::Square,
            ..Default::default()
        };
        let pipeline = Pipeline::new(mock);
        let results = pipeline
            .run(
                &[image("Front View")],
                Strategy::SingleComposite,
                "",
                "key",
                &options,
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].filename, "enamel-pin.png");
        assert_eq!(results[0].bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_per_image_batch_is_one_call_per_image() {
        let mut mock = MockModelClient::new();
        mock.expect_analyze()
            .times(3)
            .returning(|_, img| Ok(analysis(&format!("desc {}", img.label), "asset")));

        let captured: Arc<Mutex<Vec<GenerationRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();
        mock.expect_generate().times(3).returning(move |_, request| {
            sink.lock().unwrap().push(request);
            Ok(vec![42])
        });

        let images = vec![image("Alpha"), image("Beta"), image("Gamma")];
        let pipeline = Pipeline::new(mock);
        let results = pipeline
            .run(
                &images,
                Strategy::PerImage,
                "",
                "key",
                &GenerationOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        // Source-image order regardless of completion order.
        assert_eq!(results[0].filename, "asset-1.png");
        assert_eq!(results[1].filename, "asset-2.png");
        assert_eq!(results[2].filename, "asset-3.png");

        // Each unit carried its own image's grounding.
        let requests = captured.lock().unwrap();
        for label in ["Alpha", "Beta", "Gamma"] {
            assert!(requests.iter().any(|request| request.parts.iter().any(
                |part| matches!(part, RequestPart::Text(t) if t.contains(&format!("desc {label}")))
            )));
        }
    }

    #[tokio::test]
    async fn test_per_angle_batch_suffixes_filenames() {
        let mut mock = MockModelClient::new();
        mock.expect_analyze()
            .times(1)
            .returning(|_, _| Ok(analysis("running shoe", "runner")));
        mock.expect_generate()
            .times(2)
            .returning(|_, _| Ok(vec![5]));

        let options = GenerationOptions {
            angles: Some(vec!["Front View".into(), "Side View".into()]),
            ..Default::default()
        };
        let pipeline = Pipeline::new(mock);
        let results = pipeline
            .run(
                &[image("Front View"), image("Detail")],
                Strategy::PerAngle,
                "",
                "key",
                &options,
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].filename, "runner-front.png");
        assert_eq!(results[1].filename, "runner-side.png");
    }

    #[tokio::test]
    async fn test_text_only_generation_surfaces_no_output() {
        let mut mock = MockModelClient::new();
        mock.expect_analyze()
            .returning(|_, _| Ok(AnalysisResult::default()));
        mock.expect_generate().times(1).returning(|_, _| {
            Err(ApiFailure::NoOutput(
                "model replied with text instead of an image: Sorry, I can only describe it".into(),
            ))
        });

        let pipeline = Pipeline::new(mock);
        let error = pipeline
            .run(
                &[image("Front View")],
                Strategy::SingleComposite,
                "",
                "key",
                &GenerationOptions::default(),
            )
            .await
            .unwrap_err();

        assert_matches!(
            error,
            PipelineError::Provider(ApiFailure::NoOutput(detail))
                if detail.contains("Sorry, I can only describe it")
        );
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_remote_calls() {
        // Any remote call would trip the mock's unset expectations.
        let mock = MockModelClient::new();
        let pipeline = Pipeline::new(mock);
        let error = pipeline
            .run(
                &[image("Front View")],
                Strategy::PerImage,
                "",
                "   ",
                &GenerationOptions::default(),
            )
            .await
            .unwrap_err();
        assert_matches!(error, PipelineError::Precondition { .. });
    }

    #[tokio::test]
    async fn test_analysis_failure_degrades_without_failing_batch() {
        let mut mock = MockModelClient::new();
        mock.expect_analyze()
            .times(1)
            .returning(|_, _| Err(ApiFailure::ServerError("analysis exploded".into())));
        mock.expect_generate()
            .times(1)
            .returning(|_, _| Ok(vec![8]));

        let pipeline = Pipeline::new(mock);
        let results = pipeline
            .run(
                &[image("Front View")],
                Strategy::SingleComposite,
                "",
                "key",
                &GenerationOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].filename, "processed-product.png");
    }

    #[tokio::test]
    async fn test_batch_fails_fast_on_terminal_unit_failure() {
        let mut mock = MockModelClient::new();
        mock.expect_analyze()
            .returning(|_, _| Ok(AnalysisResult::default()));
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        mock.expect_generate().returning(move |_, _| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(vec![1])
            } else {
                Err(ApiFailure::AuthFailed("token revoked".into()))
            }
        });

        let pipeline = Pipeline::new(mock);
        let error = pipeline
            .run(
                &[image("One"), image("Two")],
                Strategy::PerImage,
                "",
                "key",
                &GenerationOptions::default(),
            )
            .await
            .unwrap_err();

        // Partial successes are discarded, and the auth class survives so
        // the caller can re-prompt for a credential.
        assert!(error.is_auth_failure());
    }

    #[tokio::test]
    async fn test_transient_generation_failures_exhaust_retry_budget() {
        let mut mock = MockModelClient::new();
        mock.expect_analyze()
            .returning(|_, _| Ok(AnalysisResult::default()));
        // Budget of 2 retries: initial attempt + 2 = 3 calls.
        mock.expect_generate()
            .times(3)
            .returning(|_, _| Err(ApiFailure::RateLimited));

        let (sink, mut rx) = StatusSink::channel();
        let pipeline = Pipeline::new(mock)
            .with_retry_policy(instant_retry())
            .with_status_sink(sink);
        let error = pipeline
            .run(
                &[image("Front View")],
                Strategy::SingleComposite,
                "",
                "key",
                &GenerationOptions::default(),
            )
            .await
            .unwrap_err();

        assert_matches!(error, PipelineError::Provider(ApiFailure::RateLimited));
        let mut waits = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ProgressEvent::RetryWait { .. }) {
                waits += 1;
            }
        }
        assert_eq!(waits, 2);
    }

    #[tokio::test]
    async fn test_upscale_is_a_single_generation_call() {
        let mut mock = MockModelClient::new();
        mock.expect_generate().times(1).returning(|_, request| {
            assert!(request.aspect_ratio.is_none());
            assert!(request
                .parts
                .iter()
                .any(|part| matches!(part, RequestPart::Text(t) if t.contains("Upscale"))));
            Ok(vec![4, 4])
        });

        let pipeline = Pipeline::new(mock);
        let result = pipeline
            .upscale(&image("Front View"), ResolutionTier::FourK, "key")
            .await
            .unwrap();
        assert_eq!(result.bytes, vec![4, 4]);
    }

    #[tokio::test]
    async fn test_upscale_requires_credential() {
        let mock = MockModelClient::new();
        let pipeline = Pipeline::new(mock);
        let error = pipeline
            .upscale(&image("Front View"), ResolutionTier::TwoK, "")
            .await
            .unwrap_err();
        assert_matches!(error, PipelineError::Precondition { .. });
    }
}
