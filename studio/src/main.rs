//! Studio binary entry point
//!
//! Thin driver around the generation pipeline: loads product photos from
//! disk, threads options and the API credential through `run`/`upscale`,
//! prints progress events, and writes the returned assets next to each
//! other in the output directory.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::Parser;

use pipeline::{GeminiClient, Pipeline};
use shared::{
    AspectRatioFamily, GenerationOptions, ResolutionTier, SourceImage, StatusSink, Strategy,
};

#[derive(Parser)]
#[command(name = "studio")]
#[command(about = "Turn raw product photos into production-grade assets")]
struct Args {
    /// Source product photos, in presentation order
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Transformation strategy: per-image, per-angle, composite, composite-no-reference
    #[arg(long, default_value = "per-image")]
    strategy: String,

    /// Comma-separated viewpoint labels matching the image order
    #[arg(long)]
    labels: Option<String>,

    /// Edited instruction template (defaults to the strategy's built-in one)
    #[arg(long)]
    instructions: Option<String>,

    /// Target resolution tier: 1k, 2k, 4k
    #[arg(long, default_value = "2k")]
    resolution: String,

    /// Aspect-ratio family for composite outputs: 1:1, 4:3, 16:9
    #[arg(long, default_value = "1:1")]
    aspect: String,

    /// Portrait orientation for the chosen aspect family
    #[arg(long)]
    portrait: bool,

    /// Body type constraining any implied wearer (default "Men")
    #[arg(long)]
    body_type: Option<String>,

    /// Environment tag for lifestyle composites, e.g. "sunlit cafe"
    #[arg(long)]
    environment: Option<String>,

    /// Free-text scene addendum for lifestyle composites
    #[arg(long)]
    scene: Option<String>,

    /// Comma-separated angle labels for the per-angle strategy
    #[arg(long)]
    angles: Option<String>,

    /// Optional style-reference image (mood/lighting only)
    #[arg(long)]
    style_reference: Option<PathBuf>,

    /// Output directory for generated assets
    #[arg(long, default_value = "out")]
    out_dir: PathBuf,

    /// Upscale the first image to the target resolution instead of
    /// running a strategy
    #[arg(long)]
    upscale: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    shared::logging::init("studio");
    let args = Args::parse();

    let api_key = env::var("GEMINI_API_KEY")
        .or_else(|_| env::var("GOOGLE_API_KEY"))
        .context("GEMINI_API_KEY or GOOGLE_API_KEY must be set")?;

    let strategy =
        Strategy::from_str(&args.strategy).map_err(|e| anyhow::anyhow!("{e}"))?;
    let resolution =
        ResolutionTier::from_str(&args.resolution).map_err(|e| anyhow::anyhow!("{e}"))?;
    let aspect_ratio =
        AspectRatioFamily::from_str(&args.aspect).map_err(|e| anyhow::anyhow!("{e}"))?;

    let labels = parse_labels(args.labels.as_deref(), args.images.len())?;
    let images = args
        .images
        .iter()
        .zip(labels)
        .map(|(path, label)| load_image(path, label))
        .collect::<Result<Vec<_>>>()?;

    let style_reference = args
        .style_reference
        .as_deref()
        .map(|path| load_image(path, "Style Reference".to_string()))
        .transpose()?;

    let options = GenerationOptions {
        resolution,
        aspect_ratio,
        portrait: args.portrait,
        style_reference,
        body_type: args.body_type.clone(),
        environment: args.environment.clone(),
        scene_prompt: args.scene.clone(),
        angles: args.angles.as_deref().map(parse_list),
    };

    let (sink, mut progress) = StatusSink::channel();
    let reporter = tokio::spawn(async move {
        while let Some(event) = progress.recv().await {
            tracing::info!("{event}");
        }
    });

    let pipeline = Pipeline::new(GeminiClient::new()).with_status_sink(sink);
    let results = if args.upscale {
        vec![
            pipeline
                .upscale(&images[0], resolution, &api_key)
                .await
                .map_err(report_pipeline_error)?,
        ]
    } else {
        pipeline
            .run(
                &images,
                strategy,
                args.instructions.as_deref().unwrap_or(""),
                &api_key,
                &options,
            )
            .await
            .map_err(report_pipeline_error)?
    };
    // The pipeline owns the last sender; dropping it lets the reporter drain
    // remaining events and exit.
    drop(pipeline);
    reporter.await.ok();

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;
    for result in &results {
        let target = args.out_dir.join(&result.filename);
        fs::write(&target, &result.bytes)
            .with_context(|| format!("failed to write {}", target.display()))?;
        tracing::info!("wrote {}", target.display());
    }
    println!("Generated {} asset(s) in {}", results.len(), args.out_dir.display());
    Ok(())
}

fn report_pipeline_error(error: pipeline::PipelineError) -> anyhow::Error {
    if error.is_auth_failure() {
        anyhow::anyhow!("{error}\nThe stored API key was rejected; set a fresh GEMINI_API_KEY.")
    } else {
        anyhow::anyhow!("{error}")
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Viewpoint labels for the loaded images. Defaults treat the first photo
/// as the front view, which is what the per-angle primary selection expects.
fn parse_labels(raw: Option<&str>, image_count: usize) -> Result<Vec<String>> {
    match raw {
        Some(raw) => {
            let labels = parse_list(raw);
            if labels.len() != image_count {
                bail!(
                    "got {} label(s) for {} image(s)",
                    labels.len(),
                    image_count
                );
            }
            Ok(labels)
        }
        None => Ok((0..image_count)
            .map(|index| {
                if index == 0 {
                    "Front View".to_string()
                } else {
                    format!("View {}", index + 1)
                }
            })
            .collect()),
    }
}

fn load_image(path: &Path, label: String) -> Result<SourceImage> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(SourceImage::new(bytes, mime_for_path(path), label))
}

fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}
