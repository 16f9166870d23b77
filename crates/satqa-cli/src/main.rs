use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};
use satqa_vertex::SatelliteInspector;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "satqa")]
#[command(about = "Satellite image quality assurance from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Inspect one image and print the verdict as JSON.
    Analyze {
        /// Local file path, or a `gs://` URI the model can read.
        image: String,
        /// Overrides the MIME type guessed from the file extension.
        #[arg(long)]
        mime_type: Option<String>,
    },
    /// Print the response schema sent to the model.
    Schema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Schema => {
            println!(
                "{}",
                serde_json::to_string_pretty(&satqa_core::analysis_response_schema())?
            );
        }
        Commands::Analyze { image, mime_type } => {
            let config = satqa_core::load_inspector_config()?;
            // Logs go to stderr so stdout stays machine-readable.
            let env_filter = EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();

            let inspector = SatelliteInspector::from_config(&config)
                .await
                .context("failed to set up the Vertex AI inspector")?;
            let verdict = analyze(&inspector, &image, mime_type.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        }
    }

    Ok(())
}

async fn analyze(
    inspector: &SatelliteInspector,
    image: &str,
    mime_type: Option<&str>,
) -> anyhow::Result<satqa_core::AnalysisResult> {
    let remote = is_remote(image);
    tracing::info!(
        image,
        remote,
        mime_type = mime_type.unwrap_or("inferred"),
        "analyzing image"
    );
    let verdict = if remote {
        inspector.analyze_from_uri(image, mime_type).await?
    } else {
        inspector.analyze_file(Path::new(image), mime_type).await?
    };
    tracing::info!(
        image,
        clouds = verdict.has_clouds.detected,
        snow = verdict.has_snow.detected,
        color_issues = verdict.has_color_issues.detected,
        other_issues = verdict.has_other_issues.detected,
        "analysis complete"
    );
    Ok(verdict)
}

fn is_remote(image: &str) -> bool {
    image.starts_with("gs://") || image.starts_with("https://")
}
