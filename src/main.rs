// MANIMATOR Main Entry Point
// Copyright (c) 2026 Xing_The_Creator | MANIMATOR

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use manimator_core::agent::pdf_tools;
use manimator_core::agent::pipeline::{GenerationSource, DEFAULT_MAX_ATTEMPTS};
use manimator_core::config::AppConfig;
use manimator_core::server;
use manimator_core::state::ServiceState;

#[derive(Parser)]
#[command(name = "manimator")]
#[command(about = "Turn a concept or a paper into a Manim animation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },

    /// Print a scene description without rendering
    Describe {
        #[command(flatten)]
        input: InputArgs,

        /// arXiv paper id (e.g. 1512.03385)
        #[arg(long, conflicts_with_all = ["prompt", "pdf"])]
        arxiv: Option<String>,
    },

    /// Generate and render an animation
    Animate {
        #[command(flatten)]
        input: InputArgs,

        /// Where to write the video (defaults to printing the temp path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Whole-pipeline attempts
        #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
        attempts: u32,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Concept to explain (e.g. "Fourier Transform")
    #[arg(short, long, conflicts_with = "pdf")]
    prompt: Option<String>,

    /// Paper to explain
    #[arg(long)]
    pdf: Option<PathBuf>,
}

impl InputArgs {
    fn into_source(self) -> anyhow::Result<Option<GenerationSource>> {
        match (self.prompt, self.pdf) {
            (Some(prompt), _) => Ok(Some(GenerationSource::Prompt(prompt))),
            (None, Some(path)) => {
                let bytes = std::fs::read(&path)
                    .with_context(|| format!("failed to read PDF {}", path.display()))?;
                Ok(Some(GenerationSource::Document(bytes)))
            }
            (None, None) => Ok(None),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn")),
        )
        .init();

    info!("--- MANIMATOR v{} ---", env!("CARGO_PKG_VERSION"));

    let args = Cli::parse();
    let config = AppConfig::from_env().context("invalid configuration")?;
    let state = Arc::new(ServiceState::from_config(&config).context("failed to initialise pipeline")?);

    match args.command {
        Commands::Serve { port } => {
            server::start_server(port, state).await?;
        }
        Commands::Describe { input, arxiv } => {
            let scenes = state.pipeline.scenes();
            let description = match (input.into_source()?, arxiv) {
                (Some(GenerationSource::Prompt(prompt)), _) => scenes.from_prompt(&prompt).await?,
                (Some(GenerationSource::Document(pdf)), _) => scenes.from_document(&pdf).await?,
                (_, Some(id)) => {
                    let url = pdf_tools::arxiv_pdf_url(&state.arxiv_pdf_base, &id)?;
                    let pdf = pdf_tools::fetch_remote_pdf(&state.http, &url).await?;
                    scenes.from_document(&pdf).await?
                }
                _ => bail!("one of --prompt, --pdf or --arxiv is required"),
            };
            println!("{}", description);
        }
        Commands::Animate {
            input,
            output,
            attempts,
        } => {
            let Some(source) = input.into_source()? else {
                bail!("one of --prompt or --pdf is required");
            };
            let video = state.pipeline.generate_with_attempts(&source, attempts).await?;
            match output {
                Some(target) => {
                    move_video(&video, &target)?;
                    info!("[MANIMATOR] Video written to {:?}", target);
                    println!("{}", target.display());
                }
                None => println!("{}", video.display()),
            }
        }
    }

    Ok(())
}

/// Rename when possible, copy across filesystems otherwise.
fn move_video(from: &Path, to: &Path) -> anyhow::Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)
        .with_context(|| format!("failed to write {}", to.display()))?;
    if let Err(e) = std::fs::remove_file(from) {
        warn!("[MANIMATOR] Left temporary copy at {:?}: {}", from, e);
    }
    Ok(())
}
