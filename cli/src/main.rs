mod process;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use embedza_core::StageRegistry;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "embedza")]
#[command(about = "Embed snippet post-processing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the post-processing pipeline over a JSON snippet document
    Process {
        /// Input file: {"src": "...", "snippets": [...]}
        input: PathBuf,
        /// Comma-separated stage ids to run (default: all built-in stages)
        #[arg(long, value_delimiter = ',')]
        stages: Option<Vec<String>>,
        /// Pretty-print the resulting JSON
        #[arg(long)]
        pretty: bool,
    },
    /// List built-in stages in run order
    Stages,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            stages,
            pretty,
        } => {
            process::process(&input, stages.as_deref(), pretty).await?;
        }
        Commands::Stages => {
            for stage in StageRegistry::builtin().ordered() {
                let meta = stage.metadata();
                println!("{:<16} {}", meta.id, meta.description);
            }
        }
    }

    Ok(())
}
