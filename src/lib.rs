pub mod client;
pub mod collect;
pub mod config;
pub mod contract;
pub mod load_config;
pub mod publish;
pub mod report;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use client::GithubBackend;
use load_config::{load_config, Overrides};
use publish::{publish, PublishError, PublishReport};

#[derive(Parser)]
#[clap(
    name = "report-dispatch",
    version,
    about = "Publish a folder of test reports as a build artifact and dispatch the downstream publishing workflow"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect the report folder, upload it as an artifact and trigger the
    /// downstream workflow
    Run {
        /// Report folder to publish (overrides the INPUT_FOLDER input)
        #[clap(long)]
        folder: Option<PathBuf>,
        /// Artifact name (overrides INPUT_ARTIFACT_NAME)
        #[clap(long)]
        artifact_name: Option<String>,
        /// Display name embedded in the artifact (overrides INPUT_PAGE_NAME)
        #[clap(long)]
        page_name: Option<String>,
        /// API token (overrides INPUT_TOKEN / GITHUB_TOKEN)
        #[clap(long)]
        token: Option<String>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Run {
            folder,
            artifact_name,
            page_name,
            token,
        } => {
            let overrides = Overrides {
                folder,
                artifact_name,
                page_name,
                token,
            };
            println!("Publish starting...");
            match execute(&overrides).await {
                Ok(report) => {
                    println!("Publish complete.\nReport:");
                    println!("{:#?}", report);
                    Ok(())
                }
                Err(e) => {
                    report::fail(&e);
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}

/// Resolves the configuration, runs the pipeline against the real backend
/// and emits the step outputs.
async fn execute(overrides: &Overrides) -> Result<PublishReport, PublishError> {
    let config = load_config(overrides)?;
    config.trace_loaded();
    let backend = GithubBackend::new_from_env(&config)?;
    let report = publish(&config, &backend).await?;
    report::success(&config, &report)?;
    Ok(report)
}
