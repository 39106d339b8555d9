use clap::Parser;
use report_dispatch::{run, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        // run() already produced the terminal failure report
        tracing::debug!(error = ?e, "run failed");
        std::process::exit(1);
    }
}
