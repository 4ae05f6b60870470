use anyhow::Result;
use clap::Parser;
use s3_backup::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment (AWS vars, etc.) before anything reads it.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // RUST_LOG wins over --log-level when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("sync completed successfully"),
        Err(e) => tracing::error!(error = %e, "sync exited with error"),
    }
    result
}
