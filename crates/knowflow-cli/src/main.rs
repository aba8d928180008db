//! KnowFlow CLI entry point.

use clap::Parser;
use knowflow_cli::{commands, Cli, CliConfig, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Ingest { file } => commands::execute_ingest(&file).await?,
        Command::Batch { file, workers } => {
            commands::execute_batch(&file, workers, &config).await?
        }
        Command::Status { file } => commands::execute_status(&file).await?,
        Command::Context { file } => commands::execute_context(&file).await?,
        Command::Questions {
            file,
            types,
            count,
            difficulty,
        } => commands::execute_questions(&file, types, count, difficulty, &config).await?,
    }
    Ok(())
}
