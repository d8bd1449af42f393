use anyhow::Result;
use clap::Parser;

use assay_cli::{
    app,
    cli::{Cli, Commands},
    commands,
    config::AssayConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    let env_filter = format!(
        "assay_cli={level},assay_pipeline={level},assay_query={level},assay_llm={level}",
        level = log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env_filter))
        .init();

    let config = AssayConfig::load(cli.config)?;
    let app = app::build(&config).await?;

    match cli.command {
        Commands::Ingest { file, no_wait } => commands::ingest::run(&app, &file, no_wait).await,
        Commands::Status { id } => commands::reports::status(&app, &id).await,
        Commands::List => commands::reports::list(&app).await,
        Commands::Retry { id, file } => commands::reports::retry(&app, &id, &file).await,
        Commands::Remove { id } => commands::reports::remove(&app, &id).await,
        Commands::Ask {
            question,
            provider,
            json,
        } => commands::ask::run(&app, &question, provider, json).await,
        Commands::Graph { report, json } => {
            commands::graph::run(&app, report.as_deref(), json).await
        }
    }
}
