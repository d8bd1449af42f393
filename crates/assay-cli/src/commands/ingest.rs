use std::path::Path;

use anyhow::{Context, Result};

use crate::app::App;

pub async fn run(app: &App, file: &Path, no_wait: bool) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let handle = app.pipeline.submit(&filename, bytes).await?;
    let id = handle.report_id;

    if !handle.started() {
        println!("Already ingested as report {id}");
        return Ok(());
    }
    println!("Submitted report {id}");

    if no_wait {
        return Ok(());
    }

    handle.wait().await;
    match app.pipeline.store().get(id).await? {
        Some(job) => {
            println!("Status: {}", job.status.as_str());
            if let Some(title) = &job.title {
                println!("Title: {title}");
            }
            println!(
                "Graph nodes: {}  vector chunks: {}",
                job.entity_count, job.vector_chunks
            );
            if let Some(error) = &job.error {
                anyhow::bail!("ingestion failed: {error}");
            }
        }
        None => anyhow::bail!("report {id} disappeared while processing"),
    }
    Ok(())
}
