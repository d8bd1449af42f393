//! Report bookkeeping commands: status, list, retry, remove.

use std::path::Path;

use anyhow::{Context, Result};
use assay_core::ReportJob;

use crate::app::App;
use crate::commands::parse_report_id;

pub async fn status(app: &App, raw_id: &str) -> Result<()> {
    let id = parse_report_id(raw_id)?;
    match app.pipeline.store().get(id).await? {
        Some(job) => print_job(&job),
        None => anyhow::bail!("no report with id {id}"),
    }
    Ok(())
}

pub async fn list(app: &App) -> Result<()> {
    let jobs = app.pipeline.store().list().await?;
    if jobs.is_empty() {
        println!("No reports ingested yet");
        return Ok(());
    }
    for job in &jobs {
        println!(
            "{}  {:<22}  {}  {}",
            job.id,
            job.status.as_str(),
            job.created_at.format("%Y-%m-%d %H:%M"),
            job.title.as_deref().unwrap_or(&job.filename),
        );
    }
    Ok(())
}

pub async fn retry(app: &App, raw_id: &str, file: &Path) -> Result<()> {
    let id = parse_report_id(raw_id)?;
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let handle = app.pipeline.retry(id, bytes).await?;
    println!("Re-running report {id}");
    handle.wait().await;

    match app.pipeline.store().get(id).await? {
        Some(job) => {
            println!("Status: {}", job.status.as_str());
            if let Some(error) = &job.error {
                anyhow::bail!("ingestion failed: {error}");
            }
        }
        None => anyhow::bail!("report {id} disappeared while processing"),
    }
    Ok(())
}

pub async fn remove(app: &App, raw_id: &str) -> Result<()> {
    let id = parse_report_id(raw_id)?;
    app.pipeline.remove(id).await?;
    println!("Removed report {id}");
    Ok(())
}

fn print_job(job: &ReportJob) {
    println!("Report:   {}", job.id);
    println!("File:     {}", job.filename);
    println!("Status:   {}", job.status.as_str());
    println!("Created:  {}", job.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(title) = &job.title {
        println!("Title:    {title}");
    }
    if let Some(pages) = job.page_count {
        println!("Pages:    {pages}");
    }
    println!("Graph nodes:    {}", job.entity_count);
    println!("Vector chunks:  {}", job.vector_chunks);
    if let Some(error) = &job.error {
        println!("Error:    {error}");
    }
}
