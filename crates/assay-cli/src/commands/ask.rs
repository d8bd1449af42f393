use anyhow::Result;
use assay_query::{QueryOptions, Source};

use crate::app::App;

pub async fn run(app: &App, question: &str, provider: Option<String>, json: bool) -> Result<()> {
    let options = QueryOptions {
        conversation_id: None,
        provider,
    };
    let response = app.workflow.run_with(question, options).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}", response.answer);

    if !response.sources.is_empty() {
        println!();
        println!("Sources:");
        for source in &response.sources {
            match source {
                Source::ReportChunk {
                    title,
                    page_number,
                    score,
                    ..
                } => {
                    let title = title.as_deref().unwrap_or("untitled report");
                    match page_number {
                        Some(page) => println!("  - {title}, page {page} (score {score:.2})"),
                        None => println!("  - {title} (score {score:.2})"),
                    }
                }
                Source::GraphNode { label, identifier } => {
                    println!("  - {label} {identifier}");
                }
            }
        }
    }

    if !response.errors.is_empty() {
        println!();
        println!("Warnings:");
        for error in &response.errors {
            println!("  - {error}");
        }
    }
    Ok(())
}
