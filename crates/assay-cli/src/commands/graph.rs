use anyhow::Result;

use crate::app::App;
use crate::commands::parse_report_id;

pub async fn run(app: &App, report: Option<&str>, json: bool) -> Result<()> {
    let report_id = match report {
        Some(raw) => Some(parse_report_id(raw)?),
        None => None,
    };

    let snapshot = app.visualization.snapshot(report_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    if snapshot.nodes.is_empty() {
        println!("Knowledge graph is empty");
        return Ok(());
    }

    println!("Nodes: {}", snapshot.nodes.len());
    for (node_type, count) in &snapshot.node_counts {
        println!("  {node_type}: {count}");
    }
    println!("Relationships: {}", snapshot.relationships.len());
    Ok(())
}
