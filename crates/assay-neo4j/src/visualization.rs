//! Graph snapshot assembly for the visualization surface.
//!
//! Three reads run concurrently (companies with their outgoing edges,
//! industries, themes) and land in a [`NodeAggregator`], which absorbs the
//! overlap between them. Failure here is non-critical to ingestion; the
//! pipeline treats it as a warning and falls back to empty stats.

use std::sync::Arc;

use assay_core::{GraphStats, GraphStore, ReportId, StageResult};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::aggregate::{AggregatedGraph, GraphNodeInfo, GraphRelationshipInfo, NodeAggregator};

pub struct VisualizationService {
    store: Arc<dyn GraphStore>,
}

impl VisualizationService {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Snapshot of the whole graph, or of one report's neighborhood when
    /// `report_id` is given.
    pub async fn snapshot(&self, report_id: Option<ReportId>) -> StageResult<AggregatedGraph> {
        let scope = report_id.map(|id| id.0.to_string());
        let params = json!({"report_id": scope});

        let company_query = match &scope {
            Some(_) => {
                "MATCH (r:Report {id: $report_id})-[:MENTIONS]->(c:Company)
                 OPTIONAL MATCH (c)-[rel]->(n)
                 RETURN c.ticker AS ticker, c.name AS name,
                        type(rel) AS relation, labels(n) AS target_labels,
                        coalesce(n.ticker, n.name, n.id) AS target_key"
            }
            None => {
                "MATCH (c:Company)
                 OPTIONAL MATCH (c)-[rel]->(n)
                 RETURN c.ticker AS ticker, c.name AS name,
                        type(rel) AS relation, labels(n) AS target_labels,
                        coalesce(n.ticker, n.name, n.id) AS target_key"
            }
        };
        let industry_query = match &scope {
            Some(_) => {
                "MATCH (r:Report {id: $report_id})-[:COVERS]->(i:Industry)
                 RETURN i.name AS name"
            }
            None => "MATCH (i:Industry) RETURN i.name AS name",
        };
        let theme_query = match &scope {
            Some(_) => {
                "MATCH (r:Report {id: $report_id})-[:DISCUSSES]->(t:Theme)
                 RETURN t.name AS name"
            }
            None => "MATCH (t:Theme) RETURN t.name AS name",
        };

        let (companies, industries, themes) = futures::join!(
            self.store.execute_read(company_query, params.clone()),
            self.store.execute_read(industry_query, params.clone()),
            self.store.execute_read(theme_query, params),
        );
        // A failed per-type read contributes nothing; the others still land.
        let companies = rows_or_empty(companies, "company");
        let industries = rows_or_empty(industries, "industry");
        let themes = rows_or_empty(themes, "theme");

        let mut aggregator = NodeAggregator::new();
        for row in &companies {
            let Some(ticker) = str_field(row, "ticker") else {
                continue;
            };
            let name = str_field(row, "name").unwrap_or_else(|| ticker.clone());
            aggregator.add_node(GraphNodeInfo::new("Company", ticker.clone(), name));

            if let (Some(relation), Some(target_key)) =
                (str_field(row, "relation"), str_field(row, "target_key"))
            {
                let target_type = first_label(row).unwrap_or_else(|| "Entity".to_string());
                aggregator.add_node(GraphNodeInfo::new(
                    target_type,
                    target_key.clone(),
                    target_key.clone(),
                ));
                aggregator.add_relationship(GraphRelationshipInfo {
                    source: ticker,
                    target: target_key,
                    relation_type: relation,
                    properties: Map::new(),
                });
            }
        }
        for row in &industries {
            if let Some(name) = str_field(row, "name") {
                aggregator.add_node(GraphNodeInfo::new("Industry", name.clone(), name));
            }
        }
        for row in &themes {
            if let Some(name) = str_field(row, "name") {
                aggregator.add_node(GraphNodeInfo::new("Theme", name.clone(), name));
            }
        }

        let graph = aggregator.aggregate();
        debug!(
            nodes = graph.nodes.len(),
            relationships = graph.relationships.len(),
            "graph snapshot assembled"
        );
        Ok(graph)
    }

    /// Summary counters derived from a full snapshot.
    pub async fn stats(&self) -> StageResult<GraphStats> {
        let graph = self.snapshot(None).await?;
        Ok(GraphStats {
            nodes_created: graph.nodes.len() as u32,
            relationships_created: graph.relationships.len() as u32,
            companies: graph.count_of("Company") as u32,
            industries: graph.count_of("Industry") as u32,
            themes: graph.count_of("Theme") as u32,
        })
    }
}

fn rows_or_empty(
    result: StageResult<Vec<Map<String, Value>>>,
    kind: &str,
) -> Vec<Map<String, Value>> {
    match result {
        Ok(rows) => rows,
        Err(err) => {
            warn!(kind, error = %err, "snapshot read failed, omitting its rows");
            Vec::new()
        }
    }
}

fn str_field(row: &Map<String, Value>, key: &str) -> Option<String> {
    row.get(key)?.as_str().map(str::to_string)
}

fn first_label(row: &Map<String, Value>) -> Option<String> {
    row.get("target_labels")?
        .as_array()?
        .first()?
        .as_str()
        .map(str::to_string)
}
