//! MERGE-based graph construction from extracted entities.
//!
//! Upserts are keyed by natural key (ticker for companies, name for
//! industries and themes), so re-running a report merges into existing nodes
//! instead of duplicating them. Report-scoped nodes (the report itself,
//! target prices, opinions) key on the report id and are replaced on re-run.

use std::sync::Arc;

use assay_core::{
    ExtractedEntities, ExtractedRelationship, GraphStats, GraphStore, ReportId, StageResult,
};
use serde_json::json;
use tracing::{debug, info, warn};

pub struct GraphWriter {
    store: Arc<dyn GraphStore>,
}

impl GraphWriter {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Upsert the report node plus every extracted entity and relationship.
    pub async fn build_graph(
        &self,
        report_id: ReportId,
        title: &str,
        entities: &ExtractedEntities,
        relationships: &[ExtractedRelationship],
    ) -> StageResult<GraphStats> {
        let mut stats = GraphStats::default();
        let report_key = report_id.0.to_string();

        self.store
            .execute_write(
                "MERGE (r:Report {id: $id}) SET r.title = $title",
                json!({"id": report_key, "title": title}),
            )
            .await?;
        stats.nodes_created += 1;

        for company in &entities.companies {
            let ticker = company.ticker_or_slug();
            self.store
                .execute_write(
                    "MERGE (c:Company {ticker: $ticker})
                     SET c.name = $name,
                         c.industry = coalesce($industry, c.industry),
                         c.market = coalesce($market, c.market)
                     WITH c
                     MATCH (r:Report {id: $report_id})
                     MERGE (r)-[:MENTIONS]->(c)",
                    json!({
                        "ticker": ticker,
                        "name": company.name,
                        "industry": company.industry,
                        "market": company.market,
                        "report_id": report_key,
                    }),
                )
                .await?;
            stats.nodes_created += 1;
            stats.relationships_created += 1;
            stats.companies += 1;

            if let Some(industry) = &company.industry {
                self.store
                    .execute_write(
                        "MERGE (i:Industry {name: $industry})
                         WITH i
                         MATCH (c:Company {ticker: $ticker})
                         MERGE (c)-[:BELONGS_TO]->(i)",
                        json!({"industry": industry, "ticker": ticker}),
                    )
                    .await?;
                stats.relationships_created += 1;
            }
        }

        for industry in &entities.industries {
            self.store
                .execute_write(
                    "MERGE (i:Industry {name: $name})
                     SET i.parent_industry = coalesce($parent, i.parent_industry)
                     WITH i
                     MATCH (r:Report {id: $report_id})
                     MERGE (r)-[:COVERS]->(i)",
                    json!({
                        "name": industry.name,
                        "parent": industry.parent_industry,
                        "report_id": report_key,
                    }),
                )
                .await?;
            stats.nodes_created += 1;
            stats.relationships_created += 1;
            stats.industries += 1;
        }

        for theme in &entities.themes {
            self.store
                .execute_write(
                    "MERGE (t:Theme {name: $name})
                     SET t.description = coalesce($description, t.description),
                         t.keywords = $keywords
                     WITH t
                     MATCH (r:Report {id: $report_id})
                     MERGE (r)-[:DISCUSSES]->(t)",
                    json!({
                        "name": theme.name,
                        "description": theme.description,
                        "keywords": theme.keywords,
                        "report_id": report_key,
                    }),
                )
                .await?;
            stats.nodes_created += 1;
            stats.relationships_created += 1;
            stats.themes += 1;
        }

        for price in &entities.target_prices {
            self.store
                .execute_write(
                    "MERGE (c:Company {ticker: $ticker})
                     MERGE (tp:TargetPrice {report_id: $report_id, ticker: $ticker})
                     SET tp.value = $value,
                         tp.currency = $currency,
                         tp.date = $date,
                         tp.change_type = $change_type,
                         tp.previous_value = $previous_value
                     MERGE (c)-[:HAS_TARGET_PRICE]->(tp)
                     WITH tp
                     MATCH (r:Report {id: $report_id})
                     MERGE (r)-[:STATES]->(tp)",
                    json!({
                        "ticker": price.company_ticker,
                        "report_id": report_key,
                        "value": price.value,
                        "currency": price.currency,
                        "date": price.date,
                        "change_type": price.change_type,
                        "previous_value": price.previous_value,
                    }),
                )
                .await?;
            stats.nodes_created += 1;
            stats.relationships_created += 2;
        }

        for opinion in &entities.opinions {
            self.store
                .execute_write(
                    "MERGE (c:Company {ticker: $ticker})
                     MERGE (o:Opinion {report_id: $report_id, ticker: $ticker})
                     SET o.rating = $rating,
                         o.date = $date,
                         o.previous_rating = $previous_rating,
                         o.change_type = $change_type
                     MERGE (c)-[:HAS_OPINION]->(o)
                     WITH o
                     MATCH (r:Report {id: $report_id})
                     MERGE (r)-[:STATES]->(o)",
                    json!({
                        "ticker": opinion.company_ticker,
                        "report_id": report_key,
                        "rating": opinion.rating,
                        "date": opinion.date,
                        "previous_rating": opinion.previous_rating,
                        "change_type": opinion.change_type,
                    }),
                )
                .await?;
            stats.nodes_created += 1;
            stats.relationships_created += 2;
        }

        for rel in relationships {
            if self.write_relationship(rel).await? {
                stats.relationships_created += 1;
            }
        }

        info!(
            report_id = %report_id,
            nodes = stats.nodes_created,
            relationships = stats.relationships_created,
            "graph build complete"
        );
        Ok(stats)
    }

    async fn write_relationship(&self, rel: &ExtractedRelationship) -> StageResult<bool> {
        let source_key = rel.source.resolved_identifier();
        let target_key = rel.target.resolved_identifier();
        if source_key.is_empty() || target_key.is_empty() {
            warn!(relation = %rel.relation_type, "skipping relationship with unresolvable endpoint");
            return Ok(false);
        }
        let Some(relation_type) = sanitize_relation_type(&rel.relation_type) else {
            warn!(relation = %rel.relation_type, "skipping relationship with invalid type");
            return Ok(false);
        };

        // Labels and relationship types cannot be parameterized in Cypher;
        // both come from a closed set (labels) or are sanitized above.
        let query = format!(
            "MERGE (a:{src_label} {{{src_key}: $source}})
             MERGE (b:{dst_label} {{{dst_key}: $target}})
             MERGE (a)-[rel:{relation_type}]->(b)
             SET rel.confidence = $confidence,
                 rel.evidence = coalesce($evidence, rel.evidence)",
            src_label = rel.source.entity_type.label(),
            src_key = rel.source.entity_type.key_field(),
            dst_label = rel.target.entity_type.label(),
            dst_key = rel.target.entity_type.key_field(),
        );
        self.store
            .execute_write(
                &query,
                json!({
                    "source": source_key,
                    "target": target_key,
                    "confidence": rel.confidence,
                    "evidence": rel.evidence,
                }),
            )
            .await?;
        debug!(
            source = %source_key,
            target = %target_key,
            relation = %relation_type,
            "merged relationship"
        );
        Ok(true)
    }

    /// Drop report-scoped nodes; shared entities stay for other reports.
    pub async fn delete_report_graph(&self, report_id: ReportId) -> StageResult<()> {
        let report_key = report_id.0.to_string();
        self.store
            .execute_write(
                "MATCH (n) WHERE (n:TargetPrice OR n:Opinion) AND n.report_id = $id
                 DETACH DELETE n",
                json!({"id": report_key}),
            )
            .await?;
        self.store
            .execute_write(
                "MATCH (r:Report {id: $id}) DETACH DELETE r",
                json!({"id": report_key}),
            )
            .await?;
        Ok(())
    }
}

/// Uppercase the relation type and reject anything that is not `[A-Z0-9_]`
/// after normalization. Spaces and hyphens become underscores.
fn sanitize_relation_type(raw: &str) -> Option<String> {
    let normalized: String = raw
        .trim()
        .to_uppercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect();
    if normalized.is_empty()
        || !normalized
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        || normalized.starts_with(|c: char| c.is_ascii_digit())
    {
        return None;
    }
    Some(normalized)
}
