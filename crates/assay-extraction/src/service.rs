//! Extraction passes over a parsed document.

use std::sync::Arc;

use assay_core::{
    ExtractedEntities, ExtractedRelationship, GenerationProvider, StageError, StageResult,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::prompts;

/// Text beyond this length is cut at a character boundary before prompting.
/// Long reports blow the context window and the tail rarely adds entities
/// that the body has not already named.
const MAX_PROMPT_CHARS: usize = 24_000;

#[derive(Deserialize)]
struct RelationshipEnvelope {
    #[serde(default)]
    relationships: Vec<ExtractedRelationship>,
}

pub struct ExtractionService {
    provider: Arc<dyn GenerationProvider>,
}

impl ExtractionService {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    /// First pass: typed entities out of the raw report text.
    pub async fn extract_entities(&self, text: &str) -> StageResult<ExtractedEntities> {
        let text = truncate_chars(text, MAX_PROMPT_CHARS);
        let value = self
            .provider
            .generate_structured(
                &prompts::entity_prompt(text),
                Some(prompts::ENTITY_SYSTEM),
                &prompts::entity_schema(),
            )
            .await?;

        let entities: ExtractedEntities = serde_json::from_value(value).map_err(|e| {
            StageError::MalformedOutput(format!("entity extraction shape mismatch: {e}"))
        })?;
        info!(
            companies = entities.companies.len(),
            industries = entities.industries.len(),
            themes = entities.themes.len(),
            target_prices = entities.target_prices.len(),
            opinions = entities.opinions.len(),
            "entity extraction complete"
        );
        Ok(entities)
    }

    /// Second pass: relationships between the entities the first pass found.
    /// With fewer than two entities there is nothing to relate, so the pass
    /// is skipped.
    pub async fn extract_relationships(
        &self,
        text: &str,
        entities: &ExtractedEntities,
    ) -> StageResult<Vec<ExtractedRelationship>> {
        if entities.total() < 2 {
            debug!("fewer than two entities, skipping relationship pass");
            return Ok(Vec::new());
        }
        let text = truncate_chars(text, MAX_PROMPT_CHARS);
        let summary = entity_summary(entities);
        let value = self
            .provider
            .generate_structured(
                &prompts::relationship_prompt(text, &summary),
                Some(prompts::RELATIONSHIP_SYSTEM),
                &prompts::relationship_schema(),
            )
            .await?;

        let envelope: RelationshipEnvelope = serde_json::from_value(value).map_err(|e| {
            StageError::MalformedOutput(format!("relationship extraction shape mismatch: {e}"))
        })?;

        let mut relationships = envelope.relationships;
        let before = relationships.len();
        relationships.retain(|rel| {
            !rel.source.resolved_identifier().is_empty()
                && !rel.target.resolved_identifier().is_empty()
        });
        if relationships.len() < before {
            warn!(
                dropped = before - relationships.len(),
                "dropped relationships with unresolvable endpoints"
            );
        }
        info!(count = relationships.len(), "relationship extraction complete");
        Ok(relationships)
    }
}

/// One line per entity, identifier first, the way the relationship prompt
/// asks the model to reference them.
fn entity_summary(entities: &ExtractedEntities) -> String {
    let mut lines = Vec::new();
    for company in &entities.companies {
        lines.push(format!(
            "- Company {} ({})",
            company.ticker_or_slug(),
            company.name
        ));
    }
    for industry in &entities.industries {
        lines.push(format!("- Industry {}", industry.name));
    }
    for theme in &entities.themes {
        lines.push(format!("- Theme {}", theme.name));
    }
    lines.join("\n")
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assay_core::EntityType;
    use assay_llm::MockGenerationProvider;

    fn service_with(provider: MockGenerationProvider) -> ExtractionService {
        ExtractionService::new(Arc::new(provider))
    }

    #[tokio::test]
    async fn entities_deserialise_from_structured_output() {
        let provider = MockGenerationProvider::new();
        provider.push_response(
            r#"{
                "companies": [{"name": "Acme Corp", "ticker": "ACM", "industry": "Widgets"}],
                "industries": [{"name": "Widgets"}],
                "themes": [{"name": "Automation", "keywords": ["robots"]}],
                "target_prices": [{"company_ticker": "ACM", "value": 42.5, "currency": "USD"}],
                "opinions": [{"company_ticker": "ACM", "rating": "buy"}]
            }"#,
        );
        let entities = service_with(provider)
            .extract_entities("Acme Corp (ACM) makes widgets.")
            .await
            .unwrap();

        assert_eq!(entities.companies.len(), 1);
        assert_eq!(entities.companies[0].ticker.as_deref(), Some("ACM"));
        assert_eq!(entities.target_prices[0].value, 42.5);
        assert_eq!(entities.opinions[0].rating, "buy");
        assert_eq!(entities.total(), 5);
    }

    #[tokio::test]
    async fn fenced_output_still_parses() {
        let provider = MockGenerationProvider::new();
        provider.push_response("```json\n{\"companies\": [{\"name\": \"Acme\"}]}\n```");
        let entities = service_with(provider)
            .extract_entities("Some text")
            .await
            .unwrap();
        assert_eq!(entities.companies.len(), 1);
    }

    #[tokio::test]
    async fn unparseable_output_is_classified_malformed() {
        let provider = MockGenerationProvider::new();
        provider.push_response("I cannot answer that.");
        provider.push_response("Still not JSON.");
        let err = service_with(provider)
            .extract_entities("Some text")
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn relationship_pass_skips_single_entity_documents() {
        let provider = MockGenerationProvider::new();
        let service = service_with(provider);
        let mut entities = ExtractedEntities::default();
        entities.companies.push(assay_core::Company {
            name: "Acme".into(),
            ticker: Some("ACM".into()),
            industry: None,
            market: None,
            aliases: vec![],
            confidence: 1.0,
        });
        let rels = service
            .extract_relationships("text", &entities)
            .await
            .unwrap();
        assert!(rels.is_empty());
    }

    #[tokio::test]
    async fn relationships_with_empty_endpoints_are_dropped() {
        let provider = MockGenerationProvider::new();
        provider.push_response(
            r#"{"relationships": [
                {
                    "source": {"entity_type": "Company", "identifier": "ACM"},
                    "target": {"entity_type": "Industry", "identifier": "Widgets"},
                    "relation_type": "BELONGS_TO",
                    "confidence": 0.9
                },
                {
                    "source": {"entity_type": "Company", "identifier": ""},
                    "target": {"entity_type": "Theme", "identifier": "Automation"},
                    "relation_type": "BENEFITS_FROM"
                }
            ]}"#,
        );
        let service = service_with(provider);
        let mut entities = ExtractedEntities::default();
        entities.companies.push(assay_core::Company {
            name: "Acme".into(),
            ticker: Some("ACM".into()),
            industry: None,
            market: None,
            aliases: vec![],
            confidence: 1.0,
        });
        entities.industries.push(assay_core::Industry {
            name: "Widgets".into(),
            parent_industry: None,
            confidence: 1.0,
        });

        let rels = service
            .extract_relationships("text", &entities)
            .await
            .unwrap();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].source.entity_type, EntityType::Company);
        assert_eq!(rels[0].relation_type, "BELONGS_TO");
    }
}
