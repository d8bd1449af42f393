//! Extracted entity and relationship model
//!
//! Typed shapes for the structured output of the entity and relationship
//! extractors. These are the units the graph writer upserts by natural key:
//! companies by ticker, industries and themes by name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Node label in the knowledge graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Company,
    Industry,
    Theme,
    TargetPrice,
    Opinion,
    Report,
}

impl EntityType {
    /// Graph label string.
    pub fn label(self) -> &'static str {
        match self {
            EntityType::Company => "Company",
            EntityType::Industry => "Industry",
            EntityType::Theme => "Theme",
            EntityType::TargetPrice => "TargetPrice",
            EntityType::Opinion => "Opinion",
            EntityType::Report => "Report",
        }
    }

    /// Natural-key property for MERGE: companies key on ticker, everything
    /// else on name.
    pub fn key_field(self) -> &'static str {
        match self {
            EntityType::Company => "ticker",
            _ => "name",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A company mentioned in a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl Company {
    /// Ticker if present, otherwise a stable slug derived from the name.
    /// Keeps companies without a listed ticker addressable by natural key.
    pub fn ticker_or_slug(&self) -> String {
        match &self.ticker {
            Some(t) if !t.is_empty() => t.clone(),
            _ => slugify(&self.name),
        }
    }
}

/// An industry sector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Industry {
    pub name: String,
    #[serde(default)]
    pub parent_industry: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

/// An investment theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

/// An analyst target price attached to a company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetPrice {
    pub company_ticker: String,
    pub value: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub change_type: Option<String>,
    #[serde(default)]
    pub previous_value: Option<f64>,
}

/// An analyst rating opinion attached to a company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opinion {
    pub company_ticker: String,
    pub rating: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub previous_rating: Option<String>,
    #[serde(default)]
    pub change_type: Option<String>,
}

/// Structured output of the entity extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedEntities {
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub industries: Vec<Industry>,
    #[serde(default)]
    pub themes: Vec<Theme>,
    #[serde(default)]
    pub target_prices: Vec<TargetPrice>,
    #[serde(default)]
    pub opinions: Vec<Opinion>,
}

impl ExtractedEntities {
    /// Ticker of the primary (first-listed) company, used as a vector payload
    /// filter key.
    pub fn primary_ticker(&self) -> Option<String> {
        self.companies.first().map(|c| c.ticker_or_slug())
    }

    pub fn total(&self) -> usize {
        self.companies.len()
            + self.industries.len()
            + self.themes.len()
            + self.target_prices.len()
            + self.opinions.len()
    }
}

/// One endpoint of an extracted relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: EntityType,
    /// Natural key: ticker for companies, name otherwise. May be empty for
    /// companies without a ticker; consumers fall back to a name slug.
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl EntityRef {
    /// Resolved natural key, slugging the name when a company identifier is
    /// missing.
    pub fn resolved_identifier(&self) -> String {
        if !self.identifier.is_empty() {
            return self.identifier.clone();
        }
        match (&self.entity_type, &self.name) {
            (EntityType::Company, Some(name)) => slugify(name),
            (_, Some(name)) => name.clone(),
            _ => String::new(),
        }
    }
}

/// A typed, evidenced relationship between two entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedRelationship {
    pub source: EntityRef,
    pub target: EntityRef,
    pub relation_type: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub evidence: Option<String>,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

fn default_confidence() -> f64 {
    1.0
}

/// Lowercase, underscore-separated slug used as a fallback natural key.
pub fn slugify(name: &str) -> String {
    name.trim().to_lowercase().replace(char::is_whitespace, "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_fallback_slugs_the_name() {
        let company = Company {
            name: "Hana Semiconductor".to_string(),
            ticker: None,
            industry: None,
            market: None,
            aliases: vec![],
            confidence: 1.0,
        };
        assert_eq!(company.ticker_or_slug(), "hana_semiconductor");
    }

    #[test]
    fn entity_ref_resolves_missing_company_identifier() {
        let entity = EntityRef {
            entity_type: EntityType::Company,
            identifier: String::new(),
            name: Some("Acme Corp".to_string()),
        };
        assert_eq!(entity.resolved_identifier(), "acme_corp");
    }

    #[test]
    fn extraction_output_tolerates_missing_optional_fields() {
        let raw = r#"{"companies": [{"name": "Acme", "ticker": "ACME"}], "themes": []}"#;
        let entities: ExtractedEntities = serde_json::from_str(raw).unwrap();
        assert_eq!(entities.companies.len(), 1);
        assert_eq!(entities.primary_ticker().as_deref(), Some("ACME"));
        assert!(entities.opinions.is_empty());
    }
}
