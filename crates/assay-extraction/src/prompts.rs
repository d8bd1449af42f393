//! Prompt text and response schemas for the extraction passes.

use serde_json::{json, Value};

pub const ENTITY_SYSTEM: &str = "You are a financial analyst extracting structured data from \
equity research reports. Extract only what the text states. Do not infer tickers or prices \
that are not written in the report.";

pub const RELATIONSHIP_SYSTEM: &str = "You are a financial analyst mapping relationships \
between entities found in an equity research report. Only report relationships the text \
supports, and quote the supporting sentence as evidence.";

pub fn entity_prompt(text: &str) -> String {
    format!(
        "Extract every company, industry, investment theme, target price, and rating opinion \
         from this research report.\n\nReport text:\n{text}"
    )
}

pub fn relationship_prompt(text: &str, entity_summary: &str) -> String {
    format!(
        "These entities were found in a research report:\n{entity_summary}\n\n\
         Identify relationships between them (for example SUPPLIES_TO, COMPETES_WITH, \
         BELONGS_TO, BENEFITS_FROM). Use each entity's identifier exactly as given: \
         ticker for companies, name for industries and themes.\n\n\
         Report text:\n{text}"
    )
}

pub fn entity_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "companies": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "ticker": {"type": "string"},
                        "industry": {"type": "string"},
                        "market": {"type": "string"},
                        "confidence": {"type": "number"}
                    },
                    "required": ["name"]
                }
            },
            "industries": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "parent_industry": {"type": "string"}
                    },
                    "required": ["name"]
                }
            },
            "themes": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "keywords": {"type": "array", "items": {"type": "string"}},
                        "description": {"type": "string"}
                    },
                    "required": ["name"]
                }
            },
            "target_prices": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "company_ticker": {"type": "string"},
                        "value": {"type": "number"},
                        "currency": {"type": "string"},
                        "date": {"type": "string"},
                        "change_type": {"type": "string"},
                        "previous_value": {"type": "number"}
                    },
                    "required": ["company_ticker", "value"]
                }
            },
            "opinions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "company_ticker": {"type": "string"},
                        "rating": {"type": "string"},
                        "date": {"type": "string"},
                        "previous_rating": {"type": "string"},
                        "change_type": {"type": "string"}
                    },
                    "required": ["company_ticker", "rating"]
                }
            }
        }
    })
}

pub fn relationship_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "relationships": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "source": {
                            "type": "object",
                            "properties": {
                                "entity_type": {
                                    "type": "string",
                                    "enum": ["Company", "Industry", "Theme"]
                                },
                                "identifier": {"type": "string"},
                                "name": {"type": "string"}
                            },
                            "required": ["entity_type", "identifier"]
                        },
                        "target": {
                            "type": "object",
                            "properties": {
                                "entity_type": {
                                    "type": "string",
                                    "enum": ["Company", "Industry", "Theme"]
                                },
                                "identifier": {"type": "string"},
                                "name": {"type": "string"}
                            },
                            "required": ["entity_type", "identifier"]
                        },
                        "relation_type": {"type": "string"},
                        "confidence": {"type": "number"},
                        "evidence": {"type": "string"}
                    },
                    "required": ["source", "target", "relation_type"]
                }
            }
        },
        "required": ["relationships"]
    })
}
