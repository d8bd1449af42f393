//! Configuration file loading.
//!
//! One `assay.toml` describes the whole deployment: storage backends,
//! providers, and pipeline tuning. Every section has working local-stack
//! defaults, so a missing file means "Ollama plus local Neo4j and Qdrant".

use anyhow::{Context, Result};
use assay_llm::ProviderConfig;
use assay_pipeline::PipelineConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AssayConfig {
    pub database: DatabaseSettings,
    pub neo4j: Neo4jSettings,
    pub qdrant: QdrantSettings,
    pub providers: ProviderSettings,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite file holding report job rows.
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("assay.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Neo4jSettings {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl Default for Neo4jSettings {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_string(),
            username: "neo4j".to_string(),
            password: "password".to_string(),
            database: "neo4j".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QdrantSettings {
    pub url: String,
    pub collection: String,
}

impl Default for QdrantSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            collection: "assay_reports".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub generation: ProviderConfig,
    pub embedding: ProviderConfig,
    /// Shared per-minute budget for all LLM calls in this process.
    pub calls_per_minute: usize,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            generation: ProviderConfig::ollama("http://localhost:11434".to_string()),
            embedding: ProviderConfig::ollama("http://localhost:11434".to_string()),
            calls_per_minute: 60,
        }
    }
}

impl AssayConfig {
    /// Load from an explicit path, from `./assay.toml` when it exists, or
    /// fall back to defaults.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => {
                let default = Path::new("assay.toml");
                if !default.exists() {
                    debug!("no assay.toml found, using default configuration");
                    let mut config = Self::default();
                    config.apply_env_overrides();
                    return Ok(config);
                }
                default.to_path_buf()
            }
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment variables override the file for endpoints and secrets.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("ASSAY_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Ok(uri) = std::env::var("NEO4J_URI") {
            self.neo4j.uri = uri;
        }
        if let Ok(username) = std::env::var("NEO4J_USERNAME") {
            self.neo4j.username = username;
        }
        if let Ok(password) = std::env::var("NEO4J_PASSWORD") {
            self.neo4j.password = password;
        }
        if let Ok(url) = std::env::var("QDRANT_URL") {
            self.qdrant.url = url;
        }
        for provider in [&mut self.providers.generation, &mut self.providers.embedding] {
            match provider {
                ProviderConfig::Ollama(cfg) => {
                    if let Ok(endpoint) = std::env::var("OLLAMA_ENDPOINT") {
                        cfg.base_url = endpoint;
                    }
                }
                ProviderConfig::OpenAI(cfg) => {
                    if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
                        cfg.api_key = api_key;
                    }
                }
                ProviderConfig::Mock => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_describe_the_local_stack() {
        let config = AssayConfig::default();
        assert_eq!(config.neo4j.uri, "http://localhost:7474");
        assert_eq!(config.qdrant.collection, "assay_reports");
        assert!(matches!(
            config.providers.generation,
            ProviderConfig::Ollama(_)
        ));
    }

    #[test]
    fn partial_files_fill_in_from_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[database]
path = "/tmp/custom.db"

[providers.generation]
provider = "openai"
api_key = "sk-test"
model = "gpt-4o-mini"
"#
        )
        .unwrap();

        let config = AssayConfig::load(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.database.path, PathBuf::from("/tmp/custom.db"));
        assert_eq!(config.qdrant.url, "http://localhost:6333");
        match config.providers.generation {
            ProviderConfig::OpenAI(cfg) => assert_eq!(cfg.model, "gpt-4o-mini"),
            other => panic!("unexpected provider: {other:?}"),
        }
        assert!(matches!(
            config.providers.embedding,
            ProviderConfig::Ollama(_)
        ));
    }

    #[test]
    fn pipeline_section_round_trips() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[pipeline]
max_stage_retries = 5
stage_timeout = 60
skip_table_analysis = true
"#
        )
        .unwrap();
        let config = AssayConfig::load(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.pipeline.max_stage_retries, 5);
        assert_eq!(config.pipeline.stage_timeout.as_secs(), 60);
        assert!(config.pipeline.skip_table_analysis);
    }
}
