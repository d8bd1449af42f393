//! `GraphStore` over the Neo4j transactional HTTP API.

use std::time::Duration;

use assay_core::{GraphStore, StageError, StageResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error};

/// Connection settings for a Neo4j server.
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: String,
    pub timeout_secs: u64,
}

impl Neo4jConfig {
    pub fn new(uri: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            username: username.into(),
            password: password.into(),
            database: "neo4j".to_string(),
            timeout_secs: 30,
        }
    }
}

/// HTTP client for the `/db/{name}/tx/commit` endpoint. Each call is one
/// auto-committed transaction.
pub struct Neo4jClient {
    config: Neo4jConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct CommitResponse {
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<Neo4jError>,
}

#[derive(Deserialize)]
struct StatementResult {
    columns: Vec<String>,
    data: Vec<RowEntry>,
}

#[derive(Deserialize)]
struct RowEntry {
    row: Vec<Value>,
}

#[derive(Deserialize)]
struct Neo4jError {
    code: String,
    message: String,
}

impl Neo4jClient {
    pub fn new(config: Neo4jConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    fn commit_url(&self) -> String {
        format!(
            "{}/db/{}/tx/commit",
            self.config.uri.trim_end_matches('/'),
            self.config.database
        )
    }

    async fn run(&self, query: &str, params: Value) -> StageResult<Vec<Map<String, Value>>> {
        let parameters = match params {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        debug!(query_chars = query.len(), "neo4j statement");
        let response = self
            .client
            .post(self.commit_url())
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(&json!({
                "statements": [{
                    "statement": query,
                    "parameters": parameters,
                }]
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(if status.is_server_error() {
                StageError::Transient(format!("neo4j returned {status}: {body}"))
            } else {
                StageError::Unrecoverable(format!("neo4j returned {status}: {body}"))
            });
        }

        let parsed: CommitResponse = response.json().await?;
        if let Some(first) = parsed.errors.first() {
            error!(code = %first.code, "neo4j statement failed");
            // Transient Neo4j codes carry the TransientError classification.
            return Err(if first.code.contains("Transient") {
                StageError::Transient(format!("{}: {}", first.code, first.message))
            } else {
                StageError::Unrecoverable(format!("{}: {}", first.code, first.message))
            });
        }

        let mut rows = Vec::new();
        for result in parsed.results {
            for entry in result.data {
                let mut map = Map::new();
                for (column, value) in result.columns.iter().zip(entry.row) {
                    map.insert(column.clone(), value);
                }
                rows.push(map);
            }
        }
        Ok(rows)
    }

    /// Cheap connectivity probe.
    pub async fn ping(&self) -> bool {
        self.run("RETURN 1 AS ok", Value::Null).await.is_ok()
    }
}

#[async_trait]
impl GraphStore for Neo4jClient {
    async fn execute_read(&self, query: &str, params: Value) -> StageResult<Vec<Map<String, Value>>> {
        self.run(query, params).await
    }

    async fn execute_write(
        &self,
        query: &str,
        params: Value,
    ) -> StageResult<Vec<Map<String, Value>>> {
        self.run(query, params).await
    }
}

impl std::fmt::Debug for Neo4jClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neo4jClient")
            .field("uri", &self.config.uri)
            .field("database", &self.config.database)
            .finish()
    }
}
