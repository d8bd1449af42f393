//! `VectorStore` over the Qdrant HTTP API.

use std::time::Duration;

use assay_core::{ReportId, StageError, StageResult, VectorPoint, VectorSearchHit, VectorStore};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

/// Connection settings for a Qdrant server.
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub collection: String,
    pub vector_size: usize,
    pub timeout_secs: u64,
}

impl QdrantConfig {
    pub fn new(url: impl Into<String>, collection: impl Into<String>, vector_size: usize) -> Self {
        Self {
            url: url.into(),
            collection: collection.into(),
            vector_size,
            timeout_secs: 30,
        }
    }
}

pub struct QdrantClient {
    config: QdrantConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Map<String, Value>,
}

#[derive(Deserialize)]
struct CountResponse {
    result: CountResult,
}

#[derive(Deserialize)]
struct CountResult {
    count: u64,
}

impl QdrantClient {
    pub fn new(config: QdrantConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!(
            "{}/collections/{}{}",
            self.config.url.trim_end_matches('/'),
            self.config.collection,
            suffix
        )
    }

    fn check(status: reqwest::StatusCode, body: String) -> StageResult<String> {
        if status.is_success() {
            Ok(body)
        } else if status.is_server_error() || status.as_u16() == 429 {
            Err(StageError::Transient(format!("qdrant returned {status}: {body}")))
        } else {
            Err(StageError::Unrecoverable(format!("qdrant returned {status}: {body}")))
        }
    }

    /// Create the collection if it does not exist. Cosine distance, matching
    /// the normalised embeddings every supported provider produces.
    pub async fn ensure_collection(&self) -> StageResult<()> {
        let exists = self
            .client
            .get(self.collection_url(""))
            .send()
            .await?
            .status()
            .is_success();
        if exists {
            return Ok(());
        }
        info!(
            collection = %self.config.collection,
            size = self.config.vector_size,
            "creating qdrant collection"
        );
        let response = self
            .client
            .put(self.collection_url(""))
            .json(&json!({
                "vectors": {
                    "size": self.config.vector_size,
                    "distance": "Cosine",
                }
            }))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::check(status, body)?;
        Ok(())
    }

    fn report_filter(report_id: ReportId) -> Value {
        json!({
            "must": [{
                "key": "report_id",
                "match": {"value": report_id.0.to_string()},
            }]
        })
    }
}

#[async_trait]
impl VectorStore for QdrantClient {
    async fn upsert(&self, points: Vec<VectorPoint>) -> StageResult<()> {
        if points.is_empty() {
            return Ok(());
        }
        let count = points.len();
        let payload_points: Vec<Value> = points
            .into_iter()
            .map(|p| {
                json!({
                    "id": p.id,
                    "vector": p.vector,
                    "payload": p.payload,
                })
            })
            .collect();
        let response = self
            .client
            .put(self.collection_url("/points?wait=true"))
            .json(&json!({"points": payload_points}))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::check(status, body)?;
        debug!(count, collection = %self.config.collection, "upserted points");
        Ok(())
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        limit: usize,
        score_threshold: f32,
        filter: Option<Map<String, Value>>,
    ) -> StageResult<Vec<VectorSearchHit>> {
        let mut request = json!({
            "vector": vector,
            "limit": limit,
            "score_threshold": score_threshold,
            "with_payload": true,
        });
        if let Some(fields) = filter {
            let must: Vec<Value> = fields
                .into_iter()
                .map(|(key, value)| json!({"key": key, "match": {"value": value}}))
                .collect();
            request["filter"] = json!({"must": must});
        }

        let response = self
            .client
            .post(self.collection_url("/points/search"))
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let body = Self::check(status, body)?;
        let parsed: SearchResponse = serde_json::from_str(&body)?;

        Ok(parsed
            .result
            .into_iter()
            .map(|point| VectorSearchHit {
                id: match point.id {
                    Value::String(s) => s,
                    other => other.to_string(),
                },
                score: point.score,
                payload: point.payload,
            })
            .collect())
    }

    async fn delete_by_report(&self, report_id: ReportId) -> StageResult<u64> {
        let filter = Self::report_filter(report_id);

        let response = self
            .client
            .post(self.collection_url("/points/count"))
            .json(&json!({"filter": filter, "exact": true}))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let body = Self::check(status, body)?;
        let counted: CountResponse = serde_json::from_str(&body)?;

        if counted.result.count > 0 {
            let response = self
                .client
                .post(self.collection_url("/points/delete?wait=true"))
                .json(&json!({"filter": filter}))
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Self::check(status, body)?;
        }
        info!(report_id = %report_id, deleted = counted.result.count, "deleted report vectors");
        Ok(counted.result.count)
    }
}

impl std::fmt::Debug for QdrantClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantClient")
            .field("url", &self.config.url)
            .field("collection", &self.config.collection)
            .finish()
    }
}
