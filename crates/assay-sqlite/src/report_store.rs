//! `ReportStore` implementation over the `reports` table.

use std::sync::Arc;

use assay_core::{
    GraphStats, ReportId, ReportJob, ReportStatus, ReportStore, StageResult, UploadOutcome,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::connection::SqlitePool;
use crate::error::{SqliteError, SqliteResult};

/// SQLite-backed report job store. All writes happen under the pool's
/// connection lock, which is what makes the read-check-write in
/// [`transition`](ReportStore::transition) atomic with respect to the two
/// parallel branch workers.
#[derive(Clone)]
pub struct SqliteReportStore {
    pool: SqlitePool,
}

/// Construct the store behind the trait object the pipeline consumes.
pub fn create_report_store(pool: SqlitePool) -> Arc<dyn ReportStore> {
    Arc::new(SqliteReportStore { pool })
}

impl SqliteReportStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_job(row: &Row<'_>) -> rusqlite::Result<ReportJob> {
        let raw_id: String = row.get("id")?;
        let raw_status: String = row.get("status")?;
        let created_at: String = row.get("created_at")?;
        let id = ReportId::parse(&raw_id).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("invalid report id: {raw_id}").into(),
            )
        })?;
        let status = ReportStatus::parse(&raw_status).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown status: {raw_status}").into(),
            )
        })?;
        Ok(ReportJob {
            id,
            filename: row.get("filename")?,
            content_hash: row.get("content_hash")?,
            status,
            error: row.get("error")?,
            title: row.get("title")?,
            page_count: row.get::<_, Option<i64>>("page_count")?.map(|n| n as u32),
            entity_count: row.get::<_, i64>("entity_count")? as u32,
            vector_chunks: row.get::<_, i64>("vector_chunks")? as u32,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    fn fetch_by_hash(conn: &Connection, content_hash: &str) -> SqliteResult<Option<ReportJob>> {
        let job = conn
            .query_row(
                "SELECT * FROM reports WHERE content_hash = ?1",
                [content_hash],
                Self::row_to_job,
            )
            .optional()?;
        Ok(job)
    }

    fn fetch_by_id(conn: &Connection, id: ReportId) -> SqliteResult<Option<ReportJob>> {
        let job = conn
            .query_row(
                "SELECT * FROM reports WHERE id = ?1",
                [id.0.to_string()],
                Self::row_to_job,
            )
            .optional()?;
        Ok(job)
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn create_or_get_by_hash(
        &self,
        filename: &str,
        content_hash: &str,
    ) -> StageResult<UploadOutcome> {
        let filename = filename.to_string();
        let content_hash = content_hash.to_string();
        let outcome = self.pool.with_connection(|conn| {
            if let Some(existing) = Self::fetch_by_hash(conn, &content_hash)? {
                debug!(id = %existing.id, hash = %content_hash, "upload matched existing report");
                return Ok(UploadOutcome::Existing(existing));
            }
            let job = ReportJob::new(filename.clone(), content_hash.clone());
            let inserted = conn.execute(
                "INSERT INTO reports (id, filename, content_hash, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(content_hash) DO NOTHING",
                params![
                    job.id.0.to_string(),
                    job.filename,
                    job.content_hash,
                    job.status.as_str(),
                    job.created_at.to_rfc3339(),
                ],
            )?;
            // A concurrent insert may have won the conflict race; the row
            // read back is authoritative either way.
            let row = Self::fetch_by_hash(conn, &content_hash)?
                .ok_or_else(|| SqliteError::NotFound(content_hash.clone()))?;
            if inserted == 1 {
                Ok(UploadOutcome::Created(row))
            } else {
                Ok(UploadOutcome::Existing(row))
            }
        })?;
        let job = outcome.job();
        info!(
            id = %job.id,
            status = %job.status.as_str(),
            created = outcome.is_created(),
            "report row ready"
        );
        Ok(outcome)
    }

    async fn get(&self, id: ReportId) -> StageResult<Option<ReportJob>> {
        Ok(self.pool.with_connection(|conn| Self::fetch_by_id(conn, id))?)
    }

    async fn list(&self) -> StageResult<Vec<ReportJob>> {
        let jobs = self.pool.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM reports ORDER BY created_at DESC")?;
            let rows = stmt.query_map([], Self::row_to_job)?;
            let mut jobs = Vec::new();
            for row in rows {
                jobs.push(row?);
            }
            Ok(jobs)
        })?;
        Ok(jobs)
    }

    async fn transition(
        &self,
        id: ReportId,
        new_status: ReportStatus,
        error: Option<String>,
    ) -> StageResult<()> {
        self.pool.with_connection(|conn| {
            let job = Self::fetch_by_id(conn, id)?
                .ok_or_else(|| SqliteError::NotFound(id.0.to_string()))?;
            if !job.status.can_transition_to(new_status) {
                warn!(
                    id = %id,
                    from = job.status.as_str(),
                    to = new_status.as_str(),
                    "rejected status transition"
                );
                return Err(SqliteError::InvalidTransition {
                    from: job.status.as_str().to_string(),
                    to: new_status.as_str().to_string(),
                });
            }
            // Requeue wipes stale failure details and counters; the fresh
            // run re-reports both and the stats merge is additive.
            if new_status == ReportStatus::Pending {
                conn.execute(
                    "UPDATE reports SET status = ?1, error = NULL, entity_count = 0, vector_chunks = 0 WHERE id = ?2",
                    params![new_status.as_str(), id.0.to_string()],
                )?;
            } else {
                let error = error.clone().or(job.error);
                conn.execute(
                    "UPDATE reports SET status = ?1, error = ?2 WHERE id = ?3",
                    params![new_status.as_str(), error, id.0.to_string()],
                )?;
            }
            debug!(id = %id, from = job.status.as_str(), to = new_status.as_str(), "status transition");
            Ok(())
        })?;
        Ok(())
    }

    async fn update_metadata(
        &self,
        id: ReportId,
        title: Option<String>,
        page_count: u32,
    ) -> StageResult<()> {
        self.pool.with_connection(|conn| {
            let changed = conn.execute(
                "UPDATE reports SET title = ?1, page_count = ?2 WHERE id = ?3",
                params![title, page_count as i64, id.0.to_string()],
            )?;
            if changed == 0 {
                return Err(SqliteError::NotFound(id.0.to_string()));
            }
            Ok(())
        })?;
        Ok(())
    }

    async fn merge_branch_stats(
        &self,
        id: ReportId,
        graph: GraphStats,
        chunks_stored: u32,
    ) -> StageResult<()> {
        self.pool.with_connection(|conn| {
            let changed = conn.execute(
                "UPDATE reports
                 SET entity_count = entity_count + ?1,
                     vector_chunks = vector_chunks + ?2
                 WHERE id = ?3",
                params![
                    graph.nodes_created as i64,
                    chunks_stored as i64,
                    id.0.to_string()
                ],
            )?;
            if changed == 0 {
                return Err(SqliteError::NotFound(id.0.to_string()));
            }
            Ok(())
        })?;
        Ok(())
    }

    async fn delete(&self, id: ReportId) -> StageResult<()> {
        self.pool.with_connection(|conn| {
            conn.execute("DELETE FROM reports WHERE id = ?1", [id.0.to_string()])?;
            Ok(())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteReportStore {
        SqliteReportStore::new(SqlitePool::memory().unwrap())
    }

    #[tokio::test]
    async fn identical_uploads_share_one_row() {
        let store = store();
        let first = store.create_or_get_by_hash("q3.pdf", "hash-a").await.unwrap();
        assert!(first.is_created());
        let second = store
            .create_or_get_by_hash("q3-copy.pdf", "hash-a")
            .await
            .unwrap();
        // Only the first upload observes a creation; the copy resolves to
        // the existing row even though it is still pending.
        assert!(!second.is_created());
        let (first, second) = (first.into_job(), second.into_job());
        assert_eq!(first.id, second.id);
        assert_eq!(second.status, ReportStatus::Pending);
        // Original filename wins.
        assert_eq!(second.filename, "q3.pdf");
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn distinct_hashes_get_distinct_rows() {
        let store = store();
        let a = store.create_or_get_by_hash("a.pdf", "hash-a").await.unwrap();
        let b = store.create_or_get_by_hash("b.pdf", "hash-b").await.unwrap();
        assert!(a.is_created() && b.is_created());
        assert_ne!(a.job().id, b.job().id);
    }

    #[tokio::test]
    async fn forward_transitions_apply_and_backward_are_rejected() {
        let store = store();
        let job = store
            .create_or_get_by_hash("a.pdf", "h")
            .await
            .unwrap()
            .into_job();

        store
            .transition(job.id, ReportStatus::Parsing, None)
            .await
            .unwrap();
        store
            .transition(job.id, ReportStatus::ExtractingEntities, None)
            .await
            .unwrap();

        let backward = store.transition(job.id, ReportStatus::Parsing, None).await;
        assert!(backward.is_err());
        let current = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(current.status, ReportStatus::ExtractingEntities);
    }

    #[tokio::test]
    async fn sibling_branch_statuses_may_interleave() {
        let store = store();
        let job = store
            .create_or_get_by_hash("a.pdf", "h")
            .await
            .unwrap()
            .into_job();
        for status in [
            ReportStatus::Parsing,
            ReportStatus::ExtractingEntities,
            ReportStatus::ExtractingRelationships,
            ReportStatus::BuildingGraph,
            ReportStatus::StoringEmbeddings,
            ReportStatus::BuildingGraph,
            ReportStatus::GeneratingVisualization,
        ] {
            store.transition(job.id, status, None).await.unwrap();
        }
        let current = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(current.status, ReportStatus::GeneratingVisualization);
    }

    #[tokio::test]
    async fn failure_records_error_and_requeue_clears_it() {
        let store = store();
        let job = store
            .create_or_get_by_hash("a.pdf", "h")
            .await
            .unwrap()
            .into_job();
        store
            .transition(job.id, ReportStatus::Parsing, None)
            .await
            .unwrap();
        store
            .merge_branch_stats(
                job.id,
                GraphStats {
                    nodes_created: 3,
                    ..Default::default()
                },
                5,
            )
            .await
            .unwrap();
        store
            .transition(job.id, ReportStatus::Failed, Some("parser exploded".into()))
            .await
            .unwrap();

        let failed = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(failed.status, ReportStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("parser exploded"));

        // Requeue resets the error and the counters so the fresh run's
        // additive merge starts from zero.
        store
            .transition(job.id, ReportStatus::Pending, None)
            .await
            .unwrap();
        let requeued = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(requeued.status, ReportStatus::Pending);
        assert!(requeued.error.is_none());
        assert_eq!(requeued.entity_count, 0);
        assert_eq!(requeued.vector_chunks, 0);
    }

    #[tokio::test]
    async fn completed_jobs_cannot_be_requeued() {
        let store = store();
        let job = store
            .create_or_get_by_hash("a.pdf", "h")
            .await
            .unwrap()
            .into_job();
        for status in [
            ReportStatus::Parsing,
            ReportStatus::ExtractingEntities,
            ReportStatus::BuildingGraph,
            ReportStatus::GeneratingVisualization,
            ReportStatus::Completed,
        ] {
            store.transition(job.id, status, None).await.unwrap();
        }
        assert!(store
            .transition(job.id, ReportStatus::Pending, None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn branch_stats_accumulate_additively() {
        let store = store();
        let job = store
            .create_or_get_by_hash("a.pdf", "h")
            .await
            .unwrap()
            .into_job();

        let graph = GraphStats {
            nodes_created: 7,
            relationships_created: 12,
            companies: 2,
            industries: 1,
            themes: 4,
        };
        store.merge_branch_stats(job.id, graph, 0).await.unwrap();
        store
            .merge_branch_stats(job.id, GraphStats::default(), 30)
            .await
            .unwrap();

        let current = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(current.entity_count, 7);
        assert_eq!(current.vector_chunks, 30);
    }

    #[tokio::test]
    async fn metadata_update_round_trips() {
        let store = store();
        let job = store
            .create_or_get_by_hash("a.pdf", "h")
            .await
            .unwrap()
            .into_job();
        assert_eq!(job.page_count, None);
        store
            .update_metadata(job.id, Some("Q3 Outlook".into()), 14)
            .await
            .unwrap();
        let current = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(current.title.as_deref(), Some("Q3 Outlook"));
        assert_eq!(current.page_count, Some(14));
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let store = store();
        let job = store
            .create_or_get_by_hash("a.pdf", "h")
            .await
            .unwrap()
            .into_job();
        store.delete(job.id).await.unwrap();
        assert!(store.get(job.id).await.unwrap().is_none());
    }
}
