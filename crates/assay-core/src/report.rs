//! Report job record
//!
//! The `ReportJob` row is the only persisted state the core owns. Graph and
//! vector data live in their respective external stores and are addressed by
//! `ReportId`.

use crate::status::ReportStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of one ingestion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub Uuid);

impl ReportId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        ReportId(Uuid::new_v4())
    }

    /// Parse from the canonical hyphenated form.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(ReportId)
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One ingestion unit: an uploaded report and its processing metadata.
///
/// `content_hash` is unique across jobs; re-uploading identical bytes must
/// resolve to the existing job rather than create a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportJob {
    pub id: ReportId,
    pub filename: String,
    /// BLAKE3 hex digest of the uploaded bytes (dedup key).
    pub content_hash: String,
    pub status: ReportStatus,
    /// Triggering error message when `status` is `Failed`.
    pub error: Option<String>,
    pub title: Option<String>,
    pub page_count: Option<u32>,
    /// Graph nodes written for this report.
    pub entity_count: u32,
    /// Vector chunks stored for this report.
    pub vector_chunks: u32,
    pub created_at: DateTime<Utc>,
}

/// Result of registering an upload: either this call created the row, or an
/// earlier upload with the same content hash already owns it. Callers that
/// start work on new reports must key off `Created`, not the job status;
/// a concurrent duplicate can observe the row while it is still `Pending`.
#[derive(Debug, Clone)]
pub enum UploadOutcome {
    Created(ReportJob),
    Existing(ReportJob),
}

impl UploadOutcome {
    pub fn job(&self) -> &ReportJob {
        match self {
            UploadOutcome::Created(job) | UploadOutcome::Existing(job) => job,
        }
    }

    pub fn into_job(self) -> ReportJob {
        match self {
            UploadOutcome::Created(job) | UploadOutcome::Existing(job) => job,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, UploadOutcome::Created(_))
    }
}

impl ReportJob {
    /// Fresh job at `Pending`, created on upload.
    pub fn new(filename: impl Into<String>, content_hash: impl Into<String>) -> Self {
        ReportJob {
            id: ReportId::new(),
            filename: filename.into(),
            content_hash: content_hash.into(),
            status: ReportStatus::Pending,
            error: None,
            title: None,
            page_count: None,
            entity_count: 0,
            vector_chunks: 0,
            created_at: Utc::now(),
        }
    }
}
