//! Command implementations.

pub mod ask;
pub mod graph;
pub mod ingest;
pub mod reports;

use anyhow::{anyhow, Result};
use assay_core::ReportId;

fn parse_report_id(raw: &str) -> Result<ReportId> {
    ReportId::parse(raw).ok_or_else(|| anyhow!("invalid report id: {raw}"))
}
