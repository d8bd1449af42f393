//! Pipeline context and branch result types
//!
//! `PipelineContext` is the accumulating payload threaded through the
//! ingestion stages. It is exclusively owned by the executing run; the two
//! parallel stages each receive an independent clone of the post-extraction
//! context and return their fragments as tagged `BranchResult` values that
//! the join stage matches on by variant, never by completion order.

use crate::document::ParsedDocument;
use crate::entities::{ExtractedEntities, ExtractedRelationship};
use crate::error::StageError;
use crate::report::ReportId;
use serde::{Deserialize, Serialize};

/// Statistics returned by the graph-build branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes_created: u32,
    pub relationships_created: u32,
    pub companies: u32,
    pub industries: u32,
    pub themes: u32,
}

impl GraphStats {
    /// Additive merge; branch statistics accumulate, they never overwrite.
    pub fn merge(self, other: GraphStats) -> GraphStats {
        GraphStats {
            nodes_created: self.nodes_created + other.nodes_created,
            relationships_created: self.relationships_created + other.relationships_created,
            companies: self.companies + other.companies,
            industries: self.industries + other.industries,
            themes: self.themes + other.themes,
        }
    }
}

/// Which parallel branch produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchTag {
    Graph,
    Vectors,
}

impl BranchTag {
    pub fn name(self) -> &'static str {
        match self {
            BranchTag::Graph => "graph",
            BranchTag::Vectors => "vectors",
        }
    }
}

/// Tagged output of one parallel branch.
///
/// The join stage identifies each fragment by variant rather than probing a
/// loosely-typed payload for a known field.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchResult {
    Graph(GraphStats),
    Vectors { chunks_stored: u32 },
}

/// Outcome of one branch: either its tagged result or its classified error.
/// A failed branch still identifies itself so the join can record the failure
/// against the right side and substitute default statistics.
#[derive(Debug)]
pub struct BranchOutcome {
    pub tag: BranchTag,
    pub result: Result<BranchResult, StageError>,
}

impl BranchOutcome {
    pub fn ok(tag: BranchTag, result: BranchResult) -> Self {
        BranchOutcome {
            tag,
            result: Ok(result),
        }
    }

    pub fn failed(tag: BranchTag, error: StageError) -> Self {
        BranchOutcome {
            tag,
            result: Err(error),
        }
    }

    /// Graph statistics carried by this outcome, defaulting on failure or on
    /// the wrong variant.
    pub fn graph_stats(&self) -> GraphStats {
        match &self.result {
            Ok(BranchResult::Graph(stats)) => *stats,
            _ => GraphStats::default(),
        }
    }

    /// Chunk count carried by this outcome, zero on failure or on the wrong
    /// variant.
    pub fn chunks_stored(&self) -> u32 {
        match &self.result {
            Ok(BranchResult::Vectors { chunks_stored }) => *chunks_stored,
            _ => 0,
        }
    }
}

/// The accumulating payload threaded through ingestion stages.
///
/// Cloned (read-only) into each parallel branch at the fan-out; never shared
/// mutably between concurrent stage executions.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub report_id: ReportId,
    pub document: ParsedDocument,
    pub entities: ExtractedEntities,
    pub relationships: Vec<ExtractedRelationship>,
}

impl PipelineContext {
    pub fn new(report_id: ReportId, document: ParsedDocument) -> Self {
        PipelineContext {
            report_id,
            document,
            entities: ExtractedEntities::default(),
            relationships: Vec::new(),
        }
    }
}
