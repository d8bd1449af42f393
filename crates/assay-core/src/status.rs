//! Report lifecycle state machine
//!
//! A report moves forward through the ingestion stages and never backwards,
//! with two exceptions: any non-terminal state may fall to `Failed`, and a
//! `Failed` (or still-`Pending`) job may be manually re-queued to `Pending`
//! for a full re-run. Stage-level resumption is deliberately not supported;
//! intermediate pipeline context is not persisted between runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing status of one report ingestion job.
///
/// `BuildingGraph` and `StoringEmbeddings` are sibling sub-statuses written by
/// the two parallel pipeline branches; either may be observed while the other
/// branch is still running. Status writes are last-write-wins, so a poller may
/// see either one during the fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Parsing,
    AnalyzingTables,
    ExtractingEntities,
    ExtractingRelationships,
    BuildingGraph,
    StoringEmbeddings,
    GeneratingVisualization,
    Completed,
    Failed,
}

impl ReportStatus {
    /// Position of this status along the forward ordering.
    ///
    /// The two parallel sub-statuses share a rank: neither is ahead of the
    /// other, and a transition between them (in either direction) is legal
    /// while the fan-out is in flight.
    pub fn ord_rank(self) -> u8 {
        match self {
            ReportStatus::Pending => 0,
            ReportStatus::Parsing => 1,
            ReportStatus::AnalyzingTables => 2,
            ReportStatus::ExtractingEntities => 3,
            ReportStatus::ExtractingRelationships => 4,
            ReportStatus::BuildingGraph | ReportStatus::StoringEmbeddings => 5,
            ReportStatus::GeneratingVisualization => 6,
            ReportStatus::Completed => 7,
            ReportStatus::Failed => 8,
        }
    }

    /// Whether no further transitions are possible (except manual re-queue
    /// from `Failed`).
    pub fn is_terminal(self) -> bool {
        matches!(self, ReportStatus::Completed | ReportStatus::Failed)
    }

    /// Validate a transition request.
    ///
    /// Rules:
    /// - forward-only along `ord_rank` (the optional table-analysis stage may
    ///   be skipped, so jumps over intermediate ranks are allowed),
    /// - the two parallel sub-statuses may overwrite each other,
    /// - any non-`Completed` state may move to `Failed`,
    /// - `Failed` and `Pending` may be re-queued to `Pending`.
    pub fn can_transition_to(self, next: ReportStatus) -> bool {
        if next == ReportStatus::Failed {
            return self != ReportStatus::Completed;
        }
        if next == ReportStatus::Pending {
            // Manual re-queue restarts the full pipeline.
            return matches!(self, ReportStatus::Failed | ReportStatus::Pending);
        }
        if self.is_terminal() {
            return false;
        }
        // Parallel siblings share a rank; allow the lateral write.
        if self.ord_rank() == next.ord_rank() {
            return true;
        }
        next.ord_rank() > self.ord_rank()
    }

    /// Stable string form used in the relational store.
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Parsing => "parsing",
            ReportStatus::AnalyzingTables => "analyzing_tables",
            ReportStatus::ExtractingEntities => "extracting_entities",
            ReportStatus::ExtractingRelationships => "extracting_relationships",
            ReportStatus::BuildingGraph => "building_graph",
            ReportStatus::StoringEmbeddings => "storing_embeddings",
            ReportStatus::GeneratingVisualization => "generating_visualization",
            ReportStatus::Completed => "completed",
            ReportStatus::Failed => "failed",
        }
    }

    /// Parse the stable string form.
    pub fn parse(s: &str) -> Option<ReportStatus> {
        Some(match s {
            "pending" => ReportStatus::Pending,
            "parsing" => ReportStatus::Parsing,
            "analyzing_tables" => ReportStatus::AnalyzingTables,
            "extracting_entities" => ReportStatus::ExtractingEntities,
            "extracting_relationships" => ReportStatus::ExtractingRelationships,
            "building_graph" => ReportStatus::BuildingGraph,
            "storing_embeddings" => ReportStatus::StoringEmbeddings,
            "generating_visualization" => ReportStatus::GeneratingVisualization,
            "completed" => ReportStatus::Completed,
            "failed" => ReportStatus::Failed,
            _ => return None,
        })
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(ReportStatus::Pending.can_transition_to(ReportStatus::Parsing));
        assert!(ReportStatus::Parsing.can_transition_to(ReportStatus::ExtractingEntities));
        assert!(ReportStatus::ExtractingRelationships.can_transition_to(ReportStatus::BuildingGraph));
        assert!(ReportStatus::BuildingGraph.can_transition_to(ReportStatus::GeneratingVisualization));
        assert!(ReportStatus::GeneratingVisualization.can_transition_to(ReportStatus::Completed));
    }

    #[test]
    fn table_analysis_stage_is_skippable() {
        assert!(ReportStatus::Parsing.can_transition_to(ReportStatus::ExtractingEntities));
        assert!(ReportStatus::Parsing.can_transition_to(ReportStatus::AnalyzingTables));
    }

    #[test]
    fn backward_transitions_are_rejected() {
        assert!(!ReportStatus::ExtractingEntities.can_transition_to(ReportStatus::Parsing));
        assert!(!ReportStatus::Completed.can_transition_to(ReportStatus::Parsing));
        assert!(!ReportStatus::GeneratingVisualization.can_transition_to(ReportStatus::BuildingGraph));
    }

    #[test]
    fn parallel_siblings_share_rank() {
        assert!(ReportStatus::BuildingGraph.can_transition_to(ReportStatus::StoringEmbeddings));
        assert!(ReportStatus::StoringEmbeddings.can_transition_to(ReportStatus::BuildingGraph));
    }

    #[test]
    fn failed_is_reachable_from_any_non_completed_state() {
        for status in [
            ReportStatus::Pending,
            ReportStatus::Parsing,
            ReportStatus::AnalyzingTables,
            ReportStatus::ExtractingEntities,
            ReportStatus::ExtractingRelationships,
            ReportStatus::BuildingGraph,
            ReportStatus::StoringEmbeddings,
            ReportStatus::GeneratingVisualization,
            ReportStatus::Failed,
        ] {
            assert!(status.can_transition_to(ReportStatus::Failed), "{status}");
        }
        assert!(!ReportStatus::Completed.can_transition_to(ReportStatus::Failed));
    }

    #[test]
    fn terminal_states_only_allow_requeue() {
        assert!(!ReportStatus::Completed.can_transition_to(ReportStatus::Pending));
        assert!(ReportStatus::Failed.can_transition_to(ReportStatus::Pending));
        assert!(!ReportStatus::Failed.can_transition_to(ReportStatus::Parsing));
    }

    #[test]
    fn string_round_trip() {
        for status in [
            ReportStatus::Pending,
            ReportStatus::AnalyzingTables,
            ReportStatus::StoringEmbeddings,
            ReportStatus::Completed,
            ReportStatus::Failed,
        ] {
            assert_eq!(ReportStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ReportStatus::parse("bogus"), None);
    }
}
