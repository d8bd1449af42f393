//! Merging of fan-out query results into one deduplicated graph snapshot.
//!
//! Several queries run concurrently and their results overlap (a company
//! returned by the company query also appears as an endpoint of a
//! relationship row). The aggregator deduplicates nodes by `(type, id)` and
//! relationships by `(source, target, type)`; for nodes, the first write
//! wins and later duplicates are dropped whole, never field-merged.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use serde_json::{Map, Value};

/// One graph node as shipped to the visualization layer.
#[derive(Debug, Clone, Serialize)]
pub struct GraphNodeInfo {
    pub node_type: String,
    pub id: String,
    pub label: String,
    pub properties: Map<String, Value>,
}

impl GraphNodeInfo {
    pub fn new(
        node_type: impl Into<String>,
        id: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            node_type: node_type.into(),
            id: id.into(),
            label: label.into(),
            properties: Map::new(),
        }
    }

    pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = properties;
        self
    }
}

/// One graph edge as shipped to the visualization layer.
#[derive(Debug, Clone, Serialize)]
pub struct GraphRelationshipInfo {
    pub source: String,
    pub target: String,
    pub relation_type: String,
    pub properties: Map<String, Value>,
}

/// The merged snapshot: deduplicated nodes and edges plus per-type counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregatedGraph {
    pub nodes: Vec<GraphNodeInfo>,
    pub relationships: Vec<GraphRelationshipInfo>,
    pub node_counts: BTreeMap<String, usize>,
}

impl AggregatedGraph {
    pub fn count_of(&self, node_type: &str) -> usize {
        self.node_counts.get(node_type).copied().unwrap_or(0)
    }
}

/// Accumulator fed by each fan-out query in turn.
#[derive(Debug, Default)]
pub struct NodeAggregator {
    nodes: Vec<GraphNodeInfo>,
    seen_nodes: HashSet<(String, String)>,
    relationships: Vec<GraphRelationshipInfo>,
    seen_edges: HashSet<(String, String, String)>,
}

impl NodeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node unless a node with the same `(type, id)` is already
    /// present. Returns whether the node was kept.
    pub fn add_node(&mut self, node: GraphNodeInfo) -> bool {
        let key = (node.node_type.clone(), node.id.clone());
        if !self.seen_nodes.insert(key) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    /// Add an edge unless the same `(source, target, type)` triple is
    /// already present. Returns whether the edge was kept.
    pub fn add_relationship(&mut self, rel: GraphRelationshipInfo) -> bool {
        let key = (
            rel.source.clone(),
            rel.target.clone(),
            rel.relation_type.clone(),
        );
        if !self.seen_edges.insert(key) {
            return false;
        }
        self.relationships.push(rel);
        true
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Finish, producing the snapshot in insertion order.
    pub fn aggregate(self) -> AggregatedGraph {
        let mut node_counts: BTreeMap<String, usize> = BTreeMap::new();
        for node in &self.nodes {
            *node_counts.entry(node.node_type.clone()).or_default() += 1;
        }
        AggregatedGraph {
            nodes: self.nodes,
            relationships: self.relationships,
            node_counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn duplicate_nodes_keep_the_first_write() {
        let mut agg = NodeAggregator::new();
        assert!(agg.add_node(
            GraphNodeInfo::new("Company", "AAPL", "Apple Inc.")
                .with_properties(props(&[("sector", json!("tech"))]))
        ));
        assert!(!agg.add_node(
            GraphNodeInfo::new("Company", "AAPL", "Apple")
                .with_properties(props(&[("sector", json!("hardware"))]))
        ));

        let graph = agg.aggregate();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].label, "Apple Inc.");
        // Later duplicates are dropped whole, not field-merged.
        assert_eq!(graph.nodes[0].properties["sector"], json!("tech"));
    }

    #[test]
    fn same_id_under_different_types_is_not_a_duplicate() {
        let mut agg = NodeAggregator::new();
        assert!(agg.add_node(GraphNodeInfo::new("Company", "X", "X Corp")));
        assert!(agg.add_node(GraphNodeInfo::new("Theme", "X", "Project X")));
        assert_eq!(agg.aggregate().nodes.len(), 2);
    }

    #[test]
    fn duplicate_edges_collapse_but_direction_matters() {
        let mut agg = NodeAggregator::new();
        let edge = GraphRelationshipInfo {
            source: "AAPL".into(),
            target: "semiconductors".into(),
            relation_type: "BELONGS_TO".into(),
            properties: Map::new(),
        };
        assert!(agg.add_relationship(edge.clone()));
        assert!(!agg.add_relationship(edge.clone()));

        let reversed = GraphRelationshipInfo {
            source: "semiconductors".into(),
            target: "AAPL".into(),
            relation_type: "BELONGS_TO".into(),
            properties: Map::new(),
        };
        assert!(agg.add_relationship(reversed));
        assert_eq!(agg.aggregate().relationships.len(), 2);
    }

    #[test]
    fn counts_group_by_node_type() {
        let mut agg = NodeAggregator::new();
        agg.add_node(GraphNodeInfo::new("Company", "A", "A"));
        agg.add_node(GraphNodeInfo::new("Company", "B", "B"));
        agg.add_node(GraphNodeInfo::new("Industry", "steel", "Steel"));

        let graph = agg.aggregate();
        assert_eq!(graph.count_of("Company"), 2);
        assert_eq!(graph.count_of("Industry"), 1);
        assert_eq!(graph.count_of("Theme"), 0);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut agg = NodeAggregator::new();
        for id in ["c", "a", "b"] {
            agg.add_node(GraphNodeInfo::new("Company", id, id));
        }
        let ids: Vec<_> = agg.aggregate().nodes.into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
