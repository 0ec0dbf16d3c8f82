//! Saving and loading the track network as JSON.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::TrackError;

use super::{GraphEdge, GraphNode, TrackGraph};

pub const GRAPH_FORMAT_VERSION: u32 = 1;

fn default_version() -> u32 {
    GRAPH_FORMAT_VERSION
}

/// Serialized form of a [`TrackGraph`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    /// Files written before versioning carry no version and load as version 1.
    #[serde(default = "default_version")]
    pub version: u32,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl TrackGraph {
    pub fn to_json(&self) -> GraphData {
        GraphData {
            version: GRAPH_FORMAT_VERSION,
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    /// Replaces the whole graph with `data`. The id generators continue after the
    /// largest `node_<n>`/`edge_<n>` id found. If that id is already the largest
    /// number, they restart at 0 and skip the ids in use.
    pub fn from_json(&mut self, data: &GraphData) {
        self.clear();
        for node in &data.nodes {
            self.add_node(node.pos, Some(&node.id));
        }
        for edge in &data.edges {
            self.add_edge(
                &edge.from_node_id,
                &edge.to_node_id,
                edge.length_m,
                edge.curve,
                &edge.piece_id,
                Some(&edge.id),
            );
        }
        self.node_id_gen = next_generated_id(self.nodes.iter().map(|n| n.id.as_str()), "node_");
        self.edge_id_gen = next_generated_id(self.edges.iter().map(|e| e.id.as_str()), "edge_");
        debug!(
            version = data.version,
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "Loaded track graph"
        );
    }

    pub fn to_json_string(&self) -> Result<String, TrackError> {
        Ok(serde_json::to_string_pretty(&self.to_json())?)
    }

    pub fn from_json_str(&mut self, s: &str) -> Result<(), TrackError> {
        let data: GraphData = serde_json::from_str(s)?;
        self.from_json(&data);
        Ok(())
    }
}

fn next_generated_id<'a>(ids: impl Iterator<Item = &'a str>, prefix: &str) -> usize {
    let Some(max) = ids
        .filter_map(|id| id.strip_prefix(prefix)?.parse::<usize>().ok())
        .max()
    else {
        return 0;
    };
    max.checked_add(1).unwrap_or_else(|| {
        warn!(prefix, max, "Generated id counter is exhausted, restarting from 0");
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{arc_geometry::ArcDirection, track_graph::CurveDefinition, vec3::Vec3};

    fn sample_graph() -> TrackGraph {
        let mut graph = TrackGraph::new();
        graph.add_node(Vec3::new(0., 0., 0.), None);
        graph.add_node(Vec3::new(0.5, 0.1, 0.5), Some("node_7"));
        graph.add_node(Vec3::new(1., 0., 1.), Some("junction"));
        graph.add_edge(
            "node_0",
            "node_7",
            0.785,
            CurveDefinition::arc(0.5, 90., ArcDirection::Left),
            "piece_a",
            None,
        );
        graph.add_edge(
            "node_7",
            "junction",
            0.71,
            CurveDefinition::Straight,
            "piece_b",
            Some("edge_41"),
        );
        graph
    }

    #[test]
    fn round_trip_preserves_everything() {
        let graph = sample_graph();
        let json = graph.to_json_string().unwrap();

        let mut loaded = TrackGraph::new();
        loaded.from_json_str(&json).unwrap();

        assert_eq!(loaded.to_json(), graph.to_json());
        assert_eq!(loaded.get_node("node_7").unwrap().pos, Vec3::new(0.5, 0.1, 0.5));
        assert_eq!(
            loaded.get_edge("edge_0").unwrap().curve,
            CurveDefinition::arc(0.5, 90., ArcDirection::Left)
        );
    }

    #[test]
    fn generated_ids_continue_after_import() {
        let mut loaded = TrackGraph::new();
        loaded.from_json(&sample_graph().to_json());

        let node = loaded.add_node(Vec3::zero(), None).id.clone();
        assert_eq!(node, "node_8");
        let edge = loaded
            .add_edge("node_8", "junction", 1., CurveDefinition::Straight, "p", None)
            .id
            .clone();
        assert_eq!(edge, "edge_42");
        assert_eq!(loaded.get_stats().node_count, 4);
        assert_eq!(loaded.get_stats().edge_count, 3);
    }

    #[test]
    fn import_of_largest_numbered_id() {
        let json = format!(
            r#"{{
                "nodes": [
                    {{ "id": "node_{max}", "pos": {{ "x": 0, "y": 0, "z": 0 }} }},
                    {{ "id": "node_0", "pos": {{ "x": 1, "y": 0, "z": 0 }} }}
                ],
                "edges": [
                    {{ "id": "edge_{max}", "fromNodeId": "node_0", "toNodeId": "node_{max}",
                       "lengthM": 1, "curve": {{ "type": "straight" }}, "pieceId": "p" }}
                ]
            }}"#,
            max = usize::MAX
        );
        let mut graph = TrackGraph::new();
        graph.from_json_str(&json).unwrap();

        assert_eq!(graph.add_node(Vec3::zero(), None).id, "node_1");
        assert_eq!(graph.get_node("node_0").unwrap().pos, Vec3::new(1., 0., 0.));
        assert_eq!(graph.get_stats().node_count, 3);
        let edge = graph
            .add_edge("node_0", "node_1", 1., CurveDefinition::Straight, "q", None)
            .id
            .clone();
        assert_eq!(edge, "edge_0");
        assert_eq!(graph.get_stats().edge_count, 2);
    }

    #[test]
    fn load_replaces_existing_content() {
        let mut graph = sample_graph();
        graph.from_json(&GraphData {
            version: GRAPH_FORMAT_VERSION,
            nodes: vec![],
            edges: vec![],
        });
        assert_eq!(graph.get_stats().node_count, 0);
        assert_eq!(graph.add_node(Vec3::zero(), None).id, "node_0");
    }

    #[test]
    fn reads_documented_layout_format() {
        let json = r#"{
            "nodes": [
                { "id": "a", "pos": { "x": 0, "y": 0, "z": 0 } },
                { "id": "b", "pos": { "x": 0.5, "y": 0, "z": 0.5 } }
            ],
            "edges": [
                { "id": "e", "fromNodeId": "a", "toNodeId": "b", "lengthM": 0.785,
                  "curve": { "type": "arc", "arcRadiusM": 0.5, "arcAngleDeg": 90, "arcDirection": -1 },
                  "pieceId": "p" },
                { "id": "s", "fromNodeId": "b", "toNodeId": "a", "lengthM": 0.7,
                  "curve": { "type": "straight" }, "pieceId": "q" }
            ]
        }"#;
        let mut graph = TrackGraph::new();
        graph.from_json_str(json).unwrap();
        assert_eq!(
            graph.get_edge("e").unwrap().curve,
            CurveDefinition::arc(0.5, 90., ArcDirection::Right)
        );
        assert!(graph.get_edge("s").unwrap().curve.is_straight());
        assert_eq!(graph.to_json().version, GRAPH_FORMAT_VERSION);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut graph = TrackGraph::new();
        let res = graph.from_json_str(r#"{ "nodes": [ { "id": 3 } ] }"#);
        assert!(matches!(res, Err(TrackError::Serde(_))));
    }
}
