mod persistence;
mod search;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    arc_geometry::{ArcDirection, EdgeArc},
    error::TrackError,
    vec3::Vec3,
};

pub use self::persistence::{GRAPH_FORMAT_VERSION, GraphData};

/// A connection point where track segments meet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub pos: Vec3,
}

/// Shape of an edge between its two nodes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CurveDefinition {
    Straight,
    Arc {
        #[serde(rename = "arcRadiusM")]
        arc_radius_m: f64,
        #[serde(rename = "arcAngleDeg")]
        arc_angle_deg: f64,
        /// Turning side when traveling from `from_node_id` to `to_node_id`
        #[serde(rename = "arcDirection")]
        arc_direction: ArcDirection,
    },
}

impl CurveDefinition {
    pub fn arc(radius_m: f64, angle_deg: f64, direction: ArcDirection) -> Self {
        Self::Arc {
            arc_radius_m: radius_m,
            arc_angle_deg: angle_deg,
            arc_direction: direction,
        }
    }

    pub fn is_straight(&self) -> bool {
        matches!(self, Self::Straight)
    }
}

/// A track segment. Stored with a direction (`from` -> `to`) that defines `t`, but
/// vehicles may traverse it both ways.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,
    pub from_node_id: String,
    pub to_node_id: String,
    pub length_m: f64,
    pub curve: CurveDefinition,
    pub piece_id: String,
}

impl GraphEdge {
    pub fn touches(&self, node_id: &str) -> bool {
        self.from_node_id == node_id || self.to_node_id == node_id
    }

    /// The node on the far side of `node_id`, or `None` if the edge doesn't touch it.
    pub fn other_node(&self, node_id: &str) -> Option<&str> {
        if self.from_node_id == node_id {
            Some(&self.to_node_id)
        } else if self.to_node_id == node_id {
            Some(&self.from_node_id)
        } else {
            None
        }
    }
}

/// Resolved geometry of an edge. Arcs whose parameters don't fit their endpoints
/// degrade to straight lines.
#[derive(Clone, Copy, Debug)]
pub enum EdgeGeometry {
    Line { from: Vec3, to: Vec3 },
    Arc { arc: EdgeArc, from: Vec3, to: Vec3 },
}

impl EdgeGeometry {
    /// Position at `t`. Height is interpolated linearly between the end nodes.
    pub fn point_at(&self, t: f64) -> Vec3 {
        match self {
            Self::Line { from, to } => from.lerp(*to, t),
            Self::Arc { arc, from, to } => {
                let p = arc.point_at(t);
                Vec3::new(p.x, from.y * (1. - t) + to.y * t, p.z)
            }
        }
    }

    /// Unit direction of increasing `t`.
    pub fn tangent_at(&self, t: f64) -> Vec3 {
        match self {
            Self::Line { from, to } => (*to - *from).normalized(),
            Self::Arc { arc, .. } => arc.tangent_at(t),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub total_length_m: f64,
}

/// The track network: connection points and the segments between them.
///
/// Nodes and edges keep their insertion order, which decides which edge counts as
/// "first" wherever a query has more than one answer.
#[derive(Clone, Debug, Default)]
pub struct TrackGraph {
    nodes: Vec<GraphNode>,
    node_index: HashMap<String, usize>,
    edges: Vec<GraphEdge>,
    edge_index: HashMap<String, usize>,
    /// The next number of an auto generated node id
    node_id_gen: usize,
    /// The next number of an auto generated edge id
    edge_id_gen: usize,
}

impl TrackGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node at `pos`. Without an explicit id an unused one of the form `node_<n>`
    /// is generated. An existing node with the same explicit id is replaced.
    pub fn add_node(&mut self, pos: Vec3, id: Option<&str>) -> &GraphNode {
        let id = match id {
            Some(id) => id.to_string(),
            None => generate_id("node_", &mut self.node_id_gen, &self.node_index),
        };
        let node = GraphNode { id, pos };
        let idx = if let Some(&idx) = self.node_index.get(&node.id) {
            warn!(node_id = %node.id, "Replacing existing node");
            self.nodes[idx] = node;
            idx
        } else {
            self.node_index.insert(node.id.clone(), self.nodes.len());
            self.nodes.push(node);
            self.nodes.len() - 1
        };
        &self.nodes[idx]
    }

    /// Removes a node together with every edge touching it. Does nothing for an unknown id.
    pub fn remove_node(&mut self, node_id: &str) {
        if !self.node_index.contains_key(node_id) {
            return;
        }
        let edge_count = self.edges.len();
        self.edges.retain(|edge| !edge.touches(node_id));
        if self.edges.len() != edge_count {
            self.edge_index = index_by_id(&self.edges, |e| &e.id);
        }
        self.nodes.retain(|node| node.id != node_id);
        self.node_index = index_by_id(&self.nodes, |n| &n.id);
    }

    pub fn get_node(&self, node_id: &str) -> Option<&GraphNode> {
        self.node_index.get(node_id).map(|&idx| &self.nodes[idx])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter()
    }

    /// Adds an edge. The end nodes are not checked for existence, since pieces may add
    /// an edge before both of its nodes; see [`Self::validate`].
    pub fn add_edge(
        &mut self,
        from_node_id: &str,
        to_node_id: &str,
        length_m: f64,
        curve: CurveDefinition,
        piece_id: &str,
        id: Option<&str>,
    ) -> &GraphEdge {
        let id = match id {
            Some(id) => id.to_string(),
            None => generate_id("edge_", &mut self.edge_id_gen, &self.edge_index),
        };
        let edge = GraphEdge {
            id,
            from_node_id: from_node_id.to_string(),
            to_node_id: to_node_id.to_string(),
            length_m,
            curve,
            piece_id: piece_id.to_string(),
        };
        let idx = if let Some(&idx) = self.edge_index.get(&edge.id) {
            warn!(edge_id = %edge.id, "Replacing existing edge");
            self.edges[idx] = edge;
            idx
        } else {
            self.edge_index.insert(edge.id.clone(), self.edges.len());
            self.edges.push(edge);
            self.edges.len() - 1
        };
        &self.edges[idx]
    }

    pub fn remove_edge(&mut self, edge_id: &str) -> Option<GraphEdge> {
        let idx = self.edge_index.remove(edge_id)?;
        let edge = self.edges.remove(idx);
        self.edge_index = index_by_id(&self.edges, |e| &e.id);
        Some(edge)
    }

    pub fn get_edge(&self, edge_id: &str) -> Option<&GraphEdge> {
        self.edge_index.get(edge_id).map(|&idx| &self.edges[idx])
    }

    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// First node within `tolerance_m` of `pos`. Linear scan.
    pub fn find_node_at(&self, pos: Vec3, tolerance_m: f64) -> Option<&GraphNode> {
        self.nodes
            .iter()
            .find(|node| node.pos.distance(pos) <= tolerance_m)
    }

    pub fn get_edges_connected_to_node(&self, node_id: &str) -> Vec<&GraphEdge> {
        self.edges.iter().filter(|e| e.touches(node_id)).collect()
    }

    pub fn get_outgoing_edges(&self, node_id: &str) -> Vec<&GraphEdge> {
        self.edges
            .iter()
            .filter(|e| e.from_node_id == node_id)
            .collect()
    }

    pub fn get_incoming_edges(&self, node_id: &str) -> Vec<&GraphEdge> {
        self.edges
            .iter()
            .filter(|e| e.to_node_id == node_id)
            .collect()
    }

    pub fn get_edges_by_piece(&self, piece_id: &str) -> Vec<&GraphEdge> {
        self.edges
            .iter()
            .filter(|e| e.piece_id == piece_id)
            .collect()
    }

    /// Resolves the shape of an edge from its end nodes. `None` if the edge or one of its
    /// nodes is missing.
    pub fn edge_geometry(&self, edge_id: &str, arc_tolerance_m: f64) -> Option<EdgeGeometry> {
        let edge = self.get_edge(edge_id)?;
        let from = self.get_node(&edge.from_node_id)?.pos;
        let to = self.get_node(&edge.to_node_id)?.pos;
        Some(match edge.curve {
            CurveDefinition::Straight => EdgeGeometry::Line { from, to },
            CurveDefinition::Arc {
                arc_radius_m,
                arc_angle_deg,
                arc_direction,
            } => match EdgeArc::from_chord(
                from,
                to,
                arc_radius_m,
                arc_angle_deg,
                arc_direction,
                arc_tolerance_m,
            ) {
                Some(arc) => EdgeGeometry::Arc { arc, from, to },
                None => EdgeGeometry::Line { from, to },
            },
        })
    }

    pub fn get_stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
            total_length_m: self.edges.iter().map(|e| e.length_m).sum(),
        }
    }

    /// Opt-in integrity check: every edge must reference existing nodes.
    /// Reports the first dangling reference found.
    pub fn validate(&self) -> Result<(), TrackError> {
        for edge in &self.edges {
            for node_id in [&edge.from_node_id, &edge.to_node_id] {
                if !self.node_index.contains_key(node_id) {
                    return Err(TrackError::DanglingReference {
                        edge_id: edge.id.clone(),
                        node_id: node_id.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Next `<prefix><n>` not already in `taken`, advancing `id_gen` past it.
fn generate_id(prefix: &str, id_gen: &mut usize, taken: &HashMap<String, usize>) -> String {
    loop {
        let id = format!("{prefix}{id_gen}");
        *id_gen = id_gen.wrapping_add(1);
        if !taken.contains_key(&id) {
            return id;
        }
    }
}

fn index_by_id<T>(items: &[T], id: impl Fn(&T) -> &String) -> HashMap<String, usize> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| (id(item).clone(), i))
        .collect()
}
