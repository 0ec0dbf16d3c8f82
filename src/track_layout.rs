//! Placing and removing pieces, which is what builds the track graph.

use cgmath::Quaternion;
use tracing::{debug, warn};

use crate::{
    config::TrackConfig,
    error::TrackError,
    points::{PointState, PointsManager},
    track_graph::TrackGraph,
    track_piece::{CatalogEntry, SwitchState, TrackPiece},
    vec3::Vec3,
};

/// Read access to the placed pieces and the network they generated.
pub trait TrackSystem {
    fn all_pieces(&self) -> Vec<&TrackPiece>;
    fn graph(&self) -> &TrackGraph;
}

/// Owns the placed pieces and the graph generated from them.
#[derive(Clone, Debug, Default)]
pub struct TrackLayout {
    graph: TrackGraph,
    pieces: Vec<TrackPiece>,
    /// The next number of a piece id
    piece_id_gen: usize,
    config: TrackConfig,
}

impl TrackLayout {
    pub fn new(config: TrackConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Instantiates `catalog_entry` at the given pose and connects it to the network.
    ///
    /// Each connector joins an existing node within the node tolerance, or gets a new
    /// node. Each route of the template then becomes an edge, in template order.
    /// Returns the new piece id.
    pub fn place_piece(
        &mut self,
        catalog_entry: &CatalogEntry,
        position: Vec3,
        rotation: Quaternion<f64>,
    ) -> Result<String, TrackError> {
        for route in &catalog_entry.routes {
            for connector_id in [&route.from, &route.to] {
                if catalog_entry.connector_template(connector_id).is_none() {
                    return Err(TrackError::UnknownConnector {
                        catalog_id: catalog_entry.id.clone(),
                        connector_id: connector_id.clone(),
                    });
                }
            }
        }

        let id = format!("piece_{}", self.piece_id_gen);
        self.piece_id_gen += 1;
        let mut piece = TrackPiece::new(&id, catalog_entry.clone(), position, rotation);

        let tolerance = self.config.node_tolerance_m;
        let connector_ids: Vec<String> = piece.connectors().iter().map(|c| c.id.clone()).collect();
        for connector_id in connector_ids {
            let Some(connector) = piece.connector_mut(&connector_id) else {
                continue;
            };
            let node_id = match self.graph.find_node_at(connector.world_pos, tolerance) {
                Some(node) => node.id.clone(),
                None => self.graph.add_node(connector.world_pos, None).id.clone(),
            };
            connector.node_id = Some(node_id);
        }

        for route in &catalog_entry.routes {
            let node_of = |connector_id: &str| {
                piece
                    .connector(connector_id)
                    .and_then(|c| c.node_id.clone())
            };
            let (Some(from), Some(to)) = (node_of(&route.from), node_of(&route.to)) else {
                continue;
            };
            let edge_id = self
                .graph
                .add_edge(&from, &to, route.length_m, route.curve, &id, None)
                .id
                .clone();
            piece.generated_edge_ids.push(edge_id);
        }

        debug!(
            piece_id = %id,
            catalog_id = %catalog_entry.id,
            edges = piece.generated_edge_ids.len(),
            "Placed piece"
        );
        self.pieces.push(piece);
        Ok(id)
    }

    /// Removes a piece with its edges, then any of its nodes no other edge uses.
    pub fn remove_piece(&mut self, piece_id: &str) -> Option<TrackPiece> {
        let Some(idx) = self.pieces.iter().position(|p| p.id == piece_id) else {
            warn!(piece_id, "Cannot remove unknown piece");
            return None;
        };
        let piece = self.pieces.remove(idx);
        for edge_id in &piece.generated_edge_ids {
            self.graph.remove_edge(edge_id);
        }
        for node_id in piece.connectors().iter().filter_map(|c| c.node_id.as_deref()) {
            if self.graph.get_edges_connected_to_node(node_id).is_empty() {
                self.graph.remove_node(node_id);
            }
        }
        for other in &mut self.pieces {
            let stale: Vec<String> = other
                .connectors()
                .iter()
                .filter(|c| {
                    c.node_id
                        .as_deref()
                        .is_some_and(|node_id| self.graph.get_node(node_id).is_none())
                })
                .map(|c| c.id.clone())
                .collect();
            for connector_id in stale {
                if let Some(connector) = other.connector_mut(&connector_id) {
                    connector.node_id = None;
                }
            }
        }
        Some(piece)
    }

    pub fn get_piece(&self, piece_id: &str) -> Option<&TrackPiece> {
        self.pieces.iter().find(|p| p.id == piece_id)
    }

    pub fn get_piece_mut(&mut self, piece_id: &str) -> Option<&mut TrackPiece> {
        self.pieces.iter_mut().find(|p| p.id == piece_id)
    }

    /// Copies each point's logical state into its piece's cosmetic switch state.
    pub fn sync_switch_states(&mut self, points: &PointsManager) {
        for piece in &mut self.pieces {
            if let Some(state) = points.get_point_state(&piece.id) {
                piece.set_switch_state(match state {
                    PointState::Normal => SwitchState::A,
                    PointState::Reverse => SwitchState::B,
                });
            }
        }
    }

    pub fn config(&self) -> &TrackConfig {
        &self.config
    }
}

impl TrackSystem for TrackLayout {
    fn all_pieces(&self) -> Vec<&TrackPiece> {
        self.pieces.iter().collect()
    }

    fn graph(&self) -> &TrackGraph {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        arc_geometry::ArcDirection,
        track_graph::CurveDefinition,
        track_piece::{COMMON_CONNECTOR, ConnectorTemplate, PieceType, RouteTemplate},
    };

    #[test]
    fn consecutive_pieces_share_nodes() {
        let mut layout = TrackLayout::default();
        let straight = CatalogEntry::straight("S1", 1.);
        let a = layout
            .place_piece(&straight, Vec3::zero(), TrackPiece::yaw(0.))
            .unwrap();
        let b = layout
            .place_piece(&straight, Vec3::FORWARD, TrackPiece::yaw(0.))
            .unwrap();

        let stats = layout.graph().get_stats();
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.edge_count, 2);

        let a_end = layout.get_piece(&a).unwrap().connector("B").unwrap().node_id.clone();
        let b_start = layout.get_piece(&b).unwrap().connector("A").unwrap().node_id.clone();
        assert!(a_end.is_some());
        assert_eq!(a_end, b_start);
    }

    #[test]
    fn switch_generates_two_edges_from_common() {
        let mut layout = TrackLayout::default();
        let id = layout
            .place_piece(
                &CatalogEntry::switch("SW", 1., 2., 15., ArcDirection::Left),
                Vec3::zero(),
                TrackPiece::yaw(0.),
            )
            .unwrap();
        let piece = layout.get_piece(&id).unwrap();
        assert_eq!(piece.generated_edge_ids.len(), 2);
        let common = piece.connector(COMMON_CONNECTOR).unwrap().node_id.clone().unwrap();
        let edges = layout.graph().get_edges_by_piece(&id);
        assert!(edges.iter().all(|e| e.from_node_id == common));
        assert!(edges[0].curve.is_straight());
        assert!(!edges[1].curve.is_straight());
    }

    #[test]
    fn removing_a_piece_keeps_shared_nodes() {
        let mut layout = TrackLayout::default();
        let straight = CatalogEntry::straight("S1", 1.);
        let a = layout
            .place_piece(&straight, Vec3::zero(), TrackPiece::yaw(0.))
            .unwrap();
        layout
            .place_piece(&straight, Vec3::FORWARD, TrackPiece::yaw(0.))
            .unwrap();

        let removed = layout.remove_piece(&a).unwrap();
        assert_eq!(removed.id, a);
        let stats = layout.graph().get_stats();
        assert_eq!(stats.edge_count, 1);
        assert_eq!(stats.node_count, 2);
        assert!(layout.graph().validate().is_ok());
        assert!(layout.remove_piece(&a).is_none());
    }

    #[test]
    fn route_to_unknown_connector_is_rejected() {
        let entry = CatalogEntry {
            id: "broken".to_string(),
            piece_type: PieceType::Straight,
            connector_templates: vec![ConnectorTemplate {
                id: "A".to_string(),
                local_pos: Vec3::zero(),
                local_forward: -Vec3::FORWARD,
            }],
            routes: vec![RouteTemplate {
                from: "A".to_string(),
                to: "Z".to_string(),
                curve: CurveDefinition::Straight,
                length_m: 1.,
            }],
        };
        let mut layout = TrackLayout::default();
        let res = layout.place_piece(&entry, Vec3::zero(), TrackPiece::yaw(0.));
        assert!(matches!(res, Err(TrackError::UnknownConnector { .. })));
        assert_eq!(layout.all_pieces().len(), 0);
    }
}
