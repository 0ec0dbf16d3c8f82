//! Points (switches): the logical route state of every switch piece, plus a cosmetic
//! blade animation that never affects routing.

mod events;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::{
    config::TrackConfig,
    track_graph::{GraphEdge, TrackGraph},
    track_layout::TrackSystem,
    track_piece::{COMMON_CONNECTOR, PieceType, TrackPiece},
    train::SwitchRouter,
};

pub use self::events::{ListenerId, PointChangeEvent};
use self::events::PointListeners;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointState {
    /// Straight or primary route
    #[default]
    Normal,
    /// Diverging route
    Reverse,
}

impl std::ops::Not for PointState {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::Normal => Self::Reverse,
            Self::Reverse => Self::Normal,
        }
    }
}

/// The two edges a point chooses between, and the node where they meet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointRoutes {
    pub normal_edge_id: String,
    pub reverse_edge_id: String,
    pub common_node_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointData {
    pub piece_id: String,
    /// Logical state, the only thing routing reads
    pub state: PointState,
    pub routes: PointRoutes,
    pub is_animating: bool,
    /// Visual progress of the blades towards `state`, 0 to 1
    pub animation_progress: f64,
    pub label: String,
}

#[derive(Debug, Default)]
pub struct PointsManager {
    points: HashMap<String, PointData>,
    listeners: PointListeners,
    /// The next number used in point labels
    label_gen: usize,
    config: TrackConfig,
}

impl PointsManager {
    pub fn new(config: TrackConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Registers every switch type piece of the track system. Returns how many points
    /// were newly registered.
    pub fn initialize(&mut self, track_system: &impl TrackSystem) -> usize {
        let graph = track_system.graph();
        track_system
            .all_pieces()
            .into_iter()
            .filter(|piece| piece.piece_type().is_switch_capable())
            .filter(|piece| self.register_point(piece, graph))
            .count()
    }

    /// Starts tracking `piece` as a point in the normal state. Returns false if it was
    /// already registered or its routes couldn't be determined.
    pub fn register_point(&mut self, piece: &TrackPiece, graph: &TrackGraph) -> bool {
        if self.points.contains_key(&piece.id) {
            return false;
        }
        let Some(routes) = Self::determine_routes(piece, graph) else {
            return false;
        };
        self.label_gen += 1;
        let point = PointData {
            piece_id: piece.id.clone(),
            state: PointState::Normal,
            routes,
            is_animating: false,
            animation_progress: 1.,
            label: format!("P{}", self.label_gen),
        };
        debug!(piece_id = %piece.id, label = %point.label, "Registered point");
        self.points.insert(piece.id.clone(), point);
        true
    }

    /// Works out which generated edge is the normal route and which the reverse one.
    ///
    /// A plain switch's straight edge is normal. A curved switch generates its inner route
    /// first and its outer one second; the outer is normal. Anything else falls back to
    /// the first two edges in generation order.
    pub fn determine_routes(piece: &TrackPiece, graph: &TrackGraph) -> Option<PointRoutes> {
        let Some(common_node_id) = piece
            .connector(COMMON_CONNECTOR)
            .and_then(|c| c.node_id.clone())
        else {
            error!(piece_id = %piece.id, "Switch piece has no connected COMMON connector");
            return None;
        };

        let edges: Vec<&GraphEdge> = piece
            .generated_edge_ids
            .iter()
            .filter_map(|id| graph.get_edge(id))
            .collect();
        if edges.len() < 2 {
            error!(
                piece_id = %piece.id,
                edges = edges.len(),
                "Switch piece needs at least two generated edges"
            );
            return None;
        }

        let (normal, reverse) = match piece.piece_type() {
            PieceType::Switch => {
                let normal = edges.iter().find(|e| e.curve.is_straight());
                let reverse = normal.and_then(|n| edges.iter().find(|e| e.id != n.id));
                (normal, reverse)
            }
            PieceType::CurvedSwitch => (edges.get(1), edges.first()),
            _ => (None, None),
        };
        let (normal, reverse) = match (normal, reverse) {
            (Some(normal), Some(reverse)) => (*normal, *reverse),
            _ => (edges[0], edges[1]),
        };

        if !normal.touches(&common_node_id) || !reverse.touches(&common_node_id) {
            warn!(
                piece_id = %piece.id,
                common_node_id = %common_node_id,
                "Point routes don't both start at the common node"
            );
        }

        Some(PointRoutes {
            normal_edge_id: normal.id.clone(),
            reverse_edge_id: reverse.id.clone(),
            common_node_id,
        })
    }

    pub fn unregister_point(&mut self, piece_id: &str) -> Option<PointData> {
        self.points.remove(piece_id)
    }

    pub fn is_point(&self, piece_id: &str) -> bool {
        self.points.contains_key(piece_id)
    }

    pub fn get_point(&self, piece_id: &str) -> Option<&PointData> {
        self.points.get(piece_id)
    }

    pub fn get_point_state(&self, piece_id: &str) -> Option<PointState> {
        self.points.get(piece_id).map(|p| p.state)
    }

    /// All registered points ordered by piece id.
    pub fn points(&self) -> Vec<&PointData> {
        let mut points: Vec<_> = self.points.values().collect();
        points.sort_by(|a, b| a.piece_id.cmp(&b.piece_id));
        points
    }

    /// Changes the logical state of a point. Routing follows immediately; the blade
    /// animation catches up over the following ticks. Returns whether anything changed.
    pub fn set_point_state(&mut self, piece_id: &str, state: PointState, user_initiated: bool) -> bool {
        let Some(point) = self.points.get_mut(piece_id) else {
            warn!(piece_id, "Cannot set state of unknown point");
            return false;
        };
        if point.state == state {
            return false;
        }
        let previous_state = point.state;
        point.state = state;
        // Reversing mid-throw continues from where the blades currently are.
        point.animation_progress = if point.is_animating {
            1. - point.animation_progress
        } else {
            0.
        };
        point.is_animating = true;
        debug!(piece_id, ?previous_state, new_state = ?state, user_initiated, "Point changed");

        self.listeners.notify(&PointChangeEvent {
            piece_id: piece_id.to_string(),
            previous_state,
            new_state: state,
            user_initiated,
        });
        true
    }

    pub fn toggle_point(&mut self, piece_id: &str, user_initiated: bool) -> Option<PointState> {
        let new_state = !self.get_point_state(piece_id)?;
        self.set_point_state(piece_id, new_state, user_initiated);
        Some(new_state)
    }

    /// Advances blade animations by `dt_secs` of host time.
    pub fn tick(&mut self, dt_secs: f64) {
        let step = dt_secs / self.config.point_animation_secs;
        for point in self.points.values_mut().filter(|p| p.is_animating) {
            point.animation_progress += step;
            if 1. <= point.animation_progress {
                point.animation_progress = 1.;
                point.is_animating = false;
            }
        }
    }

    /// The edge a train should take when reaching `node_id` on `from_edge_id`, as far as
    /// the point on `piece_id` decides it.
    ///
    /// Only a train facing the point, i.e. arriving at the common node from outside the
    /// switch, has a choice; it gets the edge of the current state. Every other case
    /// returns `None` and the caller follows the graph.
    pub fn get_route_for_piece(&self, piece_id: &str, from_edge_id: &str, node_id: &str) -> Option<&str> {
        let point = self.points.get(piece_id)?;
        let routes = &point.routes;
        if node_id != routes.common_node_id {
            return None;
        }
        if from_edge_id == routes.normal_edge_id || from_edge_id == routes.reverse_edge_id {
            return None;
        }
        Some(match point.state {
            PointState::Normal => &routes.normal_edge_id,
            PointState::Reverse => &routes.reverse_edge_id,
        })
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&PointChangeEvent) + 'static) -> ListenerId {
        self.listeners.subscribe(Box::new(listener))
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }
}

impl SwitchRouter for PointsManager {
    fn route_for_piece(&self, piece_id: &str, from_edge_id: &str, node_id: &str) -> Option<&str> {
        self.get_route_for_piece(piece_id, from_edge_id, node_id)
    }
}
