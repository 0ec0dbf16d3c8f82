mod transition;

use cgmath::{Quaternion, Rad, Rotation3};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    arc_geometry::vector_heading,
    config::TrackConfig,
    track_graph::TrackGraph,
    vec3::Vec3,
};

/// Decides which edge a follower takes at a junction owned by a piece.
pub trait SwitchRouter {
    /// The edge to take when arriving at `node_id` on `from_edge_id`, if `piece_id`
    /// has a say in it.
    fn route_for_piece(&self, piece_id: &str, from_edge_id: &str, node_id: &str) -> Option<&str>;
}

/// No switches: every junction takes its first candidate.
impl SwitchRouter for () {
    fn route_for_piece(&self, _: &str, _: &str, _: &str) -> Option<&str> {
        None
    }
}

/// Which way along the edge's stored direction a follower faces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum EdgeDirection {
    /// Towards `to_node_id`, serialized as `1`.
    #[default]
    Forward,
    /// Towards `from_node_id`, serialized as `-1`.
    Backward,
}

impl EdgeDirection {
    pub fn signum(&self) -> f64 {
        match self {
            Self::Forward => 1.,
            Self::Backward => -1.,
        }
    }
}

impl std::ops::Not for EdgeDirection {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

impl From<EdgeDirection> for i8 {
    fn from(dir: EdgeDirection) -> Self {
        match dir {
            EdgeDirection::Forward => 1,
            EdgeDirection::Backward => -1,
        }
    }
}

impl TryFrom<i8> for EdgeDirection {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Forward),
            -1 => Ok(Self::Backward),
            _ => Err(format!("edge direction must be 1 or -1, got {value}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPosition {
    pub edge_id: String,
    /// Parameter along the edge, 0 at `from_node_id`
    pub t: f64,
    pub edge_direction: EdgeDirection,
}

/// Yaw-only pose of a vehicle. `position.y` is always the rail height and `forward`
/// is always horizontal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldPose {
    pub position: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub rotation: Quaternion<f64>,
}

impl WorldPose {
    fn facing(position: Vec3, forward: Vec3) -> Self {
        Self {
            position,
            forward,
            right: Vec3::UP.cross(forward),
            rotation: Quaternion::from_angle_y(Rad(vector_heading(forward))),
        }
    }
}

impl Default for WorldPose {
    fn default() -> Self {
        Self::facing(Vec3::zero(), Vec3::FORWARD)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MovementResult {
    /// `None` when the follower isn't on the track
    pub track_position: Option<TrackPosition>,
    pub world_pose: WorldPose,
    pub edge_changed: bool,
    pub reached_dead_end: bool,
    /// Edges left behind during the move, in order
    pub traversed_edges: Vec<String>,
}

/// Moves a single vehicle along the track graph, following switches at junctions.
///
/// The follower doesn't hold on to the graph; every call that needs it borrows it, so
/// any number of followers can share one graph and one router.
#[derive(Clone, Debug, Default)]
pub struct TrainPathFollower {
    position: Option<TrackPosition>,
    pose: WorldPose,
    config: TrackConfig,
}

impl TrainPathFollower {
    pub fn new(config: TrackConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Puts the follower on `edge_id` at `t`, clamped to the edge.
    pub fn place_on_edge(
        &mut self,
        graph: &TrackGraph,
        edge_id: &str,
        t: f64,
        edge_direction: EdgeDirection,
    ) -> bool {
        if graph.get_edge(edge_id).is_none() {
            warn!(edge_id, "Cannot place on unknown edge");
            return false;
        }
        self.set_position(
            graph,
            TrackPosition {
                edge_id: edge_id.to_string(),
                t: t.clamp(0., 1.),
                edge_direction,
            },
        );
        true
    }

    /// Puts the follower exactly on `node_id`, facing away from it along
    /// `preferred_edge_id` if that edge touches the node, or else along the first
    /// connected edge.
    pub fn place_at_node(
        &mut self,
        graph: &TrackGraph,
        node_id: &str,
        preferred_edge_id: Option<&str>,
    ) -> bool {
        if graph.get_node(node_id).is_none() {
            warn!(node_id, "Cannot place on unknown node");
            return false;
        }
        let edges = graph.get_edges_connected_to_node(node_id);
        let Some(edge) = preferred_edge_id
            .and_then(|preferred| edges.iter().find(|e| e.id == preferred))
            .or_else(|| edges.first())
        else {
            warn!(node_id, "Cannot place on a node without edges");
            return false;
        };
        let (t, edge_direction) = if edge.from_node_id == node_id {
            (0., EdgeDirection::Forward)
        } else {
            (1., EdgeDirection::Backward)
        };
        let position = TrackPosition {
            edge_id: edge.id.clone(),
            t,
            edge_direction,
        };
        self.set_position(graph, position);
        true
    }

    /// Moves `distance_m` along the track, forwards in the facing direction when
    /// positive and backwards when negative, crossing onto connected edges as needed.
    pub fn move_by(
        &mut self,
        graph: &TrackGraph,
        router: &impl SwitchRouter,
        distance_m: f64,
    ) -> MovementResult {
        let Some(start) = self.position.clone() else {
            return MovementResult {
                track_position: None,
                world_pose: self.pose,
                edge_changed: false,
                reached_dead_end: true,
                traversed_edges: vec![],
            };
        };

        let backwards = distance_m < 0.;
        let mut direction = if backwards {
            !start.edge_direction
        } else {
            start.edge_direction
        };
        let mut edge_id = start.edge_id;
        let mut t = start.t;
        let mut remaining = distance_m.abs();
        let mut edge_changed = false;
        let mut reached_dead_end = false;
        let mut traversed_edges = vec![];

        let mut iterations = 0;
        while 0. < remaining {
            if self.config.max_move_iterations <= iterations {
                warn!(
                    edge_id = %edge_id,
                    remaining_m = remaining,
                    iterations,
                    "Move stopped by the iteration limit"
                );
                break;
            }
            iterations += 1;

            let Some(edge) = graph.get_edge(&edge_id) else {
                warn!(edge_id = %edge_id, "Follower is on an edge that no longer exists");
                reached_dead_end = true;
                break;
            };
            let boundary_t = match direction {
                EdgeDirection::Forward => 1.,
                EdgeDirection::Backward => 0.,
            };
            let to_boundary = (boundary_t - t).abs() * edge.length_m;
            if remaining <= to_boundary {
                t += direction.signum() * remaining / edge.length_m;
                break;
            }

            remaining -= to_boundary;
            t = boundary_t;
            let node_id = match direction {
                EdgeDirection::Forward => &edge.to_node_id,
                EdgeDirection::Backward => &edge.from_node_id,
            };
            let Some(entry) = transition::next_edge(graph, router, edge, node_id) else {
                reached_dead_end = true;
                break;
            };
            traversed_edges.push(std::mem::replace(&mut edge_id, entry.edge_id));
            t = entry.t;
            direction = entry.direction;
            edge_changed = true;
        }

        let position = TrackPosition {
            edge_id,
            t: t.clamp(0., 1.),
            edge_direction: if backwards { !direction } else { direction },
        };
        self.set_position(graph, position);

        MovementResult {
            track_position: self.position.clone(),
            world_pose: self.pose,
            edge_changed,
            reached_dead_end,
            traversed_edges,
        }
    }

    /// Turns the follower around in place.
    pub fn reverse_direction(&mut self) {
        if let Some(position) = &mut self.position {
            position.edge_direction = !position.edge_direction;
            self.pose = WorldPose::facing(self.pose.position, -self.pose.forward);
        }
    }

    pub fn get_track_position(&self) -> Option<&TrackPosition> {
        self.position.as_ref()
    }

    /// The pose computed by the last placement or move.
    pub fn world_pose(&self) -> &WorldPose {
        &self.pose
    }

    pub fn current_edge_id(&self) -> Option<&str> {
        self.position.as_ref().map(|p| p.edge_id.as_str())
    }

    pub fn is_placed(&self) -> bool {
        self.position.is_some()
    }

    pub fn unplace(&mut self) {
        self.position = None;
        self.pose = WorldPose::default();
    }

    fn set_position(&mut self, graph: &TrackGraph, position: TrackPosition) {
        if let Some(pose) = self.compute_pose(graph, &position) {
            self.pose = pose;
        }
        self.position = Some(position);
    }

    /// The pose is computed in the horizontal plane and pinned to the rail height, so
    /// vehicles never pitch or roll whatever the node heights are.
    fn compute_pose(&self, graph: &TrackGraph, position: &TrackPosition) -> Option<WorldPose> {
        let geometry = graph.edge_geometry(&position.edge_id, self.config.arc_tolerance_m)?;
        let p = geometry.point_at(position.t);
        let forward = geometry.tangent_at(position.t).flat().normalized()
            * position.edge_direction.signum();
        Some(WorldPose::facing(
            Vec3::new(p.x, self.config.rail_height_m, p.z),
            forward,
        ))
    }
}
