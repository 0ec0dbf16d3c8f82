//! Read-only queries of positions and poses along the track graph.

use cgmath::{Matrix3, Quaternion};
use ordered_float::OrderedFloat;
use serde::Serialize;
use tracing::warn;

use crate::{
    config::TrackConfig,
    track_graph::{EdgeGeometry, TrackGraph},
    vec3::Vec3,
};

/// Position and full orientation basis at a point on an edge, facing increasing `t`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrackPose {
    pub position: Vec3,
    /// Horizontal unit direction of travel
    pub forward: Vec3,
    /// `up x forward`
    pub right: Vec3,
    pub up: Vec3,
    #[serde(skip)]
    pub rotation: Quaternion<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosestPointResult {
    pub edge_id: String,
    pub t: f64,
    pub position: Vec3,
    pub distance: f64,
    pub pose: TrackPose,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeMove {
    pub new_t: f64,
    /// Distance left over past the end of the edge, with the sign of the request
    pub remaining_m: f64,
    pub reached_end: bool,
}

pub struct TrackPathHelper<'a> {
    graph: &'a TrackGraph,
    config: TrackConfig,
}

impl<'a> TrackPathHelper<'a> {
    pub fn new(graph: &'a TrackGraph) -> Self {
        Self::with_config(graph, TrackConfig::default())
    }

    pub fn with_config(graph: &'a TrackGraph, config: TrackConfig) -> Self {
        Self { graph, config }
    }

    fn geometry(&self, edge_id: &str) -> Option<EdgeGeometry> {
        let geometry = self.graph.edge_geometry(edge_id, self.config.arc_tolerance_m);
        if geometry.is_none() {
            warn!(edge_id, "Edge or one of its nodes not found");
        }
        geometry
    }

    pub fn get_pose_on_edge(&self, edge_id: &str, t: f64) -> Option<TrackPose> {
        let geometry = self.geometry(edge_id)?;
        Some(pose_from_geometry(&geometry, t))
    }

    /// Nearest point of one edge to `world_pos`.
    ///
    /// A coarse pass samples the edge uniformly, then a finer pass searches one coarse
    /// step either side of the best sample. Good enough for picking and placement; no
    /// closed form projection is attempted.
    pub fn find_closest_point_on_edge(
        &self,
        edge_id: &str,
        world_pos: Vec3,
    ) -> Option<ClosestPointResult> {
        let geometry = self.geometry(edge_id)?;
        let samples = self.config.closest_point_samples.max(1);
        let refine_steps = self.config.closest_point_refine_steps.max(1);
        let dist_at = |t: f64| geometry.point_at(t).distance(world_pos);

        let coarse = nearest_t((0..=samples).map(|i| i as f64 / samples as f64), &dist_at);

        let step = 1. / samples as f64;
        let lo = (coarse - step).max(0.);
        let hi = (coarse + step).min(1.);
        let t = nearest_t(
            (0..=refine_steps)
                .map(|i| lo + (hi - lo) * i as f64 / refine_steps as f64)
                .chain(std::iter::once(coarse)),
            &dist_at,
        );

        let pose = pose_from_geometry(&geometry, t);
        Some(ClosestPointResult {
            edge_id: edge_id.to_string(),
            t,
            position: pose.position,
            distance: pose.position.distance(world_pos),
            pose,
        })
    }

    /// Nearest point over every edge except `exclude_edges`, optionally limited to
    /// `max_distance`. Scans all edges.
    pub fn find_closest_point(
        &self,
        world_pos: Vec3,
        max_distance: Option<f64>,
        exclude_edges: &[&str],
    ) -> Option<ClosestPointResult> {
        self.graph
            .edges()
            .filter(|edge| !exclude_edges.contains(&edge.id.as_str()))
            .filter_map(|edge| self.find_closest_point_on_edge(&edge.id, world_pos))
            .filter(|res| max_distance.is_none_or(|max| res.distance <= max))
            .min_by_key(|res| OrderedFloat(res.distance))
    }

    /// Advances `distance_m` from `start_t` within a single edge, clamping at its ends.
    pub fn move_along_edge(&self, edge_id: &str, start_t: f64, distance_m: f64) -> Option<EdgeMove> {
        let Some(edge) = self.graph.get_edge(edge_id) else {
            warn!(edge_id, "Cannot move along unknown edge");
            return None;
        };
        if edge.length_m <= 0. {
            return Some(EdgeMove {
                new_t: start_t.clamp(0., 1.),
                remaining_m: distance_m,
                reached_end: true,
            });
        }
        let new_t = start_t + distance_m / edge.length_m;
        Some(if 1. < new_t {
            EdgeMove {
                new_t: 1.,
                remaining_m: (new_t - 1.) * edge.length_m,
                reached_end: true,
            }
        } else if new_t < 0. {
            EdgeMove {
                new_t: 0.,
                remaining_m: new_t * edge.length_m,
                reached_end: true,
            }
        } else {
            EdgeMove {
                new_t,
                remaining_m: 0.,
                reached_end: false,
            }
        })
    }

    /// Track distance between two parameters on the same edge.
    pub fn distance_between(&self, edge_id: &str, t1: f64, t2: f64) -> Option<f64> {
        let edge = self.graph.get_edge(edge_id)?;
        Some((t2 - t1).abs() * edge.length_m)
    }

    /// Point `lateral_m` off the track centerline along the pose's `right` vector.
    pub fn offset_position(&self, edge_id: &str, t: f64, lateral_m: f64) -> Option<Vec3> {
        let pose = self.get_pose_on_edge(edge_id, t)?;
        Some(pose.position + pose.right * lateral_m)
    }
}

fn nearest_t(ts: impl Iterator<Item = f64>, dist_at: impl Fn(f64) -> f64) -> f64 {
    ts.min_by_key(|&t| OrderedFloat(dist_at(t))).unwrap_or(0.)
}

fn pose_from_geometry(geometry: &EdgeGeometry, t: f64) -> TrackPose {
    let position = geometry.point_at(t);
    let forward = geometry.tangent_at(t).flat().normalized();
    let up = Vec3::UP;
    let right = up.cross(forward);
    let rotation = Quaternion::from(Matrix3::from_cols(
        right.to_vector3(),
        up.to_vector3(),
        forward.to_vector3(),
    ));
    TrackPose {
        position,
        forward,
        right,
        up,
        rotation,
    }
}
