//! Circular arc math in the horizontal plane.
//!
//! Angles are headings measured around the Y axis: heading `a` points along
//! `(sin a, 0, cos a)`, so heading 0 faces +Z and increasing the heading turns
//! counter-clockwise seen from above, which is a left turn for a vehicle.
//! Every consumer of arc geometry (graph edges, the path helper, train followers,
//! piece generation) goes through this module so they never disagree.

use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::vec3::Vec3;

/// Which way an arc turns, seen in the direction of travel from its start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum ArcDirection {
    /// Counter-clockwise seen from above, serialized as `1`.
    Left,
    /// Clockwise seen from above, serialized as `-1`.
    Right,
}

impl ArcDirection {
    pub fn signum(&self) -> f64 {
        match self {
            Self::Left => 1.,
            Self::Right => -1.,
        }
    }
}

impl std::ops::Not for ArcDirection {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl From<ArcDirection> for i8 {
    fn from(dir: ArcDirection) -> Self {
        match dir {
            ArcDirection::Left => 1,
            ArcDirection::Right => -1,
        }
    }
}

impl TryFrom<i8> for ArcDirection {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Left),
            -1 => Ok(Self::Right),
            _ => Err(format!("arc direction must be 1 or -1, got {value}")),
        }
    }
}

/// Circle arc found from a pair of endpoints and tangents.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArcDefinition {
    pub center: Vec3,
    pub radius: f64,
    /// Heading of the radius vector from the center to the arc start
    pub start_angle: f64,
    /// Heading of the radius vector from the center to the arc end
    pub end_angle: f64,
    pub clockwise: bool,
}

impl ArcDefinition {
    /// End angle adjusted so that walking from `start_angle` to it goes the arc's way around.
    pub fn unwrapped_end_angle(&self) -> f64 {
        let mut end = self.end_angle;
        if self.clockwise && self.start_angle < end {
            end -= TAU;
        } else if !self.clockwise && end < self.start_angle {
            end += TAU;
        }
        end
    }

    /// Signed angle swept from start to end. Negative when clockwise.
    pub fn sweep(&self) -> f64 {
        self.unwrapped_end_angle() - self.start_angle
    }

    pub fn point_at_angle(&self, angle: f64) -> Vec3 {
        self.center + heading_to_vector(angle) * self.radius
    }
}

pub fn heading_to_vector(heading: f64) -> Vec3 {
    Vec3::new(heading.sin(), 0., heading.cos())
}

/// Heading of the horizontal part of `v`.
pub fn vector_heading(v: Vec3) -> f64 {
    v.x.atan2(v.z)
}

/// Finds the circle of the given radius that leaves `start` along `start_tangent` and
/// passes through `end`.
///
/// The two candidates are the centers offset from `start` by `radius` to the left and
/// to the right of the tangent. `end_tangent` is the direction of travel at `end` and only
/// breaks the tie when both candidates fit. Returns `None` if neither circle passes
/// through `end` within `tolerance_m`, which is usually
/// [`TrackConfig::arc_tolerance_m`](crate::config::TrackConfig::arc_tolerance_m).
pub fn calculate_arc_center(
    start: Vec3,
    start_tangent: Vec3,
    end: Vec3,
    end_tangent: Vec3,
    radius: f64,
    tolerance_m: f64,
) -> Option<ArcDefinition> {
    let left = start_tangent.flat().normalized().left90();
    let candidates = [
        (start + left * radius, false),
        (start - left * radius, true),
    ];

    let fits = |center: Vec3| (end.distance_xz(center) - radius).abs() < tolerance_m;
    let make = |center: Vec3, clockwise: bool| ArcDefinition {
        center,
        radius,
        start_angle: vector_heading(start - center),
        end_angle: vector_heading(end - center),
        clockwise,
    };

    match (fits(candidates[0].0), fits(candidates[1].0)) {
        (true, false) => Some(make(candidates[0].0, false)),
        (false, true) => Some(make(candidates[1].0, true)),
        (true, true) => {
            let arcs = candidates.map(|(center, clockwise)| make(center, clockwise));
            let alignment = |arc: &ArcDefinition| {
                get_tangent_at_angle(arc, arc.end_angle).dot(end_tangent.flat().normalized())
            };
            if alignment(&arcs[1]) > alignment(&arcs[0]) {
                Some(arcs[1])
            } else {
                Some(arcs[0])
            }
        }
        (false, false) => {
            error!(
                start = %start,
                end = %end,
                radius,
                left_distance = end.distance_xz(candidates[0].0),
                right_distance = end.distance_xz(candidates[1].0),
                "No arc center puts the end point on the circle"
            );
            None
        }
    }
}

/// Samples `num_points + 1` points spaced evenly by angle, both ends included.
pub fn generate_arc_points(arc: &ArcDefinition, num_points: usize) -> Vec<Vec3> {
    if num_points == 0 {
        return vec![arc.point_at_angle(arc.start_angle)];
    }
    let end = arc.unwrapped_end_angle();
    (0..=num_points)
        .map(|i| {
            let f = i as f64 / num_points as f64;
            arc.point_at_angle(arc.start_angle * (1. - f) + end * f)
        })
        .collect()
}

/// Unit direction of travel at `angle` on the arc.
pub fn get_tangent_at_angle(arc: &ArcDefinition, angle: f64) -> Vec3 {
    let ccw = Vec3::new(angle.cos(), 0., -angle.sin());
    if arc.clockwise { -ccw } else { ccw }
}

pub fn calculate_arc_length(radius: f64, angle_deg: f64) -> f64 {
    radius * angle_deg.to_radians().abs()
}

/// Walks an arc of `radius` and `angle_deg` from `start`, heading `heading`.
/// Returns the end point and the heading of travel there. Height is kept from `start`.
pub fn arc_end_point(
    start: Vec3,
    heading: f64,
    radius: f64,
    angle_deg: f64,
    direction: ArcDirection,
) -> (Vec3, f64) {
    let sign = direction.signum();
    let turn = sign * angle_deg.to_radians().abs();
    let center = start + heading_to_vector(heading).left90() * (radius * sign);
    let start_angle = vector_heading(start - center);
    let end = center + heading_to_vector(start_angle + turn) * radius;
    (Vec3::new(end.x, start.y, end.z), wrap_angle(heading + turn))
}

/// The arc of a graph edge, derived from the edge's two endpoints and its curve
/// parameters. This is the only arc parametrization used for edges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeArc {
    /// Center on the horizontal plane (y = 0)
    pub center: Vec3,
    pub radius: f64,
    /// Heading of the radius vector at t = 0
    pub start_angle: f64,
    /// Signed sweep from t = 0 to t = 1. Positive turns left.
    pub sweep: f64,
}

impl EdgeArc {
    /// Finds the center from the chord between `from` and `to`: it sits on the chord's
    /// perpendicular bisector on the turning side, `sqrt(r^2 - (c/2)^2)` from the midpoint,
    /// and crosses to the other side once the arc spans more than half a circle.
    ///
    /// Returns `None` on degenerate input (coincident endpoints, non-positive radius, or a
    /// chord longer than the diameter by more than `tolerance`).
    pub fn from_chord(
        from: Vec3,
        to: Vec3,
        radius: f64,
        angle_deg: f64,
        direction: ArcDirection,
        tolerance: f64,
    ) -> Option<Self> {
        let chord = (to - from).flat();
        let chord_len = chord.length();
        if !(0. < radius) || chord_len < 1e-9 {
            warn!(
                from = %from,
                to = %to,
                radius,
                chord_len,
                "Degenerate arc edge, treating it as straight"
            );
            return None;
        }
        let half = chord_len * 0.5;
        if radius + tolerance < half {
            error!(
                from = %from,
                to = %to,
                radius,
                chord_len,
                "Arc chord is longer than its diameter"
            );
            return None;
        }

        let offset = (radius * radius - half * half).max(0.).sqrt();
        let offset = if PI < angle_deg.to_radians().abs() {
            -offset
        } else {
            offset
        };
        let side = chord.normalized().left90() * direction.signum();
        let center = from.flat() + chord * 0.5 + side * offset;

        let start_angle = vector_heading(from - center);
        let end_angle = vector_heading(to - center);
        let sweep = match direction {
            ArcDirection::Left => (end_angle - start_angle).rem_euclid(TAU),
            ArcDirection::Right => -(start_angle - end_angle).rem_euclid(TAU),
        };

        let declared = angle_deg.to_radians().abs();
        if 1e-3 < (sweep.abs() - declared).abs() {
            debug!(
                declared_deg = angle_deg,
                measured_deg = sweep.abs().to_degrees(),
                "Arc edge angle disagrees with its endpoints, using the endpoints"
            );
        }

        Some(Self {
            center,
            radius,
            start_angle,
            sweep,
        })
    }

    pub fn angle_at(&self, t: f64) -> f64 {
        self.start_angle + self.sweep * t
    }

    /// Point on the horizontal plane (y = 0) at parameter `t`.
    pub fn point_at(&self, t: f64) -> Vec3 {
        self.center + heading_to_vector(self.angle_at(t)) * self.radius
    }

    /// Unit tangent in the direction of increasing `t`.
    pub fn tangent_at(&self, t: f64) -> Vec3 {
        get_tangent_at_angle(&self.to_arc_definition(), self.angle_at(t))
    }

    pub fn length(&self) -> f64 {
        self.radius * self.sweep.abs()
    }

    pub fn to_arc_definition(&self) -> ArcDefinition {
        ArcDefinition {
            center: self.center,
            radius: self.radius,
            start_angle: self.start_angle,
            end_angle: self.start_angle + self.sweep,
            clockwise: self.sweep < 0.,
        }
    }
}

pub fn wrap_angle(x: f64) -> f64 {
    wrap_angle_offset(x, PI)
}

pub fn wrap_angle_offset(x: f64, offset: f64) -> f64 {
    x - (x + offset).div_euclid(TAU) * TAU
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn assert_vec_eq(a: Vec3, b: Vec3) {
        assert_relative_eq!(a.x, b.x, epsilon = 1e-9);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-9);
        assert_relative_eq!(a.z, b.z, epsilon = 1e-9);
    }

    #[test]
    fn half_circle_of_unit_radius_is_pi() {
        assert_relative_eq!(calculate_arc_length(1., 180.), PI, epsilon = 1e-6);
        assert_relative_eq!(calculate_arc_length(2., -90.), PI, epsilon = 1e-6);
    }

    #[test]
    fn quarter_left_turn_end_point() {
        let (end, heading) = arc_end_point(Vec3::zero(), 0., 0.5, 90., ArcDirection::Left);
        assert_vec_eq(end, Vec3::new(0.5, 0., 0.5));
        assert_relative_eq!(heading, FRAC_PI_2, epsilon = 1e-12);

        let (end, heading) = arc_end_point(Vec3::zero(), 0., 0.5, 90., ArcDirection::Right);
        assert_vec_eq(end, Vec3::new(-0.5, 0., 0.5));
        assert_relative_eq!(heading, -FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn arc_center_picks_the_side_the_end_lies_on() {
        let arc = calculate_arc_center(
            Vec3::zero(),
            Vec3::FORWARD,
            Vec3::new(-0.5, 0., 0.5),
            Vec3::new(-1., 0., 0.),
            0.5,
            1e-3,
        )
        .unwrap();
        assert!(arc.clockwise);
        assert_vec_eq(arc.center, Vec3::new(-0.5, 0., 0.));
        assert_relative_eq!(arc.sweep(), -FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn arc_center_rejects_inconsistent_input() {
        let arc = calculate_arc_center(
            Vec3::zero(),
            Vec3::FORWARD,
            Vec3::new(3., 0., 3.),
            Vec3::FORWARD,
            0.5,
            1e-3,
        );
        assert!(arc.is_none());
    }

    #[test]
    fn arc_center_honours_tolerance() {
        // End point two millimeters off the circle
        let end = Vec3::new(-0.5, 0., 0.502);
        let center = |tolerance_m| {
            calculate_arc_center(
                Vec3::zero(),
                Vec3::FORWARD,
                end,
                Vec3::new(-1., 0., 0.),
                0.5,
                tolerance_m,
            )
        };
        assert!(center(1e-3).is_none());
        assert!(center(5e-3).unwrap().clockwise);
    }

    #[test]
    fn arc_points_wrap_around_the_seam() {
        // Start heading just below +PI, ending just past it going counter-clockwise.
        let arc = ArcDefinition {
            center: Vec3::zero(),
            radius: 1.,
            start_angle: PI - 0.1,
            end_angle: -PI + 0.1,
            clockwise: false,
        };
        assert_relative_eq!(arc.sweep(), 0.2, epsilon = 1e-12);
        let points = generate_arc_points(&arc, 4);
        assert_eq!(points.len(), 5);
        assert_vec_eq(points[2], Vec3::new(0., 0., -1.));

        let cw = ArcDefinition {
            start_angle: -PI + 0.1,
            end_angle: PI - 0.1,
            clockwise: true,
            ..arc
        };
        assert_relative_eq!(cw.sweep(), -0.2, epsilon = 1e-12);
        assert_vec_eq(generate_arc_points(&cw, 2)[1], Vec3::new(0., 0., -1.));
    }

    #[test]
    fn tangent_follows_direction_of_travel() {
        let arc = ArcDefinition {
            center: Vec3::new(0.5, 0., 0.),
            radius: 0.5,
            start_angle: -FRAC_PI_2,
            end_angle: 0.,
            clockwise: false,
        };
        assert_vec_eq(get_tangent_at_angle(&arc, -FRAC_PI_2), Vec3::FORWARD);
        assert_vec_eq(get_tangent_at_angle(&arc, 0.), Vec3::new(1., 0., 0.));
    }

    /// The chord construction used for edges, the tangent construction and the
    /// arc walk used by piece generation must describe the same circle.
    #[test]
    fn arc_constructions_agree() {
        for (heading, radius, angle, direction) in [
            (0., 0.5, 90., ArcDirection::Left),
            (0.3, 1.2, 30., ArcDirection::Right),
            (-2.5, 0.8, 200., ArcDirection::Left),
            (3.0, 0.4, 135., ArcDirection::Right),
        ] {
            let start = Vec3::new(1., 0., -2.);
            let (end, end_heading) = arc_end_point(start, heading, radius, angle, direction);

            let edge_arc = EdgeArc::from_chord(start, end, radius, angle, direction, 1e-3).unwrap();
            let tangent_arc = calculate_arc_center(
                start,
                heading_to_vector(heading),
                end,
                heading_to_vector(end_heading),
                radius,
                1e-3,
            )
            .unwrap();

            assert_vec_eq(edge_arc.center, tangent_arc.center);
            assert_relative_eq!(edge_arc.sweep, tangent_arc.sweep(), epsilon = 1e-9);
            assert_relative_eq!(
                edge_arc.length(),
                calculate_arc_length(radius, angle),
                epsilon = 1e-9
            );
            assert_vec_eq(edge_arc.tangent_at(0.), heading_to_vector(heading));
            assert_vec_eq(edge_arc.tangent_at(1.), heading_to_vector(end_heading));

            let sampled = generate_arc_points(&tangent_arc, 8);
            for (i, p) in sampled.iter().enumerate() {
                assert_vec_eq(edge_arc.point_at(i as f64 / 8.), *p);
            }
        }
    }

    #[test]
    fn chord_longer_than_diameter_is_rejected() {
        let arc = EdgeArc::from_chord(
            Vec3::zero(),
            Vec3::new(0., 0., 3.),
            1.,
            90.,
            ArcDirection::Left,
            1e-3,
        );
        assert!(arc.is_none());
    }

    #[test]
    fn direction_serializes_as_sign() {
        assert_eq!(serde_json::to_string(&ArcDirection::Right).unwrap(), "-1");
        let dir: ArcDirection = serde_json::from_str("1").unwrap();
        assert_eq!(dir, ArcDirection::Left);
        assert!(serde_json::from_str::<ArcDirection>("2").is_err());
    }
}
