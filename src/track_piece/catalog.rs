//! Catalog templates that pieces are instantiated from.

use serde::{Deserialize, Serialize};

use crate::{
    arc_geometry::{ArcDirection, arc_end_point, calculate_arc_length, heading_to_vector},
    track_graph::CurveDefinition,
    vec3::Vec3,
};

/// Name of the stem connector of a switch, where both routes meet.
pub const COMMON_CONNECTOR: &str = "COMMON";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceType {
    Straight,
    Curve,
    Switch,
    CurvedSwitch,
    /// Any other kind of piece the catalog may define
    #[serde(other)]
    Other,
}

impl PieceType {
    /// Types whose routes are chosen by a point.
    pub fn is_switch_capable(&self) -> bool {
        matches!(self, Self::Switch | Self::CurvedSwitch)
    }
}

/// Connector position and outward facing direction in the piece's local frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorTemplate {
    pub id: String,
    pub local_pos: Vec3,
    pub local_forward: Vec3,
}

/// A drivable route between two connectors. Each route becomes one graph edge,
/// stored from `from` to `to`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTemplate {
    pub from: String,
    pub to: String,
    pub curve: CurveDefinition,
    pub length_m: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub piece_type: PieceType,
    pub connector_templates: Vec<ConnectorTemplate>,
    /// Generation order matters: curved switches list the inner route first.
    #[serde(default)]
    pub routes: Vec<RouteTemplate>,
}

/// Local pieces start at the origin heading +Z; the start connector faces backwards.
fn start_connector(id: &str) -> ConnectorTemplate {
    ConnectorTemplate {
        id: id.to_string(),
        local_pos: Vec3::zero(),
        local_forward: -Vec3::FORWARD,
    }
}

fn arc_connector(id: &str, radius_m: f64, angle_deg: f64, direction: ArcDirection) -> ConnectorTemplate {
    let (end, heading) = arc_end_point(Vec3::zero(), 0., radius_m, angle_deg, direction);
    ConnectorTemplate {
        id: id.to_string(),
        local_pos: end,
        local_forward: heading_to_vector(heading),
    }
}

fn straight_connector(id: &str, length_m: f64) -> ConnectorTemplate {
    ConnectorTemplate {
        id: id.to_string(),
        local_pos: Vec3::FORWARD * length_m,
        local_forward: Vec3::FORWARD,
    }
}

fn straight_route(from: &str, to: &str, length_m: f64) -> RouteTemplate {
    RouteTemplate {
        from: from.to_string(),
        to: to.to_string(),
        curve: CurveDefinition::Straight,
        length_m,
    }
}

fn arc_route(from: &str, to: &str, radius_m: f64, angle_deg: f64, direction: ArcDirection) -> RouteTemplate {
    RouteTemplate {
        from: from.to_string(),
        to: to.to_string(),
        curve: CurveDefinition::arc(radius_m, angle_deg, direction),
        length_m: calculate_arc_length(radius_m, angle_deg),
    }
}

impl CatalogEntry {
    pub fn straight(id: impl Into<String>, length_m: f64) -> Self {
        Self {
            id: id.into(),
            piece_type: PieceType::Straight,
            connector_templates: vec![start_connector("A"), straight_connector("B", length_m)],
            routes: vec![straight_route("A", "B", length_m)],
        }
    }

    pub fn curve(id: impl Into<String>, radius_m: f64, angle_deg: f64, direction: ArcDirection) -> Self {
        Self {
            id: id.into(),
            piece_type: PieceType::Curve,
            connector_templates: vec![
                start_connector("A"),
                arc_connector("B", radius_m, angle_deg, direction),
            ],
            routes: vec![arc_route("A", "B", radius_m, angle_deg, direction)],
        }
    }

    /// A turnout with a straight through route and a diverging arc, both leaving `COMMON`.
    pub fn switch(
        id: impl Into<String>,
        length_m: f64,
        radius_m: f64,
        angle_deg: f64,
        direction: ArcDirection,
    ) -> Self {
        Self {
            id: id.into(),
            piece_type: PieceType::Switch,
            connector_templates: vec![
                start_connector(COMMON_CONNECTOR),
                straight_connector("STRAIGHT", length_m),
                arc_connector("DIVERGING", radius_m, angle_deg, direction),
            ],
            routes: vec![
                straight_route(COMMON_CONNECTOR, "STRAIGHT", length_m),
                arc_route(COMMON_CONNECTOR, "DIVERGING", radius_m, angle_deg, direction),
            ],
        }
    }

    /// A turnout on a curve: two arcs of different radius turning the same way.
    /// The inner route is generated first, the outer one second.
    pub fn curved_switch(
        id: impl Into<String>,
        inner_radius_m: f64,
        outer_radius_m: f64,
        angle_deg: f64,
        direction: ArcDirection,
    ) -> Self {
        Self {
            id: id.into(),
            piece_type: PieceType::CurvedSwitch,
            connector_templates: vec![
                start_connector(COMMON_CONNECTOR),
                arc_connector("INNER", inner_radius_m, angle_deg, direction),
                arc_connector("OUTER", outer_radius_m, angle_deg, direction),
            ],
            routes: vec![
                arc_route(COMMON_CONNECTOR, "INNER", inner_radius_m, angle_deg, direction),
                arc_route(COMMON_CONNECTOR, "OUTER", outer_radius_m, angle_deg, direction),
            ],
        }
    }

    pub fn connector_template(&self, id: &str) -> Option<&ConnectorTemplate> {
        self.connector_templates.iter().find(|c| c.id == id)
    }
}
