mod catalog;

use cgmath::{EuclideanSpace, Matrix4, Point3, Quaternion, Rad, Rotation3, Transform};
use serde::{Deserialize, Serialize};

use crate::vec3::Vec3;

pub use self::catalog::{
    COMMON_CONNECTOR, CatalogEntry, ConnectorTemplate, PieceType, RouteTemplate,
};

/// Cosmetic mirror of a point's position on the piece itself. `A` is the normal
/// route, `B` the reverse one. Routing never reads it; see [`crate::points::PointsManager`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwitchState {
    #[default]
    A,
    B,
}

impl std::ops::Not for SwitchState {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// A connection end of a placed piece.
#[derive(Clone, Debug, PartialEq)]
pub struct Connector {
    pub id: String,
    pub local_pos: Vec3,
    /// Outward facing direction in the piece frame
    pub local_forward: Vec3,
    pub world_pos: Vec3,
    pub world_forward: Vec3,
    /// Graph node this connector is attached to, once connected
    pub node_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PieceTransform {
    pub position: Vec3,
    pub rotation: Quaternion<f64>,
}

impl PieceTransform {
    /// Affine matrix with unit scale.
    pub fn matrix(&self) -> Matrix4<f64> {
        Matrix4::from_translation(self.position.to_vector3()) * Matrix4::from(self.rotation)
    }
}

/// A placed instance of a catalog template.
#[derive(Clone, Debug)]
pub struct TrackPiece {
    pub id: String,
    pub catalog_entry: CatalogEntry,
    transform: PieceTransform,
    connectors: Vec<Connector>,
    /// Edges this piece created in the graph, in route order
    pub generated_edge_ids: Vec<String>,
    is_switch: bool,
    switch_state: Option<SwitchState>,
}

impl TrackPiece {
    pub fn new(
        id: impl Into<String>,
        catalog_entry: CatalogEntry,
        position: Vec3,
        rotation: Quaternion<f64>,
    ) -> Self {
        let connectors = catalog_entry
            .connector_templates
            .iter()
            .map(|template| Connector {
                id: template.id.clone(),
                local_pos: template.local_pos,
                local_forward: template.local_forward,
                world_pos: template.local_pos,
                world_forward: template.local_forward,
                node_id: None,
            })
            .collect();
        let is_switch = catalog_entry.piece_type == PieceType::Switch;
        let mut piece = Self {
            id: id.into(),
            catalog_entry,
            transform: PieceTransform { position, rotation },
            connectors,
            generated_edge_ids: vec![],
            is_switch,
            switch_state: is_switch.then_some(SwitchState::A),
        };
        piece.update_world_transforms();
        piece
    }

    /// Rotation about the vertical axis by `heading` radians, turning +Z towards +X.
    pub fn yaw(heading: f64) -> Quaternion<f64> {
        Quaternion::from_angle_y(Rad(heading))
    }

    /// Recomputes every connector's world pose from the piece transform.
    pub fn update_world_transforms(&mut self) {
        let matrix = self.transform.matrix();
        for connector in &mut self.connectors {
            let pos = matrix.transform_point(Point3::from_vec(connector.local_pos.to_vector3()));
            let forward = matrix.transform_vector(connector.local_forward.to_vector3());
            connector.world_pos = Vec3::from(pos.to_vec());
            connector.world_forward = Vec3::from(forward).normalized();
        }
    }

    pub fn transform(&self) -> &PieceTransform {
        &self.transform
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
        self.update_world_transforms();
    }

    pub fn set_rotation(&mut self, rotation: Quaternion<f64>) {
        self.transform.rotation = rotation;
        self.update_world_transforms();
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    pub fn connector(&self, id: &str) -> Option<&Connector> {
        self.connectors.iter().find(|c| c.id == id)
    }

    pub(crate) fn connector_mut(&mut self, id: &str) -> Option<&mut Connector> {
        self.connectors.iter_mut().find(|c| c.id == id)
    }

    pub fn catalog_id(&self) -> &str {
        &self.catalog_entry.id
    }

    pub fn piece_type(&self) -> PieceType {
        self.catalog_entry.piece_type
    }

    pub fn is_switch(&self) -> bool {
        self.is_switch
    }

    pub fn switch_state(&self) -> Option<SwitchState> {
        self.switch_state
    }

    /// Flips the cosmetic switch state. Returns the new state, or `None` for plain pieces.
    pub fn toggle_switch(&mut self) -> Option<SwitchState> {
        let state = self.switch_state.as_mut()?;
        *state = !*state;
        Some(*state)
    }

    pub fn set_switch_state(&mut self, state: SwitchState) {
        if self.is_switch {
            self.switch_state = Some(state);
        }
    }
}
