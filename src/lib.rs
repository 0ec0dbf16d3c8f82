//! Track network and train motion for a model railway layout.
//!
//! Pieces placed on a [`TrackLayout`] generate the nodes and edges of a [`TrackGraph`].
//! A [`PointsManager`] holds the state of every switch, and [`TrainPathFollower`]s move
//! along the graph, asking the points manager which way to go at junctions.

pub mod arc_geometry;
pub mod config;
pub mod error;
pub mod path_helper;
pub mod points;
pub mod track_graph;
pub mod track_layout;
pub mod track_piece;
pub mod train;
pub mod vec3;

pub use config::TrackConfig;
pub use error::TrackError;
pub use path_helper::TrackPathHelper;
pub use points::{PointState, PointsManager};
pub use track_graph::TrackGraph;
pub use track_layout::{TrackLayout, TrackSystem};
pub use track_piece::{CatalogEntry, TrackPiece};
pub use train::{EdgeDirection, SwitchRouter, TrainPathFollower};
pub use vec3::Vec3;
