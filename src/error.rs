use thiserror::Error;

/// Errors from the few operations on the track network that can fail outright.
/// Lookups of unknown ids are not errors; they return `None`/`false` and log.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("failed to (de)serialize layout data: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("edge {edge_id} references missing node {node_id}")]
    DanglingReference { edge_id: String, node_id: String },

    #[error("catalog entry {catalog_id} has a route to unknown connector {connector_id}")]
    UnknownConnector {
        catalog_id: String,
        connector_id: String,
    },

    #[error("invalid config value for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}
