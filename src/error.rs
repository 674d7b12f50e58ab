//! Error types for Nodal

use thiserror::Error;

/// Result type alias for Nodal operations
pub type Result<T> = std::result::Result<T, NodalError>;

/// Main error type for Nodal
#[derive(Error, Debug)]
pub enum NodalError {
    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Link not found: {0}")]
    LinkNotFound(String),

    #[error("No graph loaded")]
    NoGraph,

    #[error("Clustering requires node positions; run a layout first")]
    MissingPositions,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Import error: {0}")]
    Import(#[from] serde_json::Error),
}

impl NodalError {
    /// Whether the error indicates a missing entity rather than bad input
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            NodalError::NodeNotFound(_) | NodalError::LinkNotFound(_) | NodalError::NoGraph
        )
    }
}
