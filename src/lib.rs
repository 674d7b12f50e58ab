//! Nodal - graph visualization engine
//!
//! Layout, clustering, analytics, filtering, and device-adaptive render
//! optimization for interactive knowledge-graph views (notes, tags,
//! collaborators, references). The engine computes positions and reduced
//! render sets; it draws nothing and persists nothing.

pub mod analytics;
pub mod cluster;
pub mod engine;
pub mod error;
pub mod filter;
pub mod layout;
pub mod render;
pub mod store;
pub mod types;

pub use engine::GraphEngine;
pub use error::{NodalError, Result};
pub use store::GraphStore;
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
