//! Error types for the lineage-cluster crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Graph error: {0}")]
    Graph(#[from] lineage_graph::GraphError),

    #[error("Config error: {0}")]
    Config(#[from] lineage_core::LineageError),

    #[error("Journal error: {0}")]
    Journal(#[from] lineage_journal::store::StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClusterError>;
