//! lineage-cluster: clusters a genealogy graph and writes the clusters back.
//!
//! Runs connected-component clustering and degree computation inside Neo4j
//! (Graph Data Science), stores each component as a cluster vertex linked to
//! its members, and attaches each cluster's degree. Every invocation is
//! recorded in the run journal.

pub mod backend;
pub mod error;
pub mod journal;
pub mod pipeline;

pub use backend::ClusterBackend;
pub use error::ClusterError;
pub use pipeline::{Pipeline, RunOptions, RunReport};
