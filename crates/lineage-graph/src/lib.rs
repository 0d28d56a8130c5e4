//! Lineage Graph: Neo4j client for the genealogy graph.
//!
//! Every read, analytic, schema mutation, and write the batch job performs
//! goes through [`GraphClient`]. Analytics are delegated to the Graph Data
//! Science library running inside the database.

pub mod analytics;
pub mod client;
pub mod mutations;
pub mod queries;
pub mod schema;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use queries::ClusterSummary;
