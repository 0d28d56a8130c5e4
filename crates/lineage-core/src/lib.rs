//! lineage-core: Shared types, ontology, configuration, and error handling
//! for the lineage batch job.
//!
//! - Identifier newtypes and analytic result maps passed between steps
//! - The genealogy ontology and its schema declarations
//! - Layered configuration (file + environment)
//! - Common error type

pub mod config;
pub mod error;
pub mod ontology;
pub mod types;

pub use config::LineageConfig;
pub use error::LineageError;
pub use ontology::{Ontology, SchemaConcept};
pub use types::{
    ClusterKey, ClusterMembership, ConceptId, ConceptRecord, DegreeDistribution, PersistSummary,
    RunId,
};
