//! The database operations the pipeline depends on.
//!
//! [`GraphClient`] is the production implementation; tests substitute an
//! in-memory graph.

use async_trait::async_trait;

use lineage_core::{
    ClusterMembership, ConceptId, ConceptRecord, DegreeDistribution, Ontology, RunId,
    SchemaConcept,
};
use lineage_graph::mutations::PersistedCluster;
use lineage_graph::{GraphClient, GraphError};

#[async_trait]
pub trait ClusterBackend: Send + Sync {
    /// Read at most `limit` vertices carrying `label`.
    async fn sample(&self, label: &str, limit: u32) -> Result<Vec<ConceptRecord>, GraphError>;

    /// Connected components of the subgraph induced by `scope`.
    async fn components(&self, scope: &[String]) -> Result<ClusterMembership, GraphError>;

    /// Create the constraints the ontology relies on.
    async fn ensure_constraints(&self, ontology: &Ontology) -> Result<(), GraphError>;

    /// Apply schema declarations in one committed write transaction.
    async fn declare(&self, decls: &[SchemaConcept]) -> Result<usize, GraphError>;

    /// Create one cluster vertex and its groupings in one committed write
    /// transaction.
    async fn create_cluster(
        &self,
        ontology: &Ontology,
        run_id: RunId,
        members: &[ConceptId],
    ) -> Result<PersistedCluster, GraphError>;

    /// Degree of every `of` vertex along `relationship_type`.
    async fn degrees(
        &self,
        of: &[String],
        relationship_type: &str,
    ) -> Result<DegreeDistribution, GraphError>;

    /// Attach degree values to clusters in one committed write transaction.
    async fn set_degrees(
        &self,
        ontology: &Ontology,
        degrees: &DegreeDistribution,
    ) -> Result<usize, GraphError>;

    /// Remove clusters written by any run other than `keep`.
    async fn prune_clusters(&self, ontology: &Ontology, keep: RunId) -> Result<usize, GraphError>;
}

#[async_trait]
impl ClusterBackend for GraphClient {
    async fn sample(&self, label: &str, limit: u32) -> Result<Vec<ConceptRecord>, GraphError> {
        self.sample_concepts(label, limit).await
    }

    async fn components(&self, scope: &[String]) -> Result<ClusterMembership, GraphError> {
        self.compute_clusters(scope).await
    }

    async fn ensure_constraints(&self, ontology: &Ontology) -> Result<(), GraphError> {
        GraphClient::ensure_constraints(self, ontology).await
    }

    async fn declare(&self, decls: &[SchemaConcept]) -> Result<usize, GraphError> {
        self.apply_declarations(decls).await
    }

    async fn create_cluster(
        &self,
        ontology: &Ontology,
        run_id: RunId,
        members: &[ConceptId],
    ) -> Result<PersistedCluster, GraphError> {
        self.persist_cluster(ontology, run_id, members).await
    }

    async fn degrees(
        &self,
        of: &[String],
        relationship_type: &str,
    ) -> Result<DegreeDistribution, GraphError> {
        self.compute_degrees(of, relationship_type).await
    }

    async fn set_degrees(
        &self,
        ontology: &Ontology,
        degrees: &DegreeDistribution,
    ) -> Result<usize, GraphError> {
        self.attach_degrees(ontology, degrees).await
    }

    async fn prune_clusters(&self, ontology: &Ontology, keep: RunId) -> Result<usize, GraphError> {
        self.remove_clusters_except(ontology, keep).await
    }
}
