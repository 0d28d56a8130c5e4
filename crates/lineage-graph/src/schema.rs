//! Ontology mutations.
//!
//! Neo4j has no declared type system, so declarations are recorded as a
//! meta-graph of `:SchemaConcept` nodes:
//!
//! ```cypher
//! (:SchemaConcept {kind: "relation"})-[:RELATES]->(:SchemaConcept {kind: "role"})
//! (:SchemaConcept {kind: "entity"})-[:PLAYS]->(:SchemaConcept {kind: "role"})
//! (:SchemaConcept {kind: "entity"})-[:HAS]->(:SchemaConcept {kind: "attribute"})
//! ```
//!
//! Everything is written with MERGE, so re-applying a declaration is a no-op.

use neo4rs::{query, Query};

use lineage_core::{Ontology, SchemaConcept};

use crate::client::{GraphClient, GraphError};

const MERGE_ROLE: &str = "MERGE (:SchemaConcept {label: $label, kind: 'role'})";

const MERGE_RELATION: &str = "MERGE (rel:SchemaConcept {label: $label, kind: 'relation'})
WITH rel
UNWIND $roles AS role
MERGE (r:SchemaConcept {label: role, kind: 'role'})
MERGE (rel)-[:RELATES]->(r)";

const MERGE_ENTITY: &str = "MERGE (e:SchemaConcept {label: $label, kind: 'entity'})
WITH e
UNWIND $roles AS role
MERGE (r:SchemaConcept {label: role, kind: 'role'})
MERGE (e)-[:PLAYS]->(r)";

const MERGE_ATTRIBUTE: &str = "MERGE (a:SchemaConcept {label: $label, kind: 'attribute'})
SET a.datatype = $datatype";

const MERGE_OWNERSHIP: &str = "MERGE (o:SchemaConcept {label: $owner, kind: 'entity'})
MERGE (a:SchemaConcept {label: $attribute, kind: 'attribute'})
MERGE (o)-[:HAS]->(a)";

/// Cypher statement for one declaration.
pub fn declaration_cypher(decl: &SchemaConcept) -> &'static str {
    match decl {
        SchemaConcept::Role { .. } => MERGE_ROLE,
        SchemaConcept::Relation { .. } => MERGE_RELATION,
        SchemaConcept::Entity { .. } => MERGE_ENTITY,
        SchemaConcept::Attribute { .. } => MERGE_ATTRIBUTE,
        SchemaConcept::Ownership { .. } => MERGE_OWNERSHIP,
    }
}

fn declaration_query(decl: &SchemaConcept) -> Query {
    let q = query(declaration_cypher(decl));
    match decl {
        SchemaConcept::Role { label } => q.param("label", label.clone()),
        SchemaConcept::Relation { label, relates } => q
            .param("label", label.clone())
            .param("roles", relates.clone()),
        SchemaConcept::Entity { label, plays } => {
            q.param("label", label.clone()).param("roles", plays.clone())
        }
        SchemaConcept::Attribute { label, datatype } => q
            .param("label", label.clone())
            .param("datatype", datatype.as_str()),
        SchemaConcept::Ownership { owner, attribute } => q
            .param("owner", owner.clone())
            .param("attribute", attribute.clone()),
    }
}

/// Uniqueness constraint on the `id` of cluster vertices.
pub fn cluster_constraint(ontology: &Ontology) -> String {
    let label = &ontology.cluster_label;
    format!(
        "CREATE CONSTRAINT lineage_{}_id IF NOT EXISTS FOR (c:{label}) REQUIRE c.id IS UNIQUE",
        label.to_lowercase()
    )
}

impl GraphClient {
    /// Create the constraints the ontology relies on.
    ///
    /// Runs outside any explicit transaction: Neo4j refuses to mix schema and
    /// data writes in one transaction.
    pub async fn ensure_constraints(&self, ontology: &Ontology) -> Result<(), GraphError> {
        self.run(query(&cluster_constraint(ontology))).await?;
        tracing::debug!(label = %ontology.cluster_label, "Cluster id constraint ensured");
        Ok(())
    }

    /// Apply `decls` in one write transaction and commit.
    /// Returns the number of declarations written.
    pub async fn apply_declarations(&self, decls: &[SchemaConcept]) -> Result<usize, GraphError> {
        let mut txn = self.start_txn().await?;
        for decl in decls {
            txn.run(declaration_query(decl)).await?;
        }
        txn.commit().await?;

        tracing::info!(declarations = decls.len(), "Ontology mutation committed");
        Ok(decls.len())
    }
}
