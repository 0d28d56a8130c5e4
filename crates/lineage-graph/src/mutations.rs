//! Write operations: cluster vertices, groupings, and degree attributes.
//!
//! Cluster vertices are always CREATEd, never MERGEd: every run writes a
//! fresh set tagged with its run id.

use chrono::Utc;
use neo4rs::query;
use uuid::Uuid;

use lineage_core::{ConceptId, DegreeDistribution, Ontology, RunId};

use crate::client::{txn_rows, GraphClient, GraphError};

/// A cluster vertex written by [`GraphClient::persist_cluster`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedCluster {
    pub id: ConceptId,
    pub groupings: usize,
}

impl GraphClient {
    /// Create one cluster vertex and a grouping from it to every member, in
    /// a single write transaction.
    ///
    /// Members that do not exist or do not carry a member-playing label are
    /// skipped; the returned grouping count reflects what was written.
    pub async fn persist_cluster(
        &self,
        ontology: &Ontology,
        run_id: RunId,
        members: &[ConceptId],
    ) -> Result<PersistedCluster, GraphError> {
        let create = format!(
            "CREATE (c:{label} {{id: $id, run_id: $run_id, created_at: $now}})
             RETURN elementId(c) AS cluster_id",
            label = ontology.cluster_label
        );
        let attach = format!(
            "MATCH (c:{label}) WHERE elementId(c) = $cluster_id
             UNWIND $members AS member_id
             MATCH (m) WHERE elementId(m) = member_id
               AND any(l IN labels(m) WHERE l IN $member_labels)
             CREATE (c)-[:{grouping}]->(m)
             RETURN count(m) AS groupings",
            label = ontology.cluster_label,
            grouping = ontology.grouping_type
        );

        let mut txn = self.start_txn().await?;

        let rows = txn_rows(
            &mut txn,
            query(&create)
                .param("id", Uuid::new_v4().to_string())
                .param("run_id", run_id.0.to_string())
                .param("now", Utc::now().to_rfc3339()),
        )
        .await?;
        let cluster_id: String = rows
            .first()
            .and_then(|row| row.get("cluster_id").ok())
            .ok_or_else(|| GraphError::Serialization("CREATE returned no cluster id".into()))?;

        let member_ids: Vec<String> = members.iter().map(|m| m.0.clone()).collect();
        let rows = txn_rows(
            &mut txn,
            query(&attach)
                .param("cluster_id", cluster_id.clone())
                .param("members", member_ids)
                .param("member_labels", ontology.cluster_scope()),
        )
        .await?;
        let groupings = rows
            .first()
            .and_then(|row| row.get::<i64>("groupings").ok())
            .unwrap_or(0);

        txn.commit().await?;

        if groupings as usize != members.len() {
            tracing::warn!(
                cluster_id = %cluster_id,
                expected = members.len(),
                written = groupings,
                "Some members were not attached to their cluster"
            );
        }

        Ok(PersistedCluster {
            id: ConceptId(cluster_id),
            groupings: groupings as usize,
        })
    }

    /// Set the degree attribute on every cluster in `degrees`, in a single
    /// write transaction. Returns the number of clusters updated.
    pub async fn attach_degrees(
        &self,
        ontology: &Ontology,
        degrees: &DegreeDistribution,
    ) -> Result<usize, GraphError> {
        let (ids, values): (Vec<String>, Vec<i64>) = degrees
            .assignments()
            .into_iter()
            .map(|(concept, degree)| (concept.0, degree))
            .unzip();

        if ids.is_empty() {
            return Ok(0);
        }

        let cypher = format!(
            "UNWIND range(0, size($ids) - 1) AS i
             MATCH (c:{label}) WHERE elementId(c) = $ids[i]
             SET c.{degree} = $degrees[i]
             RETURN count(c) AS updated",
            label = ontology.cluster_label,
            degree = ontology.degree_attribute
        );

        let mut txn = self.start_txn().await?;
        let rows = txn_rows(
            &mut txn,
            query(&cypher).param("ids", ids).param("degrees", values),
        )
        .await?;
        txn.commit().await?;

        let updated = rows
            .first()
            .and_then(|row| row.get::<i64>("updated").ok())
            .unwrap_or(0);
        Ok(updated as usize)
    }

    /// Detach-delete every cluster not written by run `keep`.
    /// Returns the number of clusters removed.
    pub async fn remove_clusters_except(
        &self,
        ontology: &Ontology,
        keep: RunId,
    ) -> Result<usize, GraphError> {
        let cypher = format!(
            "MATCH (c:{label})
             WHERE c.run_id IS NULL OR c.run_id <> $keep
             DETACH DELETE c
             RETURN count(c) AS removed",
            label = ontology.cluster_label
        );
        let keep = keep.0.to_string();

        let mut txn = self.start_txn().await?;
        let rows = txn_rows(&mut txn, query(&cypher).param("keep", keep)).await?;
        txn.commit().await?;

        let removed = rows
            .first()
            .and_then(|row| row.get::<i64>("removed").ok())
            .unwrap_or(0);
        Ok(removed as usize)
    }
}
