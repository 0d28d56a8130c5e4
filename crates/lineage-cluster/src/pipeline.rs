//! The batch pipeline.
//!
//! Six steps, each opening its own session or transaction through the
//! backend and releasing it before returning:
//!
//! 1. probe: sample a few person vertices
//! 2. compute clusters: connected components over persons and marriages
//! 3. mutate ontology: declare the grouping relation and cluster entity
//! 4. persist clusters: one cluster vertex per component, one transaction each
//! 5. degree of clusters: grouping count per cluster
//! 6. persist degrees: declare the degree attribute, then attach values
//!
//! Steps run strictly in sequence. No step checks that an earlier one
//! succeeded; the first error ends the run.

use serde::Serialize;

use lineage_core::{
    ClusterMembership, ConceptId, ConceptRecord, DegreeDistribution, Ontology, PersistSummary,
    RunId,
};

use crate::backend::ClusterBackend;
use crate::error::Result;
use crate::journal::RunJournal;

/// Options for a full pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOptions {
    pub probe_limit: u32,
    pub prune_previous_runs: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            probe_limit: 10,
            prune_previous_runs: false,
        }
    }
}

/// Everything a full run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub probed: Vec<ConceptRecord>,
    pub clusters: ClusterMembership,
    pub pruned: usize,
    pub persisted: PersistSummary,
    pub degrees: DegreeDistribution,
    pub degrees_attached: usize,
}

/// Sequences the steps against one backend.
pub struct Pipeline<'a, B: ClusterBackend + ?Sized> {
    backend: &'a B,
    ontology: &'a Ontology,
}

impl<'a, B: ClusterBackend + ?Sized> Pipeline<'a, B> {
    pub fn new(backend: &'a B, ontology: &'a Ontology) -> Self {
        Self { backend, ontology }
    }

    /// Step 1: read at most `limit` person vertices.
    pub async fn probe(&self, limit: u32) -> Result<Vec<ConceptRecord>> {
        let records = self
            .backend
            .sample(&self.ontology.person_label, limit)
            .await?;
        for record in &records {
            tracing::debug!(concept = %record, "Probe result");
        }
        Ok(records)
    }

    /// Step 2: connected components over persons and marriages.
    pub async fn compute_clusters(&self) -> Result<ClusterMembership> {
        Ok(self
            .backend
            .components(&self.ontology.cluster_scope())
            .await?)
    }

    /// Step 3: declare the grouping relation, its roles, and the cluster
    /// entity. Returns the number of declarations applied.
    pub async fn mutate_ontology(&self) -> Result<usize> {
        self.backend.ensure_constraints(self.ontology).await?;
        Ok(self
            .backend
            .declare(&self.ontology.grouping_declarations())
            .await?)
    }

    /// Step 4: one new cluster vertex per result key, with one grouping per
    /// member. Each cluster is committed in its own transaction.
    pub async fn persist_clusters(
        &self,
        run_id: RunId,
        membership: &ClusterMembership,
    ) -> Result<PersistSummary> {
        let mut summary = PersistSummary {
            run_id: Some(run_id),
            ..Default::default()
        };

        for (key, members) in membership.iter() {
            let members: Vec<ConceptId> = members.iter().cloned().collect();
            let cluster = self
                .backend
                .create_cluster(self.ontology, run_id, &members)
                .await?;

            tracing::debug!(
                key = %key,
                cluster_id = %cluster.id,
                groupings = cluster.groupings,
                "Cluster persisted"
            );

            summary.clusters_created += 1;
            summary.groupings_created += cluster.groupings;
            summary.cluster_ids.insert(key.clone(), cluster.id);
        }

        Ok(summary)
    }

    /// Step 5: degree of every cluster vertex along the grouping relation.
    pub async fn degree_of_clusters(&self) -> Result<DegreeDistribution> {
        Ok(self
            .backend
            .degrees(
                std::slice::from_ref(&self.ontology.cluster_label),
                &self.ontology.grouping_type,
            )
            .await?)
    }

    /// Step 6: declare the degree attribute on clusters (one transaction),
    /// then attach every computed value (a second transaction).
    /// Returns the number of clusters updated.
    pub async fn persist_degrees(&self, degrees: &DegreeDistribution) -> Result<usize> {
        self.backend
            .declare(&self.ontology.degree_declarations())
            .await?;
        Ok(self.backend.set_degrees(self.ontology, degrees).await?)
    }

    /// Remove clusters written by earlier runs.
    pub async fn prune(&self, keep: RunId) -> Result<usize> {
        Ok(self.backend.prune_clusters(self.ontology, keep).await?)
    }

    /// Run steps 1 to 6 in order, recording each in `journal`.
    pub async fn run_all(&self, options: &RunOptions, journal: &mut RunJournal) -> Result<RunReport> {
        let run_id = journal.run_id();
        tracing::info!(%run_id, "Starting clustering run");

        let probed = journal
            .track("probe", self.probe(options.probe_limit), |records| {
                (
                    format!("Probed {} vertices", records.len()),
                    serde_json::json!({ "count": records.len(), "limit": options.probe_limit }),
                )
            })
            .await?;

        let clusters = journal
            .track("compute_clusters", self.compute_clusters(), describe_membership)
            .await?;

        journal
            .track("mutate_ontology", self.mutate_ontology(), |n| {
                (
                    format!("Applied {n} ontology declarations"),
                    serde_json::json!({ "declarations": n }),
                )
            })
            .await?;

        let pruned = if options.prune_previous_runs {
            journal
                .track("prune_clusters", self.prune(run_id), |n| {
                    (
                        format!("Removed {n} clusters from earlier runs"),
                        serde_json::json!({ "removed": n }),
                    )
                })
                .await?
        } else {
            0
        };

        let persisted = journal
            .track(
                "persist_clusters",
                self.persist_clusters(run_id, &clusters),
                describe_persisted,
            )
            .await?;

        let degrees = journal
            .track("degree_of_clusters", self.degree_of_clusters(), describe_degrees)
            .await?;

        let degrees_attached = journal
            .track("persist_degrees", self.persist_degrees(&degrees), |n| {
                (
                    format!("Attached degrees to {n} clusters"),
                    serde_json::json!({ "clusters": n }),
                )
            })
            .await?;

        tracing::info!(
            %run_id,
            clusters = persisted.clusters_created,
            groupings = persisted.groupings_created,
            degrees_attached,
            "Finished calculation"
        );

        Ok(RunReport {
            run_id,
            probed,
            clusters,
            pruned,
            persisted,
            degrees,
            degrees_attached,
        })
    }
}

pub fn describe_membership(m: &ClusterMembership) -> (String, serde_json::Value) {
    (
        format!(
            "Computed {} clusters over {} vertices",
            m.cluster_count(),
            m.member_count()
        ),
        serde_json::json!({ "clusters": m.cluster_count(), "members": m.member_count() }),
    )
}

pub fn describe_persisted(s: &PersistSummary) -> (String, serde_json::Value) {
    (
        format!(
            "Created {} clusters with {} groupings",
            s.clusters_created, s.groupings_created
        ),
        serde_json::json!({
            "clusters": s.clusters_created,
            "groupings": s.groupings_created,
        }),
    )
}

pub fn describe_degrees(d: &DegreeDistribution) -> (String, serde_json::Value) {
    (
        format!("Computed degrees for {} clusters", d.concept_count()),
        serde_json::json!({
            "clusters": d.concept_count(),
            "distinct_degrees": d.0.len(),
        }),
    )
}
