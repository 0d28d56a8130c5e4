//! Core domain types for the lineage batch job.
//!
//! The graph itself lives in Neo4j; these types only carry identifiers and
//! analytic result maps between pipeline steps.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Identifiers ──────────────────────────────────────────────────

/// Identifier of a vertex in the external graph (a Neo4j element id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ConceptId(pub String);

impl ConceptId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConceptId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConceptId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of one cluster in an analytic result.
///
/// Generated by the analytics engine; it has no meaning outside the result
/// map it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ClusterKey(pub String);

impl std::fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one invocation of the pipeline. Every cluster vertex is tagged
/// with the run that created it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Analytic results ─────────────────────────────────────────────

/// Cluster key -> member vertices, as returned by the clustering analytic.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ClusterMembership(pub BTreeMap<ClusterKey, BTreeSet<ConceptId>>);

impl ClusterMembership {
    /// Fold `(component id, member id)` rows into a membership map.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (i64, ConceptId)>,
    {
        let mut map: BTreeMap<ClusterKey, BTreeSet<ConceptId>> = BTreeMap::new();
        for (component, member) in rows {
            map.entry(ClusterKey(component.to_string()))
                .or_default()
                .insert(member);
        }
        Self(map)
    }

    pub fn cluster_count(&self) -> usize {
        self.0.len()
    }

    /// Total number of member vertices over all clusters.
    pub fn member_count(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClusterKey, &BTreeSet<ConceptId>)> {
        self.0.iter()
    }
}

/// Degree value -> vertices having that degree, as returned by the degree
/// analytic.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct DegreeDistribution(pub BTreeMap<i64, BTreeSet<ConceptId>>);

impl DegreeDistribution {
    /// Fold `(vertex id, degree)` rows into a distribution.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (ConceptId, i64)>,
    {
        let mut map: BTreeMap<i64, BTreeSet<ConceptId>> = BTreeMap::new();
        for (concept, degree) in rows {
            map.entry(degree).or_default().insert(concept);
        }
        Self(map)
    }

    /// Number of vertices present in the distribution.
    pub fn concept_count(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flatten into `(vertex, degree)` pairs, ordered by degree.
    pub fn assignments(&self) -> Vec<(ConceptId, i64)> {
        self.0
            .iter()
            .flat_map(|(degree, concepts)| concepts.iter().map(move |c| (c.clone(), *degree)))
            .collect()
    }
}

// ── Records ──────────────────────────────────────────────────────

/// A lightweight view of a graph vertex returned from read queries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConceptRecord {
    pub id: ConceptId,
    pub labels: Vec<String>,
    pub properties: serde_json::Value,
}

impl ConceptRecord {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

impl std::fmt::Display for ConceptRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] {}", self.id, self.labels.join(":"), self.properties)
    }
}

/// Outcome of writing one clustering result back into the graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistSummary {
    pub run_id: Option<RunId>,
    pub clusters_created: usize,
    pub groupings_created: usize,
    /// Result key -> id of the cluster vertex created for it.
    pub cluster_ids: BTreeMap<ClusterKey, ConceptId>,
}
