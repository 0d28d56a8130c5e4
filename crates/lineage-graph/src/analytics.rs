//! Server-side analytics via the Graph Data Science library.
//!
//! Each analytic runs over an anonymous in-memory projection built with the
//! Cypher aggregation `gds.graph.project`. The projection is named uniquely
//! per call and dropped once the result stream has been read.

use neo4rs::query;
use uuid::Uuid;

use lineage_core::{ClusterMembership, ConceptId, DegreeDistribution};

use crate::client::{GraphClient, GraphError};

const PROJECT: &str = "MATCH (source)
WHERE any(l IN labels(source) WHERE l IN $source_labels)
OPTIONAL MATCH (source)-[r]->(target)
WHERE (size($relationship_types) = 0 OR type(r) IN $relationship_types)
  AND (size($target_labels) = 0 OR any(l IN labels(target) WHERE l IN $target_labels))
WITH gds.graph.project($graph_name, source, target) AS g
RETURN g.graphName AS graph_name, g.nodeCount AS node_count,
       g.relationshipCount AS relationship_count";

const WCC_STREAM: &str = "CALL gds.wcc.stream($graph_name)
YIELD nodeId, componentId
RETURN componentId AS component_id, elementId(gds.util.asNode(nodeId)) AS concept_id";

const DEGREE_STREAM: &str = "CALL gds.degree.stream($graph_name, {orientation: 'UNDIRECTED'})
YIELD nodeId, score
WITH gds.util.asNode(nodeId) AS n, score
WHERE any(l IN labels(n) WHERE l IN $of_labels)
RETURN elementId(n) AS concept_id, toInteger(score) AS degree";

const DROP: &str = "CALL gds.graph.drop($graph_name, false) YIELD graphName
RETURN graphName AS graph_name";

/// The subgraph an analytic runs over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub name: String,
    /// Vertices whose outgoing relationships are projected.
    pub source_labels: Vec<String>,
    /// Relationship types to keep; empty keeps every type.
    pub relationship_types: Vec<String>,
    /// Labels a relationship's end vertex must carry; empty accepts any.
    pub target_labels: Vec<String>,
}

impl Projection {
    /// Subgraph induced by `labels`: both ends of every relationship must
    /// carry one of them.
    pub fn induced(labels: &[String]) -> Self {
        Self {
            name: unique_name(),
            source_labels: labels.to_vec(),
            relationship_types: Vec::new(),
            target_labels: labels.to_vec(),
        }
    }

    /// Vertices carrying `labels` together with their `relationship_type`
    /// incidences, whatever sits at the other end.
    pub fn incidences(labels: &[String], relationship_type: &str) -> Self {
        Self {
            name: unique_name(),
            source_labels: labels.to_vec(),
            relationship_types: vec![relationship_type.to_string()],
            target_labels: Vec::new(),
        }
    }
}

fn unique_name() -> String {
    format!("lineage-{}", Uuid::new_v4())
}

/// Size of a projection as reported by GDS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionStats {
    pub node_count: i64,
    pub relationship_count: i64,
}

/// Whether a projection result describes a graph worth streaming from.
///
/// The Cypher aggregation yields a null graph name when its input had no
/// rows; in that case nothing was created server-side.
fn has_nodes(graph_name: Option<&str>, stats: &ProjectionStats) -> bool {
    graph_name.is_some() && stats.node_count > 0
}

impl GraphClient {
    /// Connected-component clustering over the subgraph induced by
    /// `scope_labels`. Returns component id -> member vertices.
    pub async fn compute_clusters(
        &self,
        scope_labels: &[String],
    ) -> Result<ClusterMembership, GraphError> {
        let projection = Projection::induced(scope_labels);
        let Some(stats) = self.project(&projection).await? else {
            tracing::info!(scope = ?scope_labels, "No vertices in scope, nothing to cluster");
            return Ok(ClusterMembership::default());
        };
        tracing::debug!(
            graph_name = %projection.name,
            nodes = stats.node_count,
            relationships = stats.relationship_count,
            "Projected clustering subgraph"
        );

        let streamed = self.stream_components(&projection.name).await;
        self.drop_projection(&projection.name).await;

        let membership = ClusterMembership::from_rows(streamed?);
        tracing::info!(
            clusters = membership.cluster_count(),
            members = membership.member_count(),
            "Connected components computed"
        );
        Ok(membership)
    }

    /// Degree of every vertex carrying one of `of_labels`, counted along
    /// `relationship_type`. Returns degree -> vertices.
    pub async fn compute_degrees(
        &self,
        of_labels: &[String],
        relationship_type: &str,
    ) -> Result<DegreeDistribution, GraphError> {
        let projection = Projection::incidences(of_labels, relationship_type);
        let Some(stats) = self.project(&projection).await? else {
            tracing::info!(of = ?of_labels, "No vertices to measure, degrees are empty");
            return Ok(DegreeDistribution::default());
        };
        tracing::debug!(
            graph_name = %projection.name,
            nodes = stats.node_count,
            relationships = stats.relationship_count,
            "Projected degree subgraph"
        );

        let streamed = self.stream_degrees(&projection.name, of_labels).await;
        self.drop_projection(&projection.name).await;

        let degrees = DegreeDistribution::from_rows(streamed?);
        tracing::info!(
            vertices = degrees.concept_count(),
            distinct_degrees = degrees.0.len(),
            "Degrees computed"
        );
        Ok(degrees)
    }

    /// Create the in-memory projection described by `projection`.
    ///
    /// Returns `None` when the projection would be empty; no projection is
    /// left behind in that case.
    pub async fn project(
        &self,
        projection: &Projection,
    ) -> Result<Option<ProjectionStats>, GraphError> {
        let q = query(PROJECT)
            .param("graph_name", projection.name.clone())
            .param("source_labels", projection.source_labels.clone())
            .param("relationship_types", projection.relationship_types.clone())
            .param("target_labels", projection.target_labels.clone());

        let Some(row) = self.query_one(q).await? else {
            return Ok(None);
        };
        let graph_name = row.get::<String>("graph_name").ok();
        let stats = ProjectionStats {
            node_count: row.get::<i64>("node_count").unwrap_or(0),
            relationship_count: row.get::<i64>("relationship_count").unwrap_or(0),
        };

        if !has_nodes(graph_name.as_deref(), &stats) {
            if graph_name.is_some() {
                self.drop_projection(&projection.name).await;
            }
            tracing::debug!(graph_name = %projection.name, "Projection is empty");
            return Ok(None);
        }
        Ok(Some(stats))
    }

    async fn stream_components(
        &self,
        graph_name: &str,
    ) -> Result<Vec<(i64, ConceptId)>, GraphError> {
        let q = query(WCC_STREAM).param("graph_name", graph_name.to_string());

        let rows = self.query_rows(q).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let component: i64 = row.get("component_id").map_err(|e| {
                GraphError::Serialization(format!("Failed to read component id: {e}"))
            })?;
            let concept: String = row.get("concept_id").map_err(|e| {
                GraphError::Serialization(format!("Failed to read concept id: {e}"))
            })?;
            results.push((component, ConceptId(concept)));
        }
        Ok(results)
    }

    async fn stream_degrees(
        &self,
        graph_name: &str,
        of_labels: &[String],
    ) -> Result<Vec<(ConceptId, i64)>, GraphError> {
        let q = query(DEGREE_STREAM)
            .param("graph_name", graph_name.to_string())
            .param("of_labels", of_labels.to_vec());

        let rows = self.query_rows(q).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let concept: String = row.get("concept_id").map_err(|e| {
                GraphError::Serialization(format!("Failed to read concept id: {e}"))
            })?;
            let degree: i64 = row
                .get("degree")
                .map_err(|e| GraphError::Serialization(format!("Failed to read degree: {e}")))?;
            results.push((ConceptId(concept), degree));
        }
        Ok(results)
    }

    /// Release a projection. Failures only leave memory allocated on the
    /// server, so they are logged rather than returned.
    pub async fn drop_projection(&self, graph_name: &str) {
        let q = query(DROP).param("graph_name", graph_name.to_string());
        if let Err(e) = self.run(q).await {
            tracing::warn!(graph_name, error = %e, "Failed to drop GDS projection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn induced_projection_constrains_both_ends() {
        let scope = labels(&["Person", "Marriage"]);
        let p = Projection::induced(&scope);

        assert_eq!(p.source_labels, scope);
        assert_eq!(p.target_labels, scope);
        assert!(p.relationship_types.is_empty());
        assert!(p.name.starts_with("lineage-"));
    }

    #[test]
    fn incidence_projection_leaves_targets_open() {
        let p = Projection::incidences(&labels(&["Cluster"]), "GROUPING");

        assert_eq!(p.source_labels, labels(&["Cluster"]));
        assert_eq!(p.relationship_types, labels(&["GROUPING"]));
        assert!(p.target_labels.is_empty());
    }

    #[test]
    fn projection_names_are_unique() {
        let scope = labels(&["Person"]);
        assert_ne!(Projection::induced(&scope).name, Projection::induced(&scope).name);
    }

    #[test]
    fn empty_aggregation_is_not_streamed() {
        let none = ProjectionStats {
            node_count: 0,
            relationship_count: 0,
        };
        let some = ProjectionStats {
            node_count: 7,
            relationship_count: 5,
        };

        assert!(!has_nodes(None, &none));
        assert!(!has_nodes(None, &some));
        assert!(!has_nodes(Some("lineage-x"), &none));
        assert!(has_nodes(Some("lineage-x"), &some));
    }

    #[test]
    fn statements_use_parameters_not_interpolation() {
        assert!(PROJECT.contains("$source_labels"));
        assert!(PROJECT.contains("gds.graph.project($graph_name"));
        assert!(WCC_STREAM.contains("gds.wcc.stream($graph_name)"));
        assert!(DEGREE_STREAM.contains("$of_labels"));
        assert!(DROP.contains("gds.graph.drop($graph_name, false)"));
    }
}
