//! Read operations for the genealogy graph.

use neo4rs::query;
use serde::{Deserialize, Serialize};

use lineage_core::{ConceptId, ConceptRecord, Ontology};

use crate::client::{GraphClient, GraphError};

/// One cluster vertex with its grouping count, as stored in the graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterSummary {
    pub id: ConceptId,
    pub run_id: String,
    pub members: i64,
    pub degree: Option<i64>,
}

impl GraphClient {
    /// Fetch at most `limit` vertices carrying `label`.
    pub async fn sample_concepts(
        &self,
        label: &str,
        limit: u32,
    ) -> Result<Vec<ConceptRecord>, GraphError> {
        let cypher = format!(
            "MATCH (x:{label})
             RETURN elementId(x) AS id, labels(x) AS labels,
                    apoc.convert.toJson(properties(x)) AS props
             LIMIT $limit"
        );

        let q = query(&cypher).param("limit", limit as i64);

        let rows = self.query_rows(q).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row
                .get("id")
                .map_err(|e| GraphError::Serialization(format!("Failed to read vertex id: {e}")))?;
            let labels: Vec<String> = row.get("labels").unwrap_or_default();
            let props: String = row.get("props").unwrap_or_default();
            results.push(ConceptRecord {
                id: ConceptId(id),
                labels,
                properties: parse_properties(&props)?,
            });
        }
        Ok(results)
    }

    /// Count vertices carrying `label`.
    pub async fn count_nodes(&self, label: &str) -> Result<i64, GraphError> {
        let cypher = format!("MATCH (n:{label}) RETURN count(n) AS cnt");

        match self.query_one(query(&cypher)).await? {
            Some(row) => Ok(row.get::<i64>("cnt").unwrap_or(0)),
            None => Ok(0),
        }
    }

    /// Count relationships of `rel_type`.
    pub async fn count_relationships(&self, rel_type: &str) -> Result<i64, GraphError> {
        let cypher = format!("MATCH ()-[r:{rel_type}]->() RETURN count(r) AS cnt");

        match self.query_one(query(&cypher)).await? {
            Some(row) => Ok(row.get::<i64>("cnt").unwrap_or(0)),
            None => Ok(0),
        }
    }

    /// List cluster vertices, optionally only those written by one run.
    pub async fn list_clusters(
        &self,
        ontology: &Ontology,
        run_id: Option<&str>,
    ) -> Result<Vec<ClusterSummary>, GraphError> {
        let cypher = format!(
            "MATCH (c:{label})
             WHERE $run_id = '' OR c.run_id = $run_id
             OPTIONAL MATCH (c)-[g:{grouping}]->()
             RETURN elementId(c) AS id, coalesce(c.run_id, '') AS run_id,
                    count(g) AS members, c.{degree} AS degree
             ORDER BY id",
            label = ontology.cluster_label,
            grouping = ontology.grouping_type,
            degree = ontology.degree_attribute
        );

        let q = query(&cypher).param("run_id", run_id.unwrap_or_default().to_string());

        let rows = self.query_rows(q).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row
                .get("id")
                .map_err(|e| GraphError::Serialization(format!("Failed to read cluster id: {e}")))?;
            results.push(ClusterSummary {
                id: ConceptId(id),
                run_id: row.get("run_id").unwrap_or_default(),
                members: row.get::<i64>("members").unwrap_or(0),
                degree: row.get::<i64>("degree").ok(),
            });
        }
        Ok(results)
    }
}

/// Parse the JSON property map returned by `apoc.convert.toJson`.
fn parse_properties(raw: &str) -> Result<serde_json::Value, GraphError> {
    if raw.is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw)
        .map_err(|e| GraphError::Serialization(format!("Invalid property JSON: {e}")))
}
