//! The genealogy ontology as seen by the batch job.
//!
//! Maps the type-system notions (entity, relation, role, attribute) onto
//! Neo4j labels, relationship types and properties. Names are configurable
//! so the job can run against datasets with different label conventions.

use serde::{Deserialize, Serialize};

/// Value type of an attribute declaration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Long,
    Double,
    String,
    Boolean,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Double => "double",
            Self::String => "string",
            Self::Boolean => "boolean",
        }
    }
}

/// One declaration in a schema mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaConcept {
    /// A role that can be played in a relation.
    Role { label: String },
    /// A relation type relating the given roles.
    Relation { label: String, relates: Vec<String> },
    /// An entity type (new or pre-existing) that plays the given roles.
    Entity { label: String, plays: Vec<String> },
    /// An attribute type with its value type.
    Attribute { label: String, datatype: DataType },
    /// Allows instances of `owner` to carry `attribute`.
    Ownership { owner: String, attribute: String },
}

impl SchemaConcept {
    /// Schema-level kind, stored on the meta node.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Role { .. } => "role",
            Self::Relation { .. } => "relation",
            Self::Entity { .. } => "entity",
            Self::Attribute { .. } => "attribute",
            Self::Ownership { .. } => "ownership",
        }
    }
}

/// Names used by the pipeline for every ontology element it touches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ontology {
    /// Pre-existing person vertices.
    #[serde(default = "default_person")]
    pub person_label: String,

    /// Pre-existing marriage vertices.
    #[serde(default = "default_marriage")]
    pub marriage_label: String,

    /// Cluster vertices created by the job.
    #[serde(default = "default_cluster")]
    pub cluster_label: String,

    /// Relationship type binding a cluster to a member.
    #[serde(default = "default_grouping")]
    pub grouping_type: String,

    /// Role of the cluster end of a grouping.
    #[serde(default = "default_group_role")]
    pub group_role: String,

    /// Role of the member end of a grouping.
    #[serde(default = "default_member_role")]
    pub member_role: String,

    /// Integer property holding a cluster's degree.
    #[serde(default = "default_degree")]
    pub degree_attribute: String,
}

impl Ontology {
    /// Vertex labels the clustering analytic runs over.
    pub fn cluster_scope(&self) -> Vec<String> {
        vec![self.person_label.clone(), self.marriage_label.clone()]
    }

    /// Declarations for the grouping relation, its roles, and the cluster
    /// entity. Person and marriage are extended to play the member role.
    pub fn grouping_declarations(&self) -> Vec<SchemaConcept> {
        vec![
            SchemaConcept::Role {
                label: self.group_role.clone(),
            },
            SchemaConcept::Role {
                label: self.member_role.clone(),
            },
            SchemaConcept::Relation {
                label: self.grouping_type.clone(),
                relates: vec![self.group_role.clone(), self.member_role.clone()],
            },
            SchemaConcept::Entity {
                label: self.cluster_label.clone(),
                plays: vec![self.group_role.clone()],
            },
            SchemaConcept::Entity {
                label: self.person_label.clone(),
                plays: vec![self.member_role.clone()],
            },
            SchemaConcept::Entity {
                label: self.marriage_label.clone(),
                plays: vec![self.member_role.clone()],
            },
        ]
    }

    /// Declarations for the integer degree attribute owned by clusters.
    pub fn degree_declarations(&self) -> Vec<SchemaConcept> {
        vec![
            SchemaConcept::Attribute {
                label: self.degree_attribute.clone(),
                datatype: DataType::Long,
            },
            SchemaConcept::Ownership {
                owner: self.cluster_label.clone(),
                attribute: self.degree_attribute.clone(),
            },
        ]
    }

    /// Check that every name is usable as a bare Cypher identifier.
    ///
    /// Labels and relationship types are interpolated into statements, so
    /// anything outside `[A-Za-z_][A-Za-z0-9_]*` is rejected.
    pub fn validate(&self) -> Result<(), String> {
        let names = [
            ("person_label", &self.person_label),
            ("marriage_label", &self.marriage_label),
            ("cluster_label", &self.cluster_label),
            ("grouping_type", &self.grouping_type),
            ("group_role", &self.group_role),
            ("member_role", &self.member_role),
            ("degree_attribute", &self.degree_attribute),
        ];
        for (field, name) in names {
            if !is_identifier(name) {
                return Err(format!("ontology.{field} is not a valid identifier: {name:?}"));
            }
        }
        Ok(())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn default_person() -> String {
    "Person".to_string()
}

fn default_marriage() -> String {
    "Marriage".to_string()
}

fn default_cluster() -> String {
    "Cluster".to_string()
}

fn default_grouping() -> String {
    "GROUPING".to_string()
}

fn default_group_role() -> String {
    "group".to_string()
}

fn default_member_role() -> String {
    "member".to_string()
}

fn default_degree() -> String {
    "degree".to_string()
}

impl Default for Ontology {
    fn default() -> Self {
        Self {
            person_label: default_person(),
            marriage_label: default_marriage(),
            cluster_label: default_cluster(),
            grouping_type: default_grouping(),
            group_role: default_group_role(),
            member_role: default_member_role(),
            degree_attribute: default_degree(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouping_declarations_cover_roles_relation_and_players() {
        let decls = Ontology::default().grouping_declarations();

        assert_eq!(decls.len(), 6);
        assert!(decls.contains(&SchemaConcept::Relation {
            label: "GROUPING".to_string(),
            relates: vec!["group".to_string(), "member".to_string()],
        }));
        assert!(decls.contains(&SchemaConcept::Entity {
            label: "Cluster".to_string(),
            plays: vec!["group".to_string()],
        }));
        let member_players: Vec<_> = decls
            .iter()
            .filter_map(|d| match d {
                SchemaConcept::Entity { label, plays } if plays.contains(&"member".to_string()) => {
                    Some(label.as_str())
                }
                _ => None,
            })
            .collect();
        assert_eq!(member_players, vec!["Person", "Marriage"]);
    }

    #[test]
    fn degree_declarations_are_long_and_owned_by_cluster() {
        let decls = Ontology::default().degree_declarations();
        assert_eq!(
            decls,
            vec![
                SchemaConcept::Attribute {
                    label: "degree".to_string(),
                    datatype: DataType::Long,
                },
                SchemaConcept::Ownership {
                    owner: "Cluster".to_string(),
                    attribute: "degree".to_string(),
                },
            ]
        );
    }

    #[test]
    fn validate_rejects_injection() {
        let ontology = Ontology {
            cluster_label: "Cluster) DETACH DELETE (n".to_string(),
            ..Default::default()
        };
        let err = ontology.validate().unwrap_err();
        assert!(err.contains("cluster_label"));
        assert!(Ontology::default().validate().is_ok());
    }

    #[test]
    fn schema_concept_tagged_by_kind() {
        let json = serde_json::to_string(&SchemaConcept::Role {
            label: "group".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"role","label":"group"}"#);
    }
}
