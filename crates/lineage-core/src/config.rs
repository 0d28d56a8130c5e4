//! Configuration management for the lineage batch job.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`LINEAGE__` prefix, `__` separator)
//! 2. Config file (`lineage.toml` by default)
//! 3. Defaults

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{LineageError, Result};
use crate::ontology::Ontology;

/// Environment variable prefix for overrides, e.g. `LINEAGE__NEO4J__URI`.
pub const ENV_PREFIX: &str = "LINEAGE";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineageConfig {
    #[serde(default)]
    pub neo4j: Neo4jSettings,

    #[serde(default)]
    pub ontology: Ontology,

    #[serde(default)]
    pub pipeline: PipelineSettings,
}

/// Connection settings for the external graph database.
#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jSettings {
    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_password")]
    pub password: String,

    /// Name of the database holding the genealogy graph.
    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

/// Knobs for the batch pipeline itself.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    /// Maximum vertices returned by the connectivity probe.
    #[serde(default = "default_probe_limit")]
    pub probe_limit: u32,

    /// Directory for run journal records.
    #[serde(default = "default_journal_dir")]
    pub journal_dir: String,

    /// Delete clusters written by earlier runs before persisting new ones.
    #[serde(default)]
    pub prune_previous_runs: bool,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "lineage-dev".to_string()
}

fn default_database() -> String {
    "neo4j".to_string()
}

fn default_max_connections() -> u32 {
    4
}

fn default_fetch_size() -> usize {
    500
}

fn default_probe_limit() -> u32 {
    10
}

fn default_journal_dir() -> String {
    "./journal".to_string()
}

impl Default for Neo4jSettings {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            database: default_database(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            probe_limit: default_probe_limit(),
            journal_dir: default_journal_dir(),
            prune_previous_runs: false,
        }
    }
}

impl LineageConfig {
    /// Load configuration from `{file_prefix}.toml` (optional) and the
    /// process environment.
    pub fn load(file_prefix: &str) -> Result<Self> {
        Self::load_with_env(file_prefix, None)
    }

    /// Like [`LineageConfig::load`], reading overrides from `env` instead of
    /// the process environment when it is given.
    pub fn load_with_env(file_prefix: &str, env: Option<HashMap<String, String>>) -> Result<Self> {
        let cfg = ::config::Config::builder()
            .add_source(::config::File::with_name(file_prefix).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let loaded: LineageConfig = cfg.try_deserialize()?;
        loaded
            .ontology
            .validate()
            .map_err(LineageError::Config)?;

        tracing::debug!(
            uri = %loaded.neo4j.uri,
            database = %loaded.neo4j.database,
            "Configuration loaded"
        );
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LineageConfig::default();
        assert_eq!(config.neo4j.uri, "bolt://localhost:7687");
        assert_eq!(config.neo4j.database, "neo4j");
        assert_eq!(config.pipeline.probe_limit, 10);
        assert!(!config.pipeline.prune_previous_runs);
        assert_eq!(config.ontology.cluster_label, "Cluster");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent");
        let config =
            LineageConfig::load_with_env(prefix.to_str().unwrap(), Some(HashMap::new())).unwrap();
        assert_eq!(config.neo4j.user, "neo4j");
        assert_eq!(config.pipeline.journal_dir, "./journal");
    }

    #[test]
    fn test_file_and_env_layering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineage.toml");
        std::fs::write(
            &path,
            r#"
[neo4j]
uri = "bolt://graph.internal:7687"
database = "genealogy"

[ontology]
person_label = "Individual"

[pipeline]
probe_limit = 3
"#,
        )
        .unwrap();

        let mut env = HashMap::new();
        env.insert("LINEAGE__NEO4J__DATABASE".to_string(), "genealogy_test".to_string());

        let prefix = dir.path().join("lineage");
        let config = LineageConfig::load_with_env(prefix.to_str().unwrap(), Some(env)).unwrap();

        assert_eq!(config.neo4j.uri, "bolt://graph.internal:7687");
        assert_eq!(config.neo4j.database, "genealogy_test");
        assert_eq!(config.ontology.person_label, "Individual");
        assert_eq!(config.ontology.marriage_label, "Marriage");
        assert_eq!(config.pipeline.probe_limit, 3);
    }

    #[test]
    fn test_invalid_label_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("bad.toml"),
            "[ontology]\ncluster_label = \"Clu ster\"\n",
        )
        .unwrap();

        let prefix = dir.path().join("bad");
        let err = LineageConfig::load_with_env(prefix.to_str().unwrap(), Some(HashMap::new()))
            .unwrap_err();
        assert!(matches!(err, LineageError::Config(_)));
    }
}
