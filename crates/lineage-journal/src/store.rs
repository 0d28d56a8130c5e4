//! Journal storage: one JSON file per run, grouped by the graph it ran
//! against.
//!
//! ```text
//! {root}/
//!   {graph}/
//!     {record_id}.json
//! ```
//!
//! Reading history skips anything in the journal directory that is not a
//! sealed run record, so stray or hand-edited files never hide the rest.

use std::fs;
use std::path::{Path, PathBuf};

use crate::{RecordId, RunRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("No run record {id} for graph {graph}")]
    NotFound { graph: String, id: RecordId },

    #[error("Integrity check failed for run record {0}: stored hash does not match content")]
    IntegrityViolation(RecordId),

    #[error("Run record {0} has no content hash (not finalized)")]
    NotFinalized(RecordId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Which runs `history` returns.
#[derive(Debug, Default)]
pub struct HistoryFilter {
    /// Only runs against this graph; every graph when unset.
    pub graph: Option<String>,
    /// Only runs of this CLI command.
    pub command: Option<String>,
    /// Keep at most this many (newest first).
    pub limit: Option<usize>,
}

/// Run journal kept in a local directory.
pub struct FsJournalStore {
    root: PathBuf,
}

impl FsJournalStore {
    /// Open the journal at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn graph_dir(&self, graph: &str) -> PathBuf {
        self.root.join(dir_name(graph))
    }

    fn record_path(&self, graph: &str, id: RecordId) -> PathBuf {
        self.graph_dir(graph).join(format!("{id}.json"))
    }

    /// Write a sealed record. Returns the file it was written to.
    pub fn save(&self, record: &RunRecord) -> Result<PathBuf, StoreError> {
        if record.content_hash.is_none() {
            return Err(StoreError::NotFinalized(record.id));
        }

        fs::create_dir_all(self.graph_dir(&record.graph))?;
        let path = self.record_path(&record.graph, record.id);
        fs::write(&path, serde_json::to_vec_pretty(record)?)?;

        tracing::debug!(record_id = %record.id, path = %path.display(), "Run record saved");
        Ok(path)
    }

    /// Read run `id` against `graph`, rejecting it if its hash does not match.
    pub fn get(&self, graph: &str, id: RecordId) -> Result<RunRecord, StoreError> {
        let path = self.record_path(graph, id);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    graph: graph.to_string(),
                    id,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let record: RunRecord = serde_json::from_slice(&raw)?;
        if !record.verify_integrity() {
            return Err(StoreError::IntegrityViolation(id));
        }
        Ok(record)
    }

    /// Sealed records matching `filter`, newest first.
    pub fn history(&self, filter: &HistoryFilter) -> Result<Vec<RunRecord>, StoreError> {
        let dirs = match &filter.graph {
            Some(graph) => vec![self.graph_dir(graph)],
            None => fs::read_dir(&self.root)?
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .collect(),
        };

        let mut records = Vec::new();
        for dir in dirs {
            if !dir.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&dir)?.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let Some(record) = read_sealed(&path) else {
                    continue;
                };
                if filter.command.as_ref().is_some_and(|c| *c != record.command) {
                    continue;
                }
                records.push(record);
            }
        }

        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }
}

/// Parse `path` as a run record, returning `None` (and logging) for anything
/// unreadable, foreign, or tampered with.
fn read_sealed(path: &Path) -> Option<RunRecord> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unreadable journal file skipped");
            return None;
        }
    };
    let record: RunRecord = match serde_json::from_slice(&raw) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Not a run record, skipped");
            return None;
        }
    };
    if !record.verify_integrity() {
        tracing::warn!(record_id = %record.id, path = %path.display(), "Tampered run record skipped");
        return None;
    }
    Some(record)
}

/// Directory name for a graph. Anything but ASCII alphanumerics, `-` and `_`
/// becomes `_`, so a graph name can never escape the journal root.
fn dir_name(graph: &str) -> String {
    let name: String = graph
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() {
        "_".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::JournalSession;

    fn sealed(graph: &str, command: &str) -> RunRecord {
        let mut session = JournalSession::new(graph, command);
        session.set_context(serde_json::json!({"probe_limit": 10}));
        session.record_step(
            "compute_clusters",
            "Computed 2 clusters",
            serde_json::json!({"clusters": 2, "members": 5}),
            true,
            15,
        );
        session.finalize().unwrap()
    }

    #[test]
    fn save_places_record_under_its_graph() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsJournalStore::new(dir.path()).unwrap();
        let record = sealed("genealogy", "run");

        let path = store.save(&record).unwrap();

        assert_eq!(path, dir.path().join("genealogy").join(format!("{}.json", record.id)));
        assert_eq!(store.get("genealogy", record.id).unwrap(), record);
    }

    #[test]
    fn get_rejects_edited_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsJournalStore::new(dir.path()).unwrap();
        let record = sealed("genealogy", "run");
        let path = store.save(&record).unwrap();

        let mut edited = record.clone();
        edited.steps[0].details = serde_json::json!({"clusters": 200, "members": 5});
        fs::write(&path, serde_json::to_vec(&edited).unwrap()).unwrap();

        assert!(matches!(
            store.get("genealogy", record.id),
            Err(StoreError::IntegrityViolation(_))
        ));
    }

    #[test]
    fn save_rejects_unsealed_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsJournalStore::new(dir.path()).unwrap();
        let mut record = sealed("genealogy", "probe");
        record.content_hash = None;

        assert!(matches!(store.save(&record), Err(StoreError::NotFinalized(_))));
    }

    #[test]
    fn get_under_other_graph_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsJournalStore::new(dir.path()).unwrap();
        let record = sealed("genealogy", "run");
        store.save(&record).unwrap();

        assert!(matches!(
            store.get("scratch", record.id),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.get("genealogy", RecordId::new()),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn history_filters_by_command_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsJournalStore::new(dir.path()).unwrap();

        store.save(&sealed("genealogy", "run")).unwrap();
        store.save(&sealed("genealogy", "probe")).unwrap();
        store.save(&sealed("genealogy", "run")).unwrap();

        let runs = store
            .history(&HistoryFilter {
                command: Some("run".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|r| r.command == "run"));
        assert!(runs[0].started_at >= runs[1].started_at);

        let latest = store
            .history(&HistoryFilter {
                limit: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(latest.len(), 1);
    }

    #[test]
    fn history_spans_graphs_unless_one_is_named() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsJournalStore::new(dir.path()).unwrap();

        store.save(&sealed("genealogy", "run")).unwrap();
        store.save(&sealed("scratch", "run")).unwrap();

        assert_eq!(store.history(&HistoryFilter::default()).unwrap().len(), 2);

        let scratch = store
            .history(&HistoryFilter {
                graph: Some("scratch".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(scratch.len(), 1);
        assert_eq!(scratch[0].graph, "scratch");

        let unknown = store
            .history(&HistoryFilter {
                graph: Some("missing".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert!(unknown.is_empty());
    }

    #[test]
    fn history_skips_files_that_are_not_sealed_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsJournalStore::new(dir.path()).unwrap();
        let kept = sealed("genealogy", "run");
        store.save(&kept).unwrap();

        let graph_dir = dir.path().join("genealogy");
        fs::write(graph_dir.join("notes.json"), r#"{"hello":1}"#).unwrap();
        fs::write(graph_dir.join("broken.json"), "{not json").unwrap();
        fs::write(graph_dir.join("README"), "journal").unwrap();
        fs::write(dir.path().join("stray.json"), r#"{"hello":1}"#).unwrap();

        let mut edited = sealed("genealogy", "run");
        edited.command = "persist-degrees".to_string();
        fs::write(
            graph_dir.join(format!("{}.json", edited.id)),
            serde_json::to_vec(&edited).unwrap(),
        )
        .unwrap();

        let history = store.history(&HistoryFilter::default()).unwrap();
        assert_eq!(history, vec![kept]);
    }

    #[test]
    fn graph_names_stay_inside_the_root() {
        assert_eq!(dir_name("genealogy"), "genealogy");
        assert_eq!(dir_name("graph-2_b"), "graph-2_b");
        assert_eq!(dir_name("../etc"), "___etc");
        assert_eq!(dir_name(""), "_");
    }
}
