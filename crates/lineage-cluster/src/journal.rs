//! Run journal helpers: time each pipeline step and record its outcome.

use std::future::Future;
use std::time::Instant;

use lineage_core::RunId;
use lineage_journal::session::JournalSession;
use lineage_journal::store::FsJournalStore;
use lineage_journal::{RunRecord, StepRecord};

use crate::error::Result;

/// Journal for one CLI invocation. Its record id is the run id that tags
/// every cluster the invocation writes.
pub struct RunJournal {
    session: JournalSession,
    dir: Option<String>,
}

impl RunJournal {
    /// Start journaling `command` against `graph`. With `dir` unset the
    /// record is kept in memory only.
    pub fn start(graph: &str, command: &str, context: serde_json::Value, dir: Option<String>) -> Self {
        let mut session = JournalSession::new(graph, command);
        session.set_context(context);
        Self { session, dir }
    }

    pub fn run_id(&self) -> RunId {
        RunId(self.session.id().0)
    }

    pub fn steps(&self) -> &[StepRecord] {
        self.session.steps()
    }

    /// Await `fut`, recording its duration and outcome as step `step`.
    /// `describe` turns a successful result into a summary and details.
    pub async fn track<T, F, D>(&mut self, step: &str, fut: F, describe: D) -> Result<T>
    where
        F: Future<Output = Result<T>>,
        D: FnOnce(&T) -> (String, serde_json::Value),
    {
        let started = Instant::now();
        let result = fut.await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(value) => {
                let (summary, details) = describe(value);
                tracing::info!(step, duration_ms, "{summary}");
                self.session
                    .record_step(step, &summary, details, true, duration_ms);
            }
            Err(e) => {
                tracing::error!(step, duration_ms, error = %e, "Step failed");
                self.session.record_step(
                    step,
                    &format!("{step} failed: {e}"),
                    serde_json::json!({ "error": e.to_string() }),
                    false,
                    duration_ms,
                );
            }
        }

        result
    }

    /// Seal the record and, when a directory is configured, store it.
    /// Storage failures are logged, never returned; a record that cannot be
    /// sealed is.
    pub fn finish(self) -> Result<RunRecord> {
        let record = self.session.finalize()?;

        if let Some(dir) = &self.dir {
            match FsJournalStore::new(dir.as_str()) {
                Ok(store) => match store.save(&record) {
                    Ok(path) => tracing::info!(
                        record_id = %record.id,
                        path = %path.display(),
                        "Run journaled"
                    ),
                    Err(e) => tracing::warn!(error = %e, "Failed to store run record"),
                },
                Err(e) => tracing::warn!(error = %e, "Failed to open journal directory"),
            }
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClusterError;
    use lineage_graph::GraphError;

    #[tokio::test]
    async fn track_records_success_and_failure() {
        let mut journal = RunJournal::start("genealogy", "run", serde_json::Value::Null, None);

        let ok = journal
            .track("probe", async { Ok(3usize) }, |n| {
                (format!("Probed {n} vertices"), serde_json::json!({ "count": n }))
            })
            .await
            .unwrap();
        assert_eq!(ok, 3);

        let failed: Result<usize> = journal
            .track(
                "compute_clusters",
                async { Err(ClusterError::Graph(GraphError::Analytics("gds missing".into()))) },
                |_| (String::new(), serde_json::Value::Null),
            )
            .await;
        assert!(failed.is_err());

        let record = journal.finish().unwrap();
        assert_eq!(record.steps.len(), 2);
        assert!(record.steps[0].success);
        assert_eq!(record.steps[0].summary, "Probed 3 vertices");
        assert!(!record.steps[1].success);
        assert!(record.steps[1].summary.contains("gds missing"));
        assert!(record.verify_integrity());
    }

    #[test]
    fn finish_stores_record_when_dir_set() {
        let dir = tempfile::tempdir().unwrap();
        let journal = RunJournal::start(
            "genealogy",
            "ontology",
            serde_json::json!({}),
            Some(dir.path().to_string_lossy().into_owned()),
        );
        let run_id = journal.run_id();

        let record = journal.finish().unwrap();
        assert_eq!(record.id.0, run_id.0);

        let store = FsJournalStore::new(dir.path()).unwrap();
        assert_eq!(store.get("genealogy", record.id).unwrap(), record);
    }
}
