//! Builder-pattern recorder for a batch run.
//!
//! ```no_run
//! # use lineage_journal::session::JournalSession;
//! let mut session = JournalSession::new("genealogy", "run");
//! session.set_context(serde_json::json!({"probe_limit": 10}));
//! session.record_step("probe", "Probed 10 vertices", serde_json::json!({"count": 10}), true, 12);
//! let record = session.finalize()?;
//! assert!(record.content_hash.is_some());
//! # Ok::<(), serde_json::Error>(())
//! ```

use chrono::Utc;

use crate::{RecordId, RunRecord, StepRecord};

/// Records the steps of one run incrementally.
pub struct JournalSession {
    record: RunRecord,
}

impl JournalSession {
    /// Start recording a run of `command` against `graph`.
    pub fn new(graph: &str, command: &str) -> Self {
        Self {
            record: RunRecord {
                id: RecordId::new(),
                graph: graph.to_string(),
                command: command.to_string(),
                context: serde_json::Value::Null,
                steps: Vec::new(),
                started_at: Utc::now(),
                completed_at: None,
                content_hash: None,
            },
        }
    }

    pub fn set_context(&mut self, context: serde_json::Value) {
        self.record.context = context;
    }

    /// Record the outcome of one pipeline step.
    pub fn record_step(
        &mut self,
        step: &str,
        summary: &str,
        details: serde_json::Value,
        success: bool,
        duration_ms: u64,
    ) {
        self.record.steps.push(StepRecord {
            step: step.to_string(),
            summary: summary.to_string(),
            details,
            success,
            duration_ms,
            timestamp: Utc::now(),
        });
    }

    /// The record id (available before finalization).
    pub fn id(&self) -> RecordId {
        self.record.id
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.record.steps
    }

    /// Set completed_at and compute the content hash.
    pub fn finalize(mut self) -> Result<RunRecord, serde_json::Error> {
        self.record.completed_at = Some(Utc::now());
        let hash = self.record.compute_hash()?;
        self.record.content_hash = Some(hash);
        Ok(self.record)
    }
}
