//! Lineage journal: tamper-evident records of batch runs.
//!
//! Every invocation of the batch job produces one [`RunRecord`]: which graph
//! it touched, which command ran, and the outcome of each pipeline step.
//! Records are content-hashed with BLAKE3 and stored as dated JSON files.

pub mod hash;
pub mod session;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a journal record. Doubles as the run id that tags
/// the clusters a run creates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of one pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepRecord {
    /// Step name (e.g. "compute_clusters", "persist_degrees").
    pub step: String,
    /// Human-readable summary.
    pub summary: String,
    /// Structured counts and parameters.
    pub details: serde_json::Value,
    pub success: bool,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// One batch run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    pub id: RecordId,
    /// Database the run was pointed at.
    pub graph: String,
    /// CLI command that started the run.
    pub command: String,
    /// Effective settings at start.
    pub context: serde_json::Value,
    pub steps: Vec<StepRecord>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// BLAKE3 content hash (hex), set on finalization.
    pub content_hash: Option<String>,
}

impl RunRecord {
    /// Compute the BLAKE3 hash of the record's content (all fields except
    /// `content_hash`).
    pub fn compute_hash(&self) -> Result<String, serde_json::Error> {
        hash::compute_record_hash(self)
    }

    /// Verify that the stored content_hash matches a freshly computed hash.
    /// A record that cannot be hashed never verifies.
    pub fn verify_integrity(&self) -> bool {
        match (&self.content_hash, self.compute_hash()) {
            (Some(stored), Ok(actual)) => *stored == actual,
            _ => false,
        }
    }

    /// True when every recorded step succeeded.
    pub fn succeeded(&self) -> bool {
        self.steps.iter().all(|s| s.success)
    }
}
