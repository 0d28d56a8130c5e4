//! BLAKE3 content hashing for tamper evidence.

use serde::Serialize;

use crate::{RecordId, RunRecord, StepRecord};

#[derive(Serialize)]
struct HashableRecord<'a> {
    id: &'a RecordId,
    graph: &'a str,
    command: &'a str,
    context: &'a serde_json::Value,
    steps: &'a [StepRecord],
    started_at: &'a chrono::DateTime<chrono::Utc>,
    completed_at: &'a Option<chrono::DateTime<chrono::Utc>>,
}

/// Hash a record's canonical JSON (without `content_hash`) and return it
/// hex-encoded.
pub fn compute_record_hash(record: &RunRecord) -> Result<String, serde_json::Error> {
    let hashable = HashableRecord {
        id: &record.id,
        graph: &record.graph,
        command: &record.command,
        context: &record.context,
        steps: &record.steps,
        started_at: &record.started_at,
        completed_at: &record.completed_at,
    };

    let mut hasher = blake3::Hasher::new();
    serde_json::to_writer(&mut hasher, &hashable)?;
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::JournalSession;

    fn sealed_record() -> RunRecord {
        let mut session = JournalSession::new("genealogy", "run");
        session.record_step("probe", "Probed 10 vertices", serde_json::json!({"count": 10}), true, 3);
        session.finalize().unwrap()
    }

    #[test]
    fn hash_changes_with_content() {
        let record = sealed_record();

        let mut altered = record.clone();
        altered.steps[0].summary = "Probed 11 vertices".to_string();

        assert_eq!(record.compute_hash().unwrap(), record.compute_hash().unwrap());
        assert_ne!(record.compute_hash().unwrap(), altered.compute_hash().unwrap());
    }

    #[test]
    fn finalize_stores_the_computed_hash() {
        let record = sealed_record();
        let hash = compute_record_hash(&record).unwrap();

        assert_eq!(hash.len(), 64);
        assert_eq!(record.content_hash.as_deref(), Some(hash.as_str()));
        assert!(record.verify_integrity());
    }

    #[test]
    fn unsealed_record_never_verifies() {
        let mut record = sealed_record();
        record.content_hash = None;
        assert!(!record.verify_integrity());
    }
}
