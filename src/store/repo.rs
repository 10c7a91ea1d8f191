use anyhow::Result;
use log::{info, warn};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::domain::digest::{Digest, DigestItem};

/// A digest as it was received, newest entries first when listed.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: i64,
    pub at_epoch: i64,
    pub global_summary: Option<String>,
    /// Items without their message bodies.
    pub items: Vec<DigestItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded(i64),
    /// Same items as the most recent entry; nothing written.
    Duplicate,
}

pub trait HistoryRepository {
    fn record_digest(&self, digest: &Digest, at_epoch: i64) -> Result<RecordOutcome>;
    fn list_recent(&self, limit: usize) -> Result<Vec<HistoryEntry>>;
    fn prune_keep_recent(&self, keep: usize) -> Result<()>;
}

pub fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Save a freshly received digest; failures are logged, never returned.
pub fn record_received(repo: &dyn HistoryRepository, digest: &Digest) -> Option<RecordOutcome> {
    match repo.record_digest(digest, now_epoch()) {
        Ok(outcome) => {
            match outcome {
                RecordOutcome::Recorded(id) => info!("digest saved to history as #{id}"),
                RecordOutcome::Duplicate => info!("digest unchanged since last run, not saved"),
            }
            Some(outcome)
        }
        Err(e) => {
            warn!("could not save digest to history: {e:#}");
            None
        }
    }
}
