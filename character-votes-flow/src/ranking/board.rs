use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use character_votes_shared::types::Rankings;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::errors::RankingError;

/// Message shown on the statistics tab when a refresh fails.
pub const STATS_ERROR_MESSAGE: &str = "Could not load global stats.";

/// What the statistics tab renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RankingSnapshot {
    pub loading: bool,
    pub error: Option<String>,
    #[serde(flatten)]
    pub rankings: Rankings,
    /// Sequence number of the refresh that produced this snapshot. 0 before any.
    pub sequence: u64,
}

/// Holds the latest rankings and publishes every accepted update.
///
/// Each refresh takes a sequence number before it fetches. A result is applied
/// only if its sequence is newer than the last applied one, so a slow, older
/// fetch can never overwrite a newer one.
pub struct RankingBoard {
    next_sequence: AtomicU64,
    applied: Mutex<u64>,
    sender: watch::Sender<RankingSnapshot>,
}

impl RankingBoard {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(RankingSnapshot {
            loading: true,
            ..RankingSnapshot::default()
        });
        Self {
            next_sequence: AtomicU64::new(0),
            applied: Mutex::new(0),
            sender,
        }
    }

    /// Reserves the sequence number for a refresh about to start.
    pub fn begin(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Applies the result of refresh `sequence`.
    ///
    /// Returns `false` when a newer refresh has already been applied. A failed
    /// refresh sets the error message and keeps the previous lists.
    pub fn apply(&self, sequence: u64, result: Result<Rankings, RankingError>) -> bool {
        let mut applied = match self.applied.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if sequence <= *applied {
            debug!(sequence, applied = *applied, "Dropping stale ranking refresh");
            return false;
        }
        *applied = sequence;

        self.sender.send_modify(|snapshot| {
            match result {
                Ok(rankings) => {
                    snapshot.rankings = rankings;
                    snapshot.error = None;
                }
                Err(_) => snapshot.error = Some(STATS_ERROR_MESSAGE.to_string()),
            }
            snapshot.loading = false;
            snapshot.sequence = sequence;
        });
        true
    }

    pub fn snapshot(&self) -> RankingSnapshot {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RankingSnapshot> {
        self.sender.subscribe()
    }
}

impl Default for RankingBoard {
    fn default() -> Self {
        Self::new()
    }
}
