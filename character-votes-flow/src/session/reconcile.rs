//! Reconciliation of an optimistic vote with the store's answer.
use std::collections::HashSet;

use character_votes_repository::VoteStoreError;
use character_votes_shared::types::CharacterKey;
use serde::Serialize;

/// Alert shown when the vote store is missing the schema the flow relies on.
pub const SCHEMA_ALERT: &str = "DATABASE ERROR: the votes table or one of its columns \
     (character_id, vote_type, user_id, created_at) is missing. Apply the votes migration before voting.";

/// Result of confirming an optimistic vote against the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum VoteOutcome {
    /// The store accepted the vote; its key joined the voted set.
    Recorded,
    /// The store already had a vote for this user and character.
    Duplicate,
    /// The store schema is broken; the message must be shown to the user.
    SchemaAlert(String),
    /// Any other failure. Logged only, never retried.
    Failed(String),
}

/// Folds the store's answer for `key` into the user's voted set.
///
/// Success is an idempotent set union. Every failure leaves the set untouched
/// and never rolls back the optimistic advance that preceded the write.
pub fn reconcile(
    voted: &mut HashSet<CharacterKey>,
    key: &CharacterKey,
    result: &Result<(), VoteStoreError>,
) -> VoteOutcome {
    match result {
        Ok(()) => {
            voted.insert(key.clone());
            VoteOutcome::Recorded
        }
        Err(e) if e.is_duplicate() => VoteOutcome::Duplicate,
        Err(e) if e.is_schema_error() => VoteOutcome::SchemaAlert(SCHEMA_ALERT.to_string()),
        Err(e) => VoteOutcome::Failed(e.to_string()),
    }
}
