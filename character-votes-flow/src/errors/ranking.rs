//! Error types for the ranking refresh.
use character_votes_repository::VoteStoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("Vote store error: {0}")]
    Store(#[from] VoteStoreError),
}
