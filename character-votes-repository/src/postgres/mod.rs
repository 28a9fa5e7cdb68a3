//! PostgreSQL implementation of the vote store.
mod vote_store;

pub use vote_store::{PostgresVoteStore, REQUIRED_COLUMNS, VOTES_INSERTED_CHANNEL};
