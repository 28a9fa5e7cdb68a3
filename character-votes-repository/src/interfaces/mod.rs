//! This module defines and re-exports the interfaces for the vote store.
mod vote_store;

pub use vote_store::{VoteInserted, VoteStore};
