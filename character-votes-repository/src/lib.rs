//! # Character Votes Repository
//! This crate provides the trait and implementations for interacting with the
//! vote store. It includes definitions for errors, interfaces, a PostgreSQL
//! backend with a realtime insert channel, and an in-memory backend.
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod postgres;

pub use errors::VoteStoreError;
pub use interfaces::{VoteInserted, VoteStore};
pub use memory::InMemoryVoteStore;
pub use postgres::PostgresVoteStore;
