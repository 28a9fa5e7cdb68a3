//! # Character Votes Shared
//! This crate defines the data structures shared across the character votes services.
//! It includes the character catalog, vote records, user identifiers and the
//! ranking types produced by the aggregation.
pub mod errors;
pub mod types;

pub use errors::CatalogError;
