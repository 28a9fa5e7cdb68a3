//! Character Votes Library
//!
//! This library provides the service around the voting flow: configuration,
//! dependency wiring, the identity provider and the HTTP surface.

pub mod auth;
pub mod config;
pub mod errors;
pub mod server;

pub use config::{Dependencies, Settings};
pub use errors::AppError;
