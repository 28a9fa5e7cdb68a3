//! Configuration module for the Character Votes service.
//! Defines and manages application-wide settings and dependencies.
mod dependencies;
mod settings;

pub use dependencies::Dependencies;
pub use settings::{AuthSettings, LogFormat, Settings};
