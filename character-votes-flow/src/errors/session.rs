//! Error types for the voting session.
use thiserror::Error;

/// Represents operations rejected by the voting session state machine.
///
/// Store failures never show up here: the write path logs them and keeps the
/// optimistic progression.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No signed-in user")]
    NotSignedIn,

    #[error("Votes can only be cast while voting is in progress (state: {0})")]
    NotInProgress(&'static str),

    #[error("User votes have already been loaded (state: {0})")]
    NotAwaitingVotes(&'static str),

    #[error("No character at position {0}")]
    NoCurrentCharacter(usize),
}
