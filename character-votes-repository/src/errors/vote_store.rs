//! Error types for the vote store.
//! Defines the errors that can occur while reading, inserting and subscribing to votes.
use thiserror::Error;

/// SQLSTATE raised by Postgres on a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE raised by Postgres when a referenced column does not exist.
pub const UNDEFINED_COLUMN: &str = "42703";
/// SQLSTATE raised by Postgres when a referenced table does not exist.
pub const UNDEFINED_TABLE: &str = "42P01";

/// Represents errors that can occur within the vote store.
///
/// Database errors are classified on conversion so callers can tell a benign
/// duplicate vote apart from a broken schema or a generic failure.
#[derive(Debug, Error)]
pub enum VoteStoreError {
    #[error("Duplicate vote: {0}")]
    DuplicateVote(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Missing table: {0}")]
    MissingTable(String),

    #[error("Invalid vote type: {0}")]
    InvalidVoteType(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),
}

impl VoteStoreError {
    /// Returns `true` when the store rejected a vote because the user already
    /// voted on that character.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, VoteStoreError::DuplicateVote(_))
    }

    /// Returns `true` when the store schema is missing a table or column the
    /// service depends on.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            VoteStoreError::MissingColumn(_) | VoteStoreError::MissingTable(_)
        )
    }
}

impl From<sqlx::Error> for VoteStoreError {
    fn from(error: sqlx::Error) -> Self {
        let code = error
            .as_database_error()
            .and_then(|db| db.code().map(|c| c.into_owned()));

        match code.as_deref() {
            Some(UNIQUE_VIOLATION) => VoteStoreError::DuplicateVote(database_message(&error)),
            Some(UNDEFINED_COLUMN) => VoteStoreError::MissingColumn(database_message(&error)),
            Some(UNDEFINED_TABLE) => VoteStoreError::MissingTable(database_message(&error)),
            _ => VoteStoreError::DatabaseError(error),
        }
    }
}

fn database_message(error: &sqlx::Error) -> String {
    error
        .as_database_error()
        .map(|db| db.message().to_string())
        .unwrap_or_else(|| error.to_string())
}
