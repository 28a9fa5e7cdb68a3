//! This module defines the `VoteStore` trait, which provides an interface
//! for reading, inserting and watching vote records.
//! It abstracts the managed database behind a request/response contract.
use character_votes_shared::types::{CharacterKey, UserId, Vote};
use tokio::sync::broadcast;

use crate::errors::VoteStoreError;

/// Notification published after a vote has been inserted by any user.
///
/// Consumers use it only as a refresh trigger; the payload is informational.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteInserted {
    /// Key of the inserted vote. `None` when the store may have missed inserts,
    /// e.g. after its notification connection dropped, and every consumer
    /// should refetch.
    pub character_key: Option<CharacterKey>,
}

impl VoteInserted {
    pub fn new(character_key: CharacterKey) -> Self {
        Self {
            character_key: Some(character_key),
        }
    }

    /// Signals that inserts may have gone unannounced.
    pub fn resync() -> Self {
        Self {
            character_key: None,
        }
    }

    pub fn is_resync(&self) -> bool {
        self.character_key.is_none()
    }
}

/// A trait that defines the interface for interacting with the vote store.
///
/// Implementors must reject a second vote for the same `(user, character)`
/// pair with [`VoteStoreError::DuplicateVote`].
#[async_trait::async_trait]
pub trait VoteStore: Send + Sync {
    /// Fetches every vote cast by the given user.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The identifier of the user whose votes are requested.
    ///
    /// # Returns
    ///
    /// The user's votes, or a `VoteStoreError` if the read fails.
    async fn get_user_votes(&self, user_id: &UserId) -> Result<Vec<Vote>, VoteStoreError>;

    /// Fetches every vote of every user, unfiltered.
    async fn get_all_votes(&self) -> Result<Vec<Vote>, VoteStoreError>;

    /// Appends a single vote record.
    ///
    /// # Arguments
    ///
    /// * `vote` - The vote to insert. `created_at` is assigned by the store.
    ///
    /// # Returns
    ///
    /// `Ok(())` on success, [`VoteStoreError::DuplicateVote`] if the user already
    /// voted on the character, or another `VoteStoreError` on failure.
    async fn insert_vote(&self, vote: &Vote) -> Result<(), VoteStoreError>;

    /// Subscribes to insert notifications across all users.
    async fn subscribe_inserts(&self)
    -> Result<broadcast::Receiver<VoteInserted>, VoteStoreError>;

    /// Checks that the `votes` table and the columns the service reads exist.
    async fn check_schema(&self) -> Result<bool, VoteStoreError>;
}
