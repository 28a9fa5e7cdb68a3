//! In-memory vote store for local development and tests.
//!
//! Enforces the same one-vote-per-user-and-character rule as the Postgres
//! schema and publishes the same insert notifications, so the voting flow and
//! the rankings behave identically on top of it.
use std::sync::RwLock;

use async_trait::async_trait;
use character_votes_shared::types::{UserId, Vote};
use chrono::Utc;
use tokio::sync::broadcast;

use crate::{VoteInserted, VoteStore, VoteStoreError};

const NOTIFICATION_BUFFER: usize = 64;

pub struct InMemoryVoteStore {
    votes: RwLock<Vec<Vote>>,
    notifications: broadcast::Sender<VoteInserted>,
}

impl InMemoryVoteStore {
    pub fn new() -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_BUFFER);
        Self {
            votes: RwLock::new(Vec::new()),
            notifications,
        }
    }

    /// Creates a store pre-populated with votes. No notifications are sent.
    pub fn with_votes(votes: Vec<Vote>) -> Self {
        let store = Self::new();
        if let Ok(mut stored) = store.votes.write() {
            *stored = votes;
        }
        store
    }

    pub fn len(&self) -> usize {
        self.votes.read().map(|votes| votes.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryVoteStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> VoteStoreError {
    VoteStoreError::Unavailable("in-memory vote store lock poisoned".to_string())
}

#[async_trait]
impl VoteStore for InMemoryVoteStore {
    async fn get_user_votes(&self, user_id: &UserId) -> Result<Vec<Vote>, VoteStoreError> {
        let votes = self.votes.read().map_err(|_| poisoned())?;
        Ok(votes.iter().filter(|v| &v.user_id == user_id).cloned().collect())
    }

    async fn get_all_votes(&self) -> Result<Vec<Vote>, VoteStoreError> {
        let votes = self.votes.read().map_err(|_| poisoned())?;
        Ok(votes.clone())
    }

    async fn insert_vote(&self, vote: &Vote) -> Result<(), VoteStoreError> {
        {
            let mut votes = self.votes.write().map_err(|_| poisoned())?;
            let exists = votes
                .iter()
                .any(|v| v.user_id == vote.user_id && v.character_key == vote.character_key);
            if exists {
                return Err(VoteStoreError::DuplicateVote(format!(
                    "user {} already voted on {}",
                    vote.user_id, vote.character_key
                )));
            }

            votes.push(Vote {
                created_at: Some(Utc::now()),
                ..vote.clone()
            });
        }

        let _ = self
            .notifications
            .send(VoteInserted::new(vote.character_key.clone()));
        Ok(())
    }

    async fn subscribe_inserts(
        &self,
    ) -> Result<broadcast::Receiver<VoteInserted>, VoteStoreError> {
        Ok(self.notifications.subscribe())
    }

    async fn check_schema(&self) -> Result<bool, VoteStoreError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use character_votes_shared::types::{CharacterKey, VoteType};

    fn vote(user: &str, key: &str, vote_type: VoteType) -> Vote {
        Vote::new(CharacterKey::from(key), vote_type, UserId::from(user))
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let store = InMemoryVoteStore::new();
        store.insert_vote(&vote("u1", "Walter-White", VoteType::Like)).await.unwrap();
        store.insert_vote(&vote("u2", "Walter-White", VoteType::Dislike)).await.unwrap();

        let all = store.get_all_votes().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|v| v.created_at.is_some()));

        let mine = store.get_user_votes(&UserId::from("u1")).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].vote_type, VoteType::Like);
    }

    #[tokio::test]
    async fn test_duplicate_vote_is_rejected() {
        let store = InMemoryVoteStore::new();
        store.insert_vote(&vote("u1", "Walter-White", VoteType::Like)).await.unwrap();

        let result = store.insert_vote(&vote("u1", "Walter-White", VoteType::Dislike)).await;
        assert!(matches!(result, Err(ref e) if e.is_duplicate()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_notifies_subscribers() {
        let store = InMemoryVoteStore::new();
        let mut receiver = store.subscribe_inserts().await.unwrap();

        store.insert_vote(&vote("u1", "Jesse-Pinkman", VoteType::Like)).await.unwrap();

        let event = receiver.recv().await.unwrap();
        assert_eq!(event, VoteInserted::new(CharacterKey::from("Jesse-Pinkman")));
        assert!(!event.is_resync());
    }

    #[tokio::test]
    async fn test_rejected_insert_does_not_notify() {
        let store = InMemoryVoteStore::with_votes(vec![vote("u1", "Saul-Goodman", VoteType::Like)]);
        let mut receiver = store.subscribe_inserts().await.unwrap();

        let _ = store.insert_vote(&vote("u1", "Saul-Goodman", VoteType::Like)).await;

        assert!(matches!(
            receiver.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
