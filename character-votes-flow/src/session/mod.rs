//! The per-user voting session.
//!
//! A session walks the catalog in order, skipping characters the user already
//! voted on. Casting a vote is a two-phase operation: [`VoteSession::begin_vote`]
//! advances the local position immediately, and [`VoteSession::apply_outcome`]
//! folds the store's answer in once it arrives. The local position is never
//! rolled back.
mod reconcile;

use std::collections::HashSet;
use std::sync::Arc;

use character_votes_repository::{VoteStore, VoteStoreError};
use character_votes_shared::types::{Catalog, Character, CharacterKey, Vote, VoteType};
use tracing::{debug, error, info, warn};

use crate::errors::SessionError;
use crate::identity::{Identity, SignInState};

pub use reconcile::{SCHEMA_ALERT, VoteOutcome, reconcile};

/// States of the voting session.
///
/// `Loading → {Unauthenticated, AwaitingFirstIndex} → {InProgress, Complete}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Unauthenticated,
    AwaitingFirstIndex,
    InProgress { current_index: usize },
    Complete,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Loading => "loading",
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::AwaitingFirstIndex => "awaiting_first_index",
            SessionState::InProgress { .. } => "in_progress",
            SessionState::Complete => "complete",
        }
    }
}

/// A vote that has been applied locally but not yet confirmed by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVote {
    pub vote: Vote,
}

pub struct VoteSession {
    catalog: Arc<Catalog>,
    store: Arc<dyn VoteStore>,
    state: SessionState,
    identity: Option<Identity>,
    voted: HashSet<CharacterKey>,
    alert: Option<String>,
}

impl VoteSession {
    pub fn new(catalog: Arc<Catalog>, store: Arc<dyn VoteStore>) -> Self {
        Self {
            catalog,
            store,
            state: SessionState::Loading,
            identity: None,
            voted: HashSet::new(),
            alert: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> Arc<dyn VoteStore> {
        Arc::clone(&self.store)
    }

    pub fn voted_keys(&self) -> &HashSet<CharacterKey> {
        &self.voted
    }

    /// Applies the outcome of identity resolution.
    ///
    /// A still-loading provider keeps the session in `Loading`. A newly
    /// signed-in user resets the voted set and waits for their votes; the same
    /// user signing in again is a no-op.
    pub fn resolve_identity(&mut self, sign_in: SignInState) {
        match sign_in {
            SignInState::Loading => {}
            SignInState::SignedOut => {
                self.identity = None;
                self.voted.clear();
                self.state = SessionState::Unauthenticated;
            }
            SignInState::SignedIn(identity) => {
                let same_user = self
                    .identity
                    .as_ref()
                    .is_some_and(|current| current.user_id == identity.user_id);
                if same_user {
                    return;
                }

                debug!(user_id = %identity.user_id, "Identity resolved");
                self.identity = Some(identity);
                self.voted.clear();
                self.state = SessionState::AwaitingFirstIndex;
            }
        }
    }

    /// Fetches the user's existing votes and lands on the first unvoted character.
    ///
    /// A failed fetch is logged and the session starts from the top of the
    /// catalog with an empty voted set. A missing column or table also raises
    /// the schema alert.
    pub async fn load_user_votes(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::AwaitingFirstIndex {
            return Err(SessionError::NotAwaitingVotes(self.state.name()));
        }
        let user_id = self
            .identity
            .as_ref()
            .map(|identity| identity.user_id.clone())
            .ok_or(SessionError::NotSignedIn)?;

        match self.store.get_user_votes(&user_id).await {
            Ok(votes) => {
                self.voted = votes.into_iter().map(|v| v.character_key).collect();
                self.state = self.advance_from(0);
                info!(
                    user_id = %user_id,
                    voted = self.voted.len(),
                    state = self.state.name(),
                    "Loaded user votes"
                );
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Error fetching user votes");
                if e.is_schema_error() {
                    self.alert = Some(SCHEMA_ALERT.to_string());
                }
                self.state = SessionState::InProgress { current_index: 0 };
            }
        }

        Ok(())
    }

    /// The character currently up for a vote.
    ///
    /// `None` outside `InProgress`, and also when the position is out of the
    /// catalog's range.
    pub fn current_character(&self) -> Option<(usize, &Character)> {
        match self.state {
            SessionState::InProgress { current_index } => self
                .catalog
                .get(current_index)
                .map(|character| (current_index, character)),
            _ => None,
        }
    }

    /// First phase of casting a vote: advance locally and hand back the vote to write.
    ///
    /// The next position skips every key already known to be voted on. The
    /// session is `Complete` once nothing remains, whatever the store later answers.
    pub fn begin_vote(&mut self, vote_type: VoteType) -> Result<PendingVote, SessionError> {
        let SessionState::InProgress { current_index } = self.state else {
            return Err(SessionError::NotInProgress(self.state.name()));
        };
        let user_id = self
            .identity
            .as_ref()
            .map(|identity| identity.user_id.clone())
            .ok_or(SessionError::NotSignedIn)?;
        let key = self
            .catalog
            .key_at(current_index)
            .cloned()
            .ok_or(SessionError::NoCurrentCharacter(current_index))?;

        self.state = self.advance_from(current_index + 1);

        Ok(PendingVote {
            vote: Vote::new(key, vote_type, user_id),
        })
    }

    /// Second phase of casting a vote: fold the store's answer into the session.
    pub fn apply_outcome(
        &mut self,
        pending: &PendingVote,
        result: Result<(), VoteStoreError>,
    ) -> VoteOutcome {
        let vote = &pending.vote;
        let still_same_user = self
            .identity
            .as_ref()
            .is_some_and(|identity| identity.user_id == vote.user_id);

        let outcome = if still_same_user {
            reconcile(&mut self.voted, &vote.character_key, &result)
        } else {
            let mut detached = HashSet::new();
            reconcile(&mut detached, &vote.character_key, &result)
        };

        match &outcome {
            VoteOutcome::Recorded => {
                debug!(user_id = %vote.user_id, character_key = %vote.character_key, "Vote recorded");
            }
            VoteOutcome::Duplicate => {
                warn!(user_id = %vote.user_id, character_key = %vote.character_key, "Duplicate vote prevented");
            }
            VoteOutcome::SchemaAlert(message) => {
                error!(user_id = %vote.user_id, character_key = %vote.character_key, "Error saving vote: {}", message);
                self.alert = Some(message.clone());
            }
            VoteOutcome::Failed(message) => {
                error!(user_id = %vote.user_id, character_key = %vote.character_key, error = %message, "Error saving vote");
            }
        }

        outcome
    }

    /// Casts a vote end to end: optimistic advance, store insert, reconciliation.
    pub async fn cast_vote(&mut self, vote_type: VoteType) -> Result<VoteOutcome, SessionError> {
        let pending = self.begin_vote(vote_type)?;
        let result = self.store.insert_vote(&pending.vote).await;
        Ok(self.apply_outcome(&pending, result))
    }

    /// Takes the pending user-facing alert, if any. Each alert is shown once.
    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    fn advance_from(&self, start: usize) -> SessionState {
        match self.catalog.next_unvoted(start, &self.voted) {
            Some(current_index) => SessionState::InProgress { current_index },
            None => SessionState::Complete,
        }
    }
}
