//! Session-scoped controllers.
//!
//! A [`SessionController`] owns everything one user's UI needs between
//! requests: the active tab and the voting session. The [`SessionRegistry`]
//! keeps one controller per signed-in user.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use character_votes_repository::VoteStore;
use character_votes_shared::types::{Catalog, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::identity::SignInState;
use crate::session::VoteSession;

/// The two tabs of the UI surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Vote,
    Statistics,
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tab::Vote => f.write_str("vote"),
            Tab::Statistics => f.write_str("statistics"),
        }
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vote" => Ok(Tab::Vote),
            "statistics" | "stats" => Ok(Tab::Statistics),
            other => Err(other.to_string()),
        }
    }
}

pub struct SessionController {
    active_tab: Tab,
    vote: VoteSession,
}

impl SessionController {
    pub fn new(vote: VoteSession) -> Self {
        Self {
            active_tab: Tab::default(),
            vote,
        }
    }

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn select_tab(&mut self, tab: Tab) {
        self.active_tab = tab;
    }

    pub fn vote(&self) -> &VoteSession {
        &self.vote
    }

    pub fn vote_mut(&mut self) -> &mut VoteSession {
        &mut self.vote
    }
}

/// One [`SessionController`] per signed-in user, for the lifetime of the process.
pub struct SessionRegistry {
    catalog: Arc<Catalog>,
    store: Arc<dyn VoteStore>,
    sessions: Mutex<HashMap<UserId, Arc<Mutex<SessionController>>>>,
}

impl SessionRegistry {
    pub fn new(catalog: Arc<Catalog>, store: Arc<dyn VoteStore>) -> Self {
        Self {
            catalog,
            store,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the controller for `sign_in`.
    ///
    /// Signed-in users get their own long-lived controller. Anyone else gets a
    /// fresh controller that is not kept.
    pub async fn controller(&self, sign_in: SignInState) -> Arc<Mutex<SessionController>> {
        let SignInState::SignedIn(identity) = sign_in else {
            let mut vote = self.new_session();
            vote.resolve_identity(sign_in);
            return Arc::new(Mutex::new(SessionController::new(vote)));
        };

        let mut sessions = self.sessions.lock().await;
        if let Some(existing) = sessions.get(&identity.user_id) {
            return Arc::clone(existing);
        }

        info!(user_id = %identity.user_id, "Starting voting session");
        let user_id = identity.user_id.clone();
        let mut vote = self.new_session();
        vote.resolve_identity(SignInState::SignedIn(identity));
        let controller = Arc::new(Mutex::new(SessionController::new(vote)));
        sessions.insert(user_id, Arc::clone(&controller));
        controller
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    fn new_session(&self) -> VoteSession {
        VoteSession::new(Arc::clone(&self.catalog), Arc::clone(&self.store))
    }
}
