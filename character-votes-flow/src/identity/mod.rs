//! Identity provider boundary.
//!
//! The voting flow only needs to know whether someone is signed in and, if so,
//! their stable identifier. Everything else about the provider stays behind
//! the [`IdentityProvider`] trait.
use character_votes_shared::types::UserId;
use serde::Serialize;

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            display_name: None,
        }
    }
}

/// Current sign-in state of a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInState {
    /// Identity resolution has not completed. The flow waits indefinitely.
    Loading,
    SignedOut,
    SignedIn(Identity),
}

/// Sign-in and sign-up entry points offered to signed-out users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInAffordances {
    pub sign_in_url: String,
    pub sign_up_url: String,
}

/// Trait implemented by identity providers.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves the sign-in state for a caller presenting `token`.
    ///
    /// # Arguments
    ///
    /// * `token` - The session token sent by the caller, if any.
    ///
    /// # Returns
    ///
    /// `SignedOut` when no token is presented or it does not verify,
    /// `SignedIn` with the caller's identity otherwise, and `Loading` when the
    /// provider itself could not complete resolution.
    async fn resolve(&self, token: Option<&str>) -> SignInState;

    /// Returns the sign-in and sign-up affordances for signed-out callers.
    fn affordances(&self) -> SignInAffordances;
}
