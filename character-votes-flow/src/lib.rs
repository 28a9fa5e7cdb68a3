//! # Character Votes Flow
//! This crate holds the client-side behaviour of the voting application: the
//! identity gate, the per-user voting session, the ranking aggregation and the
//! push-driven ranking refresh. Every piece talks to the vote store through the
//! `VoteStore` trait only.
pub mod controller;
pub mod errors;
pub mod identity;
pub mod ranking;
pub mod session;

pub use controller::{SessionController, SessionRegistry, Tab};
pub use errors::{RankingError, SessionError};
pub use identity::{Identity, IdentityProvider, SignInAffordances, SignInState};
pub use ranking::{RankingBoard, RankingRefresher, RankingSnapshot};
pub use session::{PendingVote, SessionState, VoteOutcome, VoteSession};
