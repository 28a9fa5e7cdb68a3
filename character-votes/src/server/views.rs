// Response bodies for the vote and statistics tabs
use character_votes_flow::{RankingSnapshot, SessionState, SignInAffordances, VoteSession};
use character_votes_shared::types::{Character, CharacterKey};
use serde::Serialize;

pub const SIGN_IN_PROMPT: &str = "Please sign in to start voting.";
pub const COMPLETE_MESSAGE: &str =
    "You have voted on all available characters. Check out the statistics!";

/// The character currently up for a vote.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterView {
    pub key: CharacterKey,
    pub name: String,
    #[serde(flatten)]
    pub character: Character,
}

impl CharacterView {
    fn new(character: &Character) -> Self {
        Self {
            key: character.key(),
            name: character.display_name(),
            character: character.clone(),
        }
    }
}

/// What the vote tab renders.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VoteView {
    Loading,
    SignedOut {
        message: &'static str,
        affordances: SignInAffordances,
    },
    InProgress {
        character: CharacterView,
        /// Zero-based catalog position of `character`.
        position: usize,
        total: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        alert: Option<String>,
    },
    Complete {
        message: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        alert: Option<String>,
    },
    /// In progress but with no character to show: an empty catalog or a
    /// position past its end.
    Empty {
        #[serde(skip_serializing_if = "Option::is_none")]
        alert: Option<String>,
    },
}

impl VoteView {
    /// Renders `session`, consuming its pending alert.
    pub fn render(session: &mut VoteSession, affordances: SignInAffordances) -> Self {
        match session.state() {
            SessionState::Loading | SessionState::AwaitingFirstIndex => VoteView::Loading,
            SessionState::Unauthenticated => VoteView::SignedOut {
                message: SIGN_IN_PROMPT,
                affordances,
            },
            SessionState::Complete => VoteView::Complete {
                message: COMPLETE_MESSAGE,
                alert: session.take_alert(),
            },
            SessionState::InProgress { .. } => {
                let current = session
                    .current_character()
                    .map(|(position, character)| (position, CharacterView::new(character)));
                let total = session.catalog().len();
                let alert = session.take_alert();
                match current {
                    Some((position, character)) => VoteView::InProgress {
                        character,
                        position,
                        total,
                        alert,
                    },
                    None => VoteView::Empty { alert },
                }
            }
        }
    }
}

/// The active tab together with its view.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "tab", content = "view", rename_all = "lowercase")]
pub enum TabView {
    Vote(VoteView),
    Statistics(RankingSnapshot),
}
