use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{Character, CharacterKey};

/// Net score (likes minus dislikes) per character key, across all users.
pub type ScoreMap = HashMap<CharacterKey, i64>;

/// A catalog character joined with its net score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCharacter {
    #[serde(flatten)]
    pub character: Character,
    pub score: i64,
}

/// Catalog characters partitioned by the sign of their net score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rankings {
    /// Positive scores, highest first.
    pub beloved: Vec<ScoredCharacter>,
    /// Negative scores, most negative first.
    pub hated: Vec<ScoredCharacter>,
    /// Zero scores, in catalog order.
    pub neutral: Vec<ScoredCharacter>,
}
