use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::{CharacterKey, UserId};

/// Represents the type of vote cast by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    /// Counts +1 towards the character's net score.
    Like,
    /// Counts -1 towards the character's net score.
    Dislike,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Like => "like",
            VoteType::Dislike => "dislike",
        }
    }

    /// Contribution of this vote to a net score.
    pub fn weight(&self) -> i64 {
        match self {
            VoteType::Like => 1,
            VoteType::Dislike => -1,
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(VoteType::Like),
            "dislike" => Ok(VoteType::Dislike),
            other => Err(other.to_string()),
        }
    }
}

/// A single vote record.
///
/// At most one vote exists per `(user_id, character_key)` pair; the store
/// enforces this, not the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub character_key: CharacterKey,
    pub vote_type: VoteType,
    pub user_id: UserId,
    /// Assigned by the store on insert; `None` for votes not yet persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Vote {
    pub fn new(character_key: CharacterKey, vote_type: VoteType, user_id: UserId) -> Self {
        Self {
            character_key,
            vote_type,
            user_id,
            created_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_type_parses_wire_values() {
        assert_eq!("like".parse::<VoteType>(), Ok(VoteType::Like));
        assert_eq!("dislike".parse::<VoteType>(), Ok(VoteType::Dislike));
        assert_eq!("meh".parse::<VoteType>(), Err("meh".to_string()));
    }

    #[test]
    fn test_vote_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&VoteType::Dislike).unwrap(), "\"dislike\"");
        let parsed: VoteType = serde_json::from_str("\"like\"").unwrap();
        assert_eq!(parsed, VoteType::Like);
    }

    #[test]
    fn test_weights() {
        assert_eq!(VoteType::Like.weight(), 1);
        assert_eq!(VoteType::Dislike.weight(), -1);
    }
}
