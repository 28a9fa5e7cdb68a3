mod catalog;
mod character;
mod rankings;
mod user;
mod vote;

pub use catalog::Catalog;
pub use character::{Character, CharacterKey};
pub use rankings::{Rankings, ScoreMap, ScoredCharacter};
pub use user::UserId;
pub use vote::{Vote, VoteType};
