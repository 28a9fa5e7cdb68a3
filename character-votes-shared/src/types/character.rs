use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity string of a character, used as the join key between the catalog
/// and the stored votes.
///
/// Derived as `firstName-lastName`. The catalog assumes these are unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterKey(String);

impl CharacterKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CharacterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CharacterKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CharacterKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A single entry of the character catalog.
///
/// Characters are immutable and loaded once from static configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub first_name: String,
    pub last_name: String,
    /// Opaque image URL, never fetched by the service.
    pub image: String,
}

impl Character {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            image: image.into(),
        }
    }

    /// Returns the identity key of this character.
    pub fn key(&self) -> CharacterKey {
        CharacterKey(format!("{}-{}", self.first_name, self.last_name))
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
