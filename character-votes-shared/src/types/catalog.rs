use std::collections::HashSet;
use std::path::Path;

use tracing::warn;

use crate::errors::CatalogError;
use crate::types::{Character, CharacterKey};

/// The ordered, read-only roster of characters.
///
/// Keys are derived once at load time so the voting flow can scan the catalog
/// without re-formatting names on every step.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    characters: Vec<Character>,
    keys: Vec<CharacterKey>,
}

impl Catalog {
    /// Builds a catalog from an ordered list of characters.
    ///
    /// Duplicate keys are not rejected; they are reported once at `warn` level.
    pub fn new(characters: Vec<Character>) -> Self {
        let keys: Vec<CharacterKey> = characters.iter().map(Character::key).collect();

        let mut seen = HashSet::with_capacity(keys.len());
        for key in &keys {
            if !seen.insert(key) {
                warn!(character_key = %key, "Duplicate character key in catalog");
            }
        }

        Self { characters, keys }
    }

    /// Parses a catalog from a JSON array of `{firstName, lastName, image}` objects.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let characters: Vec<Character> = serde_json::from_str(json)?;
        Ok(Self::new(characters))
    }

    /// Reads and parses a catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Character> {
        self.characters.get(index)
    }

    pub fn key_at(&self, index: usize) -> Option<&CharacterKey> {
        self.keys.get(index)
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    /// Iterates characters together with their keys, in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (&CharacterKey, &Character)> {
        self.keys.iter().zip(self.characters.iter())
    }

    /// Returns the first position at or after `start` whose key is not in `voted`.
    ///
    /// `None` means every remaining character has been voted on.
    pub fn next_unvoted(&self, start: usize, voted: &HashSet<CharacterKey>) -> Option<usize> {
        self.keys
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, key)| !voted.contains(*key))
            .map(|(index, _)| index)
    }
}
