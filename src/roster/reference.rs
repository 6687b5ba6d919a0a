use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::CharacterEntry;
use crate::types::CharacterId;

/// Static data about a character, used to show characters the player lacks
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CharacterInfo {
    pub name: String,
    pub rarity: u8,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Character id -> static data
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    characters: HashMap<CharacterId, CharacterInfo>,
}

impl ReferenceCatalog {
    pub fn new(characters: HashMap<CharacterId, CharacterInfo>) -> Self {
        Self { characters }
    }

    /// Load a JSON object keyed by character id
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read character data: {:?}", path))?;
        Self::from_json(&raw).with_context(|| format!("Failed to parse character data: {:?}", path))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let by_key: HashMap<String, CharacterInfo> = serde_json::from_str(raw)?;
        let characters = by_key
            .into_iter()
            .map(|(key, info)| {
                let id = key
                    .parse::<CharacterId>()
                    .with_context(|| format!("Invalid character id: {key}"))?;
                Ok((id, info))
            })
            .collect::<Result<_>>()?;
        Ok(Self { characters })
    }

    pub fn get(&self, id: CharacterId) -> Option<&CharacterInfo> {
        self.characters.get(&id)
    }

    /// Placeholder entry for a character, if the catalog knows it
    pub fn placeholder(&self, id: CharacterId) -> Option<CharacterEntry> {
        let info = self.get(id)?;
        let entry = CharacterEntry::placeholder(id, info.name.clone(), info.rarity);
        Some(entry.with_icon(info.icon.clone()))
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}
