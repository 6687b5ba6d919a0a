pub mod account;
pub mod reconcile;
pub mod reference;

pub use account::*;
pub use reconcile::*;
pub use reference::*;

use serde::{Deserialize, Serialize};

use crate::types::{CharacterId, TalentLevels};

/// A character as seen by one request: owned with live data, or a placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterEntry {
    pub id: CharacterId,
    pub name: String,
    pub rarity: u8,
    pub level: u8,
    pub constellation: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// `[attack, skill, burst]`, once read from the account
    pub talent_levels: Option<TalentLevels>,
    /// False for placeholders built from reference data
    pub owned: bool,
}

impl CharacterEntry {
    /// Identity-only entry for a character the player does not own
    pub fn placeholder(id: CharacterId, name: String, rarity: u8) -> Self {
        Self {
            id,
            name,
            rarity,
            level: 0,
            constellation: 0,
            icon: None,
            talent_levels: None,
            owned: false,
        }
    }

    pub fn with_icon(self, icon: Option<String>) -> Self {
        Self { icon, ..self }
    }

    /// Mark the entry as coming from the player's account
    pub fn owned(self) -> Self {
        Self {
            owned: true,
            ..self
        }
    }
}
