//! The player's account, as far as this crate needs it.
//!
//! Account lookup and authentication live with the game provider; this
//! module fixes the interface, wraps per-character talent reads in a
//! handle that stops calling upstream once the account is known to be
//! broken, and ships a file-backed provider for offline use.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::CharacterEntry;
use crate::error::{AccountError, TalentError};
use crate::types::{CharacterId, TalentLevels, TRAVELER_IDS};

/// Upstream code for "too many requests / account restricted"
pub const RESTRICTED_CODE: i32 = -502002;

/// Which of the user's bound accounts to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountSelector {
    pub player_id: Option<u64>,
    pub offset: Option<usize>,
}

/// A talent as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Talent {
    #[serde(rename = "type")]
    pub kind: String,
    pub level: u8,
}

/// Looks up the game account bound to a user
#[async_trait]
pub trait RosterProvider: Send + Sync {
    async fn account(
        &self,
        user_id: u64,
        selector: AccountSelector,
    ) -> Result<Box<dyn AccountHandle>, AccountError>;
}

/// A live account
#[async_trait]
pub trait AccountHandle: Send + Sync {
    fn player_id(&self) -> u64;

    /// Owned characters; talent levels are read separately
    async fn characters(&self) -> Result<Vec<CharacterEntry>, AccountError>;

    async fn talents(&self, character: CharacterId) -> Result<Vec<Talent>, TalentError>;
}

/// Owned characters keyed by id, without the traveler
pub async fn owned_characters(
    handle: &dyn AccountHandle,
) -> Result<HashMap<CharacterId, CharacterEntry>, AccountError> {
    let characters = handle.characters().await?;
    Ok(characters
        .into_iter()
        .filter(|c| !TRAVELER_IDS.contains(&c.id))
        .map(|c| (c.id, c.owned()))
        .collect())
}

/// Pick `[attack, skill, burst]` out of a talent list
pub fn combat_talents(talents: &[Talent]) -> Option<TalentLevels> {
    let level = |kind: &str| talents.iter().find(|t| t.kind == kind).map(|t| t.level);
    Some([level("attack")?, level("skill")?, level("burst")?])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Usable,
    /// Terminal: no further calls go upstream
    Damaged,
}

/// Wraps an account handle for the length of one request.
///
/// Rejected credentials or [`RESTRICTED_CODE`] move the handle to
/// [`HandleState::Damaged`]; from then on every read returns no data without
/// touching upstream. The restricted code is still returned to the caller
/// that triggered it, other API errors are returned without a state change.
pub struct FragileHandle<'a> {
    inner: &'a dyn AccountHandle,
    state: HandleState,
}

impl<'a> FragileHandle<'a> {
    pub fn new(inner: &'a dyn AccountHandle) -> Self {
        Self {
            inner,
            state: HandleState::Usable,
        }
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    /// Talent levels of one character, `None` when they cannot be read
    pub async fn talent_levels(
        &mut self,
        character: CharacterId,
    ) -> Result<Option<TalentLevels>, TalentError> {
        if self.state == HandleState::Damaged {
            return Ok(None);
        }

        match self.inner.talents(character).await {
            Ok(talents) => {
                let levels = combat_talents(&talents);
                if levels.is_none() {
                    tracing::warn!(character, "Incomplete talent data");
                }
                Ok(levels)
            }
            Err(TalentError::InvalidCredentials) => {
                self.damage(character);
                Ok(None)
            }
            Err(e @ TalentError::Api { code, .. }) if code == RESTRICTED_CODE => {
                self.damage(character);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn damage(&mut self, character: CharacterId) {
        tracing::warn!(
            player_id = self.inner.player_id(),
            character,
            "Account handle damaged, skipping further talent reads",
        );
        self.state = HandleState::Damaged;
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RosterFile {
    player_id: u64,
    characters: Vec<RosterCharacter>,
}

#[derive(Debug, Clone, Deserialize)]
struct RosterCharacter {
    id: CharacterId,
    name: String,
    rarity: u8,
    #[serde(default)]
    level: u8,
    #[serde(default)]
    constellation: u8,
    #[serde(default)]
    talents: Vec<Talent>,
}

/// Roster exported to a JSON file
pub struct OfflineRoster {
    roster: Option<RosterFile>,
}

impl OfflineRoster {
    /// `None` behaves like a user without a bound account
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let roster = path
            .map(|path| {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read roster: {:?}", path))?;
                serde_json::from_str::<RosterFile>(&raw)
                    .with_context(|| format!("Failed to parse roster: {:?}", path))
            })
            .transpose()?;
        Ok(Self { roster })
    }

    pub fn from_path(path: Option<PathBuf>) -> Result<Self> {
        Self::load(path.as_deref())
    }
}

#[async_trait]
impl RosterProvider for OfflineRoster {
    async fn account(
        &self,
        _user_id: u64,
        selector: AccountSelector,
    ) -> Result<Box<dyn AccountHandle>, AccountError> {
        let roster = self.roster.as_ref().ok_or(AccountError::NotBound)?;

        // A single export holds a single account
        let wrong_player = selector.player_id.is_some_and(|id| id != roster.player_id);
        let wrong_offset = selector.offset.is_some_and(|o| o != 0);
        if wrong_player || wrong_offset {
            return Err(AccountError::PlayerNotFound);
        }

        Ok(Box::new(OfflineAccount {
            roster: roster.clone(),
        }))
    }
}

struct OfflineAccount {
    roster: RosterFile,
}

#[async_trait]
impl AccountHandle for OfflineAccount {
    fn player_id(&self) -> u64 {
        self.roster.player_id
    }

    async fn characters(&self) -> Result<Vec<CharacterEntry>, AccountError> {
        Ok(self
            .roster
            .characters
            .iter()
            .map(|c| CharacterEntry {
                id: c.id,
                name: c.name.clone(),
                rarity: c.rarity,
                level: c.level,
                constellation: c.constellation,
                icon: None,
                talent_levels: None,
                owned: true,
            })
            .collect())
    }

    async fn talents(&self, character: CharacterId) -> Result<Vec<Talent>, TalentError> {
        Ok(self
            .roster
            .characters
            .iter()
            .find(|c| c.id == character)
            .map(|c| c.talents.clone())
            .unwrap_or_default())
    }
}
