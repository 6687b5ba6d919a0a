//! Boss material cost of finishing a character's talents.
//!
//! Each of attack, skill and burst needs two boss drops to reach 9, one more
//! if it is below 8 and one more if it is below 7.

use std::collections::BTreeMap;

use crate::roster::CharacterEntry;
use crate::types::{BossName, CharacterId, TalentLevels};

/// Cost charged for a character the player does not own: all three talents at 1
pub const UNOWNED_COST: u32 = 12;

/// Boss materials still needed for one talent at level `level`
pub fn level_cost(level: u8) -> u32 {
    let mut need = 0;
    if level < 9 {
        need += 2;
    }
    if level < 8 {
        need += 1;
    }
    if level < 7 {
        need += 1;
    }
    need
}

/// Boss materials still needed for an `[attack, skill, burst]` triple
pub fn cost(levels: TalentLevels) -> u32 {
    levels.iter().copied().map(level_cost).sum()
}

/// What a reconciled entry contributes to its boss
pub fn entry_cost(entry: &CharacterEntry) -> u32 {
    match entry.talent_levels {
        Some(levels) if entry.owned => cost(levels),
        _ => UNOWNED_COST,
    }
}

/// Boss name -> materials still needed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BossNeedTally {
    needs: BTreeMap<BossName, u32>,
}

impl BossNeedTally {
    /// Start every boss at zero so bosses nobody needs are still reported
    pub fn seeded<I>(bosses: I) -> Self
    where
        I: IntoIterator<Item = BossName>,
    {
        Self {
            needs: bosses.into_iter().map(|b| (b, 0)).collect(),
        }
    }

    pub fn add(&mut self, boss: &str, need: u32) {
        *self.needs.entry(boss.to_string()).or_insert(0) += need;
    }

    pub fn get(&self, boss: &str) -> Option<u32> {
        self.needs.get(boss).copied()
    }

    pub fn total(&self) -> u32 {
        self.needs.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.needs.iter().map(|(b, n)| (b.as_str(), *n))
    }

    pub fn into_map(self) -> BTreeMap<BossName, u32> {
        self.needs
    }
}

/// Sum entry costs per boss. Characters without a known boss are logged and skipped.
pub fn tally<'a, I>(
    roster: I,
    character_to_boss: &BTreeMap<CharacterId, BossName>,
    bosses: impl IntoIterator<Item = BossName>,
) -> BossNeedTally
where
    I: IntoIterator<Item = &'a CharacterEntry>,
{
    let mut tally = BossNeedTally::seeded(bosses);
    for entry in roster {
        let Some(boss) = character_to_boss.get(&entry.id) else {
            tracing::warn!(character = entry.id, name = %entry.name, "No weekly boss known for character");
            continue;
        };
        tally.add(boss, entry_cost(entry));
    }
    tally
}
