//! Identifiers shared by the daily table, the weekly catalogs and the roster.

/// Character (avatar) id, e.g. `10000002`
pub type CharacterId = u32;

/// Talent book / weapon ascension material id
pub type MaterialId = u32;

/// Weapon id, e.g. `11401`
pub type WeaponId = u32;

/// Display name of a weekly boss, as reported by the material catalog
pub type BossName = String;

/// The player's own avatar comes in two genders and never drops boss materials
pub const TRAVELER_IDS: [CharacterId; 2] = [10000005, 10000007];

/// Talent levels in `[attack, skill, burst]` order
pub type TalentLevels = [u8; 3];
