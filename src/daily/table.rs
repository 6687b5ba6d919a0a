use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{CharacterId, MaterialId, WeaponId};

/// Weekday names in table order; Monday is 0
pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// On Sunday every domain is open, so its entry enumerates the full roster
pub const ALL_MATERIALS_DAY: usize = 6;

/// What one region offers on one weekday
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaDailyMaterials {
    /// Characters whose talent books drop here
    pub avatar_ids: BTreeSet<CharacterId>,
    /// Talent books, in page order
    pub avatar_material_ids: Vec<MaterialId>,
    /// Weapons whose ascension materials drop here
    pub weapon_ids: BTreeSet<WeaponId>,
    /// Weapon ascension materials, in page order
    pub weapon_material_ids: Vec<MaterialId>,
}

impl AreaDailyMaterials {
    pub fn is_empty(&self) -> bool {
        self.avatar_material_ids.is_empty() && self.weapon_material_ids.is_empty()
    }
}

/// Region name -> materials for that region
pub type DayMaterials = BTreeMap<String, AreaDailyMaterials>;

/// Farmable materials for every weekday and region
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyMaterialTable {
    days: [DayMaterials; 7],
}

impl DailyMaterialTable {
    pub fn new(days: [DayMaterials; 7]) -> Self {
        Self { days }
    }

    /// Materials for a weekday (0 = Monday .. 6 = Sunday)
    pub fn weekday(&self, day: usize) -> Option<&DayMaterials> {
        self.days.get(day)
    }

    /// True before the first successful load
    pub fn is_empty(&self) -> bool {
        self.days.iter().all(|d| d.is_empty())
    }

    /// Every character listed on the all-materials day, region order, no repeats
    pub fn all_character_ids(&self) -> Vec<CharacterId> {
        let mut seen = BTreeSet::new();
        self.days[ALL_MATERIALS_DAY]
            .values()
            .flat_map(|area| area.avatar_ids.iter().copied())
            .filter(|id| seen.insert(*id))
            .collect()
    }
}
