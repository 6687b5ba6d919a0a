use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet};

use super::catalog::{AvatarRef, CatalogSource, MaterialSummary};
use crate::config::FAN_OUT;
use crate::error::CatalogError;
use crate::types::{BossName, CharacterId};

/// Catalog type of talent upgrade materials
pub const TALENT_MATERIAL_KIND: &str = "characterLevelUpMaterial";

/// Rank of the weekly boss drops among talent materials
pub const BOSS_MATERIAL_RANK: u8 = 5;

/// Event item listed as a top-rank talent material without being dropped by any boss
pub const NON_COMBAT_PLACEHOLDER: &str = "星与火的基石";

/// Name the new-character catalog uses before a character's data is published
pub const UNPUBLISHED_MATERIAL: &str = "???";

/// Guest characters share these id prefixes and follow their own upgrade rules
pub const EXCLUDED_AVATAR_PREFIX: &str = "10000005-";

/// A weekly boss material and the characters whose talents consume it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyMaterial {
    pub name: String,
    pub dropped_by: BossName,
    pub required_by: BTreeSet<CharacterId>,
}

/// Character that the new-character catalog ties to a material by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCharacterMaterial {
    pub character: CharacterId,
    pub material: String,
}

/// Unified view over both catalogs, built per request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklyMaterials {
    by_name: BTreeMap<String, WeeklyMaterial>,
}

impl WeeklyMaterials {
    /// Index primary-catalog materials by display name
    pub fn from_primary(materials: impl IntoIterator<Item = WeeklyMaterial>) -> Self {
        let by_name = materials
            .into_iter()
            .map(|m| (m.name.clone(), m))
            .collect();
        Self { by_name }
    }

    /// Fold new-character records into the materials they name.
    ///
    /// The material must already be known from the primary catalog, since
    /// only the primary catalog knows which boss drops it.
    pub fn merge_new_characters(
        &mut self,
        additions: impl IntoIterator<Item = NewCharacterMaterial>,
    ) -> Result<(), CatalogError> {
        for addition in additions {
            if addition.material == NON_COMBAT_PLACEHOLDER {
                continue;
            }
            if addition.material == UNPUBLISHED_MATERIAL {
                tracing::warn!(
                    character = addition.character,
                    "Talent material not published yet, skipping",
                );
                continue;
            }

            let material = self.by_name.get_mut(&addition.material).ok_or_else(|| {
                CatalogError::UnknownMaterial {
                    character: addition.character,
                    material: addition.material.clone(),
                }
            })?;
            material.required_by.insert(addition.character);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&WeeklyMaterial> {
        self.by_name.get(name)
    }

    pub fn materials(&self) -> impl Iterator<Item = &WeeklyMaterial> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Invert the required-by sets. A character listed under two materials
    /// keeps the first one and is logged.
    pub fn character_to_boss(&self) -> BTreeMap<CharacterId, BossName> {
        let mut map: BTreeMap<CharacterId, BossName> = BTreeMap::new();
        for material in self.by_name.values() {
            for &character in &material.required_by {
                match map.get(&character) {
                    Some(boss) if *boss != material.dropped_by => {
                        tracing::warn!(
                            character,
                            kept = %boss,
                            ignored = %material.dropped_by,
                            "Character listed under two weekly bosses",
                        );
                    }
                    Some(_) => {}
                    None => {
                        map.insert(character, material.dropped_by.clone());
                    }
                }
            }
        }
        map
    }

    /// Characters consuming each boss's drops; bosses nobody needs still appear
    pub fn boss_to_characters(&self) -> BTreeMap<BossName, BTreeSet<CharacterId>> {
        let mut map: BTreeMap<BossName, BTreeSet<CharacterId>> = BTreeMap::new();
        for material in self.by_name.values() {
            map.entry(material.dropped_by.clone())
                .or_default()
                .extend(material.required_by.iter().copied());
        }
        map
    }

    /// Every boss dropping a tracked material
    pub fn bosses(&self) -> BTreeSet<BossName> {
        self.by_name
            .values()
            .map(|m| m.dropped_by.clone())
            .collect()
    }
}

/// True for the materials the tally tracks: top-rank talent materials,
/// minus the non-combat placeholder
pub fn is_boss_material(summary: &MaterialSummary) -> bool {
    summary.kind == TALENT_MATERIAL_KIND
        && summary.rank == BOSS_MATERIAL_RANK
        && summary.name != NON_COMBAT_PLACEHOLDER
}

/// Builds the character -> boss mapping from both catalogs
pub struct WeeklyMaterialResolver<S> {
    source: S,
}

impl<S: CatalogSource> WeeklyMaterialResolver<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetch both catalogs and unify them.
    ///
    /// Detail lookups run at most [`FAN_OUT`] at a time. Every lookup in a
    /// batch finishes before the first failure is reported, and any failure
    /// fails the whole resolution.
    pub async fn resolve(&self) -> Result<WeeklyMaterials, CatalogError> {
        let summaries: Vec<MaterialSummary> = self
            .source
            .materials()
            .await?
            .into_iter()
            .filter(is_boss_material)
            .collect();
        tracing::debug!(count = summaries.len(), "Weekly boss materials listed");

        let primary: Vec<Result<WeeklyMaterial, CatalogError>> = stream::iter(summaries)
            .map(|summary| self.weekly_material(summary))
            .buffered(FAN_OUT)
            .collect()
            .await;
        let primary = primary.into_iter().collect::<Result<Vec<_>, _>>()?;
        let mut materials = WeeklyMaterials::from_primary(primary);

        let new_ids = self.source.new_characters().await?;
        let additions: Vec<Result<NewCharacterMaterial, CatalogError>> = stream::iter(new_ids)
            .map(|character| async move {
                let material = self.source.talent_material(character).await?;
                Ok::<_, CatalogError>(NewCharacterMaterial {
                    character,
                    material,
                })
            })
            .buffered(FAN_OUT)
            .collect()
            .await;
        let additions = additions.into_iter().collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(count = additions.len(), "New characters merged");

        materials.merge_new_characters(additions)?;
        Ok(materials)
    }

    async fn weekly_material(&self, summary: MaterialSummary) -> Result<WeeklyMaterial, CatalogError> {
        let detail = self.source.material_detail(summary.id).await?;

        let dropped_by = detail
            .dropped_by
            .into_iter()
            .next()
            .map(|d| d.name)
            .ok_or_else(|| CatalogError::NoDropSource {
                material: summary.name.clone(),
            })?;

        let mut required_by = BTreeSet::new();
        for avatar in detail.required_by.avatar {
            match avatar {
                AvatarRef::Id(id) => {
                    required_by.insert(id);
                }
                AvatarRef::Tagged(tag) if tag.starts_with(EXCLUDED_AVATAR_PREFIX) => {}
                AvatarRef::Tagged(tag) => match tag.parse::<CharacterId>() {
                    Ok(id) => {
                        required_by.insert(id);
                    }
                    Err(_) => {
                        return Err(CatalogError::BadCharacterRef {
                            material: summary.name,
                            reference: tag,
                        })
                    }
                },
            }
        }

        tracing::debug!(material = %summary.name, boss = %dropped_by, "Resolved weekly material");
        Ok(WeeklyMaterial {
            name: summary.name,
            dropped_by,
            required_by,
        })
    }
}
