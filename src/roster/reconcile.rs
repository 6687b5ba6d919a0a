use std::collections::{HashMap, HashSet};

use super::{CharacterEntry, ReferenceCatalog};
use crate::types::CharacterId;

/// Lines up the player's characters against the full roster
pub struct RosterReconciler<'a> {
    reference: &'a ReferenceCatalog,
}

impl<'a> RosterReconciler<'a> {
    pub fn new(reference: &'a ReferenceCatalog) -> Self {
        Self { reference }
    }

    /// One entry per character in `all_ids`, in that order.
    ///
    /// Owned entries win; otherwise a placeholder is built from reference
    /// data. Ids unknown to both are logged and left out.
    pub fn reconcile(
        &self,
        owned: &HashMap<CharacterId, CharacterEntry>,
        all_ids: &[CharacterId],
    ) -> Vec<CharacterEntry> {
        let mut seen = HashSet::new();
        let mut roster = Vec::with_capacity(all_ids.len());

        for &id in all_ids {
            if !seen.insert(id) {
                continue;
            }
            if let Some(entry) = owned.get(&id) {
                roster.push(entry.clone());
                continue;
            }
            match self.reference.placeholder(id) {
                Some(entry) => {
                    tracing::info!(character = id, name = %entry.name, "Character not owned");
                    roster.push(entry);
                }
                None => tracing::warn!(character = id, "Unknown character, skipping"),
            }
        }

        roster
    }
}
