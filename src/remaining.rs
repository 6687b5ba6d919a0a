//! One weekly-remaining request, from account lookup to per-boss tally.

use crate::daily::DailyMaterialTable;
use crate::error::{AccountError, CatalogError};
use crate::roster::{
    owned_characters, AccountSelector, CharacterEntry, FragileHandle, ReferenceCatalog,
    RosterProvider, RosterReconciler,
};
use crate::talent::{self, BossNeedTally};
use crate::weekly::{CatalogSource, WeeklyMaterialResolver};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemainingRequest {
    pub user_id: u64,
    pub selector: AccountSelector,
}

#[derive(Debug, thiserror::Error)]
pub enum RemainingError {
    /// Shown to the user as information, not a failure of the service
    #[error(transparent)]
    Account(#[from] AccountError),

    #[error("weekly material catalog unavailable: {0}")]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemainingReport {
    pub player_id: u64,
    pub roster: Vec<CharacterEntry>,
    pub tally: BossNeedTally,
}

/// Everything a request needs that outlives it
pub struct WeeklyRemaining<'a, S> {
    pub resolver: &'a WeeklyMaterialResolver<S>,
    pub provider: &'a dyn RosterProvider,
    pub reference: &'a ReferenceCatalog,
}

impl<S: CatalogSource> WeeklyRemaining<'_, S> {
    /// Count the boss materials the player still needs, per boss.
    ///
    /// `daily` supplies the full roster. Characters the player does not own,
    /// or whose talents cannot be read, are charged the unowned cost.
    pub async fn run(
        &self,
        request: RemainingRequest,
        daily: &DailyMaterialTable,
    ) -> Result<RemainingReport, RemainingError> {
        let account = self
            .provider
            .account(request.user_id, request.selector)
            .await
            .inspect_err(|e| tracing::info!(user_id = request.user_id, error = %e, "Account lookup failed"))?;
        let player_id = account.player_id();
        tracing::debug!(player_id, "Account found");

        let owned = owned_characters(account.as_ref()).await?;

        let all_ids = daily.all_character_ids();
        if all_ids.is_empty() {
            tracing::warn!("Daily material table not loaded yet, no characters to count");
        }

        let materials = self.resolver.resolve().await?;
        let character_to_boss = materials.character_to_boss();

        let mut roster = RosterReconciler::new(self.reference).reconcile(&owned, &all_ids);

        let mut handle = FragileHandle::new(account.as_ref());
        for entry in roster
            .iter_mut()
            .filter(|e| e.owned && character_to_boss.contains_key(&e.id))
        {
            match handle.talent_levels(entry.id).await {
                Ok(levels) => entry.talent_levels = levels,
                Err(e) => {
                    tracing::warn!(character = entry.id, error = %e, "Failed to read talents");
                }
            }
            tracing::debug!(character = entry.id, talents = ?entry.talent_levels, "Talents");
        }

        let tally = talent::tally(&roster, &character_to_boss, materials.bosses());

        Ok(RemainingReport {
            player_id,
            roster,
            tally,
        })
    }
}
