use anyhow::{Context, Result};
use std::io;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use weekly_remaining::{
    cli::{Cli, Commands},
    config::{self, Endpoints},
    daily::{DailyClient, ReferenceDataCache, WEEKDAYS},
    roster::{AccountSelector, OfflineRoster, ReferenceCatalog},
    weekly::{HttpCatalog, WeeklyMaterialResolver},
    JsonPresenter, Presenter, RemainingError, RemainingRequest, TextPresenter, WeeklyRemaining,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "weekly_remaining=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse_args();
    let endpoints = Endpoints::from_env();

    let cache_dir = config::cache_dir(cli.cache_dir)?;
    let source = Arc::new(DailyClient::new(endpoints.daily.clone())?);
    let cache = ReferenceDataCache::new(&cache_dir, source);

    match cli.command {
        Commands::Remaining {
            roster,
            characters,
            user_id,
            player_id,
            offset,
            json,
        } => {
            let reference = ReferenceCatalog::load(&characters)?;
            let provider = OfflineRoster::from_path(roster)?;
            let resolver = WeeklyMaterialResolver::new(HttpCatalog::new(endpoints)?);

            let mut pending = cache.initialize().await;
            if cache.get().is_empty() {
                // Nothing to count against until the first refresh lands
                finish_refresh(pending.take()).await?;
            }

            let request = RemainingRequest {
                user_id,
                selector: AccountSelector { player_id, offset },
            };
            let remaining = WeeklyRemaining {
                resolver: &resolver,
                provider: &provider,
                reference: &reference,
            };
            let result = remaining.run(request, &cache.get()).await;

            let mut presenter: Box<dyn Presenter> = if json {
                Box::new(JsonPresenter::new(io::stdout()))
            } else {
                Box::new(TextPresenter::new(io::stdout()))
            };
            let outcome = match result {
                Ok(report) => presenter.tally(&report.tally),
                Err(RemainingError::Account(e)) => presenter.notice(&e.to_string()),
                Err(e @ RemainingError::Catalog(_)) => Err(e.into()),
            };

            finish_refresh(pending).await?;
            outcome?;
        }

        Commands::Refresh { force } => {
            if force {
                cache.refresh().await.context("Failed to refresh daily materials")?;
            } else {
                let pending = cache.initialize().await;
                if pending.is_none() {
                    println!("Snapshot is fresh: {:?}", cache.path());
                }
                finish_refresh(pending).await?;
            }

            match cache.snapshot_age().await {
                Some(age) => println!(
                    "Snapshot {:?} is {:.1} hours old",
                    cache.path(),
                    age.as_secs_f64() / 3600.0
                ),
                None => println!("No snapshot at {:?}", cache.path()),
            }
        }

        Commands::Daily { weekday } => {
            finish_refresh(cache.initialize().await).await?;
            let table = cache.get();
            let day = usize::from(weekday);

            println!("{}:\n", WEEKDAYS[day]);
            for (region, area) in table.weekday(day).into_iter().flatten() {
                println!("  {}", region);
                println!("    talent books:       {:?}", area.avatar_material_ids);
                println!("    characters:         {:?}", area.avatar_ids);
                println!("    weapon materials:   {:?}", area.weapon_material_ids);
                println!("    weapons:            {:?}", area.weapon_ids);
            }
        }

        Commands::Bosses => {
            let resolver = WeeklyMaterialResolver::new(HttpCatalog::new(endpoints)?);
            let materials = resolver
                .resolve()
                .await
                .context("Failed to resolve weekly materials")?;

            for (boss, characters) in materials.boss_to_characters() {
                println!("{} ({} characters)", boss, characters.len());
                for id in characters {
                    println!("  - {}", id);
                }
            }
        }
    }

    Ok(())
}

/// Wait for a background refresh the process would otherwise cut short
async fn finish_refresh(pending: Option<JoinHandle<()>>) -> Result<()> {
    if let Some(task) = pending {
        task.await.context("Daily material refresh task failed")?;
    }
    Ok(())
}
