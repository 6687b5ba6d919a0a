use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Snapshot older than this is refreshed in the background
pub const STALE_AFTER: Duration = Duration::from_secs(3 * 24 * 60 * 60);

/// Attempts made against the calendar page before giving up
pub const FETCH_ATTEMPTS: u32 = 5;

/// Pause between two failed attempts
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Per-request network timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Detail lookups in flight at once against a catalog
pub const FAN_OUT: usize = 5;

pub const USER_AGENT: &str = concat!("weekly-remaining/", env!("CARGO_PKG_VERSION"));

const DEFAULT_DAILY_URL: &str = "https://gensh.honeyhunterworld.com/?lang=CHS";
const DEFAULT_CATALOG_URL: &str = "https://gi.yatta.moe/api/v2/chs";
const DEFAULT_NEW_CHARACTER_URL: &str = "https://api.hakush.in/gi";

/// Upstream locations; each one can be pointed at a mirror through the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Calendar page listing what can be farmed on each weekday
    pub daily: String,
    /// Base of the material catalog (`/material`, `/material/{id}`)
    pub catalog: String,
    /// Base of the new-character catalog (`/new.json`, `/data/zh/character/{id}.json`)
    pub new_characters: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            daily: DEFAULT_DAILY_URL.to_string(),
            catalog: DEFAULT_CATALOG_URL.to_string(),
            new_characters: DEFAULT_NEW_CHARACTER_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Defaults, overridden by `WEEKLY_REMAINING_*_URL` variables when set
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let pick = |key: &str, default: String| {
            lookup(key)
                .map(|v| v.trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };
        Self {
            daily: pick("WEEKLY_REMAINING_DAILY_URL", defaults.daily),
            catalog: pick("WEEKLY_REMAINING_CATALOG_URL", defaults.catalog),
            new_characters: pick("WEEKLY_REMAINING_NEW_CHAR_URL", defaults.new_characters),
        }
    }
}

/// Directory holding the daily-material snapshot; `--cache-dir` wins over
/// the platform cache location. Created when missing.
pub fn cache_dir(custom_dir: Option<PathBuf>) -> Result<PathBuf> {
    let dir = custom_dir
        .or_else(|| {
            ProjectDirs::from("", "", env!("CARGO_PKG_NAME")).map(|dirs| dirs.cache_dir().to_path_buf())
        })
        .context("No home directory to keep the daily material snapshot in")?;

    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create snapshot directory {}", dir.display()))?;
    Ok(dir)
}
