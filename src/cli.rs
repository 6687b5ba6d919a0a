use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "weekly-remaining")]
#[command(version, about = "Count the weekly boss materials still needed for your talents")]
pub struct Cli {
    /// Custom cache directory
    #[arg(short, long, global = true)]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Count boss materials still needed, per boss
    Remaining {
        /// Exported roster (JSON); without it the account counts as not bound
        #[arg(short, long)]
        roster: Option<PathBuf>,

        /// Character reference data (JSON object keyed by character id)
        #[arg(short = 'C', long)]
        characters: PathBuf,

        /// User the account is bound to
        #[arg(long, default_value_t = 0)]
        user_id: u64,

        /// Select a bound account by player id
        #[arg(short, long)]
        player_id: Option<u64>,

        /// Select a bound account by position
        #[arg(short, long)]
        offset: Option<usize>,

        /// Print the tally as JSON
        #[arg(long)]
        json: bool,
    },

    /// Refresh the daily material snapshot if it is stale
    Refresh {
        /// Refresh even if the snapshot is fresh
        #[arg(short, long)]
        force: bool,
    },

    /// Show what can be farmed on a weekday
    Daily {
        /// 0 = Monday .. 6 = Sunday (everything)
        #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(0..7))]
        weekday: u8,
    },

    /// Show which characters need each weekly boss
    Bosses,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
