pub mod cli;
pub mod config;
pub mod daily;
pub mod error;
pub mod present;
pub mod remaining;
pub mod roster;
pub mod talent;
pub mod types;
pub mod weekly;

pub use cli::{Cli, Commands};
pub use present::{JsonPresenter, Presenter, TextPresenter};
pub use remaining::{RemainingError, RemainingReport, RemainingRequest, WeeklyRemaining};
