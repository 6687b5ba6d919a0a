//! Error taxonomy for the library.
//!
//! Refresh failures (`FetchError`, `SnapshotError`) are absorbed by the cache,
//! `CatalogError` fails the request that triggered it, and `AccountError` is
//! reported back to the user as an informational message.

use crate::types::CharacterId;

/// The daily calendar page could not be turned into a table
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unknown weekday title: {0}")]
    UnknownWeekday(String),

    #[error("weekday {0} appears more than once")]
    DuplicateWeekday(String),

    #[error("day block without a weekday title")]
    MissingTitle,

    #[error("weekday {0} is missing from the calendar")]
    MissingWeekday(&'static str),

    #[error("region {region} on {day} lists no materials")]
    EmptyRegion { day: &'static str, region: String },
}

/// Fetching the daily-material table failed
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("failed to parse calendar page: {0}")]
    Parse(#[from] ParseError),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<FetchError> },
}

impl FetchError {
    /// Network and TLS failures are worth another attempt, malformed pages are not
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Http(_) | FetchError::Status { .. })
    }
}

/// The persisted snapshot could not be read back
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot is not valid json: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("snapshot version {found} does not match {expected}")]
    Version { found: u32, expected: u32 },
}

/// The weekly-material catalogs returned something unusable
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("response from {url} has no {field}")]
    MissingField { url: String, field: &'static str },

    #[error("material {material} has no drop source")]
    NoDropSource { material: String },

    #[error("unrecognised character reference {reference:?} in {material}")]
    BadCharacterRef { material: String, reference: String },

    #[error("character {character} needs {material}, which the material catalog does not list")]
    UnknownMaterial {
        character: CharacterId,
        material: String,
    },
}

/// Looking up the player's account failed for a user-facing reason
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("no game account is bound to this user")]
    NotBound,

    #[error("the bound account's credentials are no longer valid")]
    InvalidCredentials,

    #[error("the requested player could not be found")]
    PlayerNotFound,
}

/// Reading one character's talents failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TalentError {
    #[error("credentials rejected")]
    InvalidCredentials,

    #[error("api error {code}: {message}")]
    Api { code: i32, message: String },
}
