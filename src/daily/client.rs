use async_trait::async_trait;
use reqwest::Client;
use std::future::Future;
use std::time::Duration;

use super::parse::parse_calendar;
use super::table::DailyMaterialTable;
use crate::config::{FETCH_ATTEMPTS, REQUEST_TIMEOUT, RETRY_DELAY, USER_AGENT};
use crate::error::FetchError;

/// Anything that can produce a fresh daily-material table
#[async_trait]
pub trait DailySource: Send + Sync {
    async fn fetch(&self) -> Result<DailyMaterialTable, FetchError>;
}

/// Downloads and parses the calendar page, retrying transient failures
pub struct DailyClient {
    client: Client,
    url: String,
    attempts: u32,
    retry_delay: Duration,
}

impl DailyClient {
    pub fn new(url: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            attempts: FETCH_ATTEMPTS,
            retry_delay: RETRY_DELAY,
        })
    }

    /// Fetch the page once, without retrying
    async fn fetch_once(&self) -> Result<DailyMaterialTable, FetchError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let html = response.text().await?;
        Ok(parse_calendar(&html)?)
    }
}

#[async_trait]
impl DailySource for DailyClient {
    async fn fetch(&self) -> Result<DailyMaterialTable, FetchError> {
        with_retry(self.attempts, self.retry_delay, move || self.fetch_once()).await
    }
}

/// Run `op` up to `attempts` times, sleeping `delay` after each transient failure.
///
/// Non-transient errors (a page that does not parse) are returned at once.
pub async fn with_retry<T, F, Fut>(attempts: u32, delay: Duration, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => {
                tokio::time::sleep(delay).await;
                if attempt == attempts {
                    tracing::error!(attempts, error = %e, "Daily material refresh failed");
                    return Err(FetchError::Exhausted {
                        attempts,
                        last: Box::new(e),
                    });
                }
                tracing::warn!(attempt, error = %e, "Daily material refresh failed, retrying");
                attempt += 1;
            }
        }
    }
}
