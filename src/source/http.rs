use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use super::{GradeSource, RawRecord, records_from_csv};
use crate::fetch::{HttpClient, fetch_bytes};
use crate::gradebook::types::Identifier;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_MAX_ATTEMPTS: usize = 30;

/// Pulls a course's CSV export from a gradebook portal at
/// `<base_url>/<identifier>.csv`.
///
/// Portals build the export lazily and answer with an empty table until it
/// is ready, so the source polls until at least one record shows up.
pub struct HttpGradeSource<C> {
    client: C,
    base_url: String,
    poll_interval: Duration,
    max_attempts: usize,
}

impl<C: HttpClient> HttpGradeSource<C> {
    pub fn new(client: C, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_polling(mut self, poll_interval: Duration, max_attempts: usize) -> Self {
        self.poll_interval = poll_interval;
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn url_for(&self, identifier: &Identifier) -> String {
        format!("{}/{}.csv", self.base_url.trim_end_matches('/'), identifier)
    }

    #[tracing::instrument(skip(self))]
    async fn poll(&self, url: &str) -> Result<Vec<RawRecord>> {
        for attempt in 1..=self.max_attempts {
            let bytes = fetch_bytes(&self.client, url).await?;
            let records = records_from_csv(bytes.as_slice())
                .with_context(|| format!("malformed grade export from {url}"))?;

            if !records.is_empty() {
                info!(attempt, records = records.len(), "Grade export ready");
                return Ok(records);
            }

            debug!(attempt, "Grade export empty, waiting");
            tokio::time::sleep(self.poll_interval).await;
        }

        bail!(
            "grade export at {url} still empty after {} attempts",
            self.max_attempts
        )
    }
}

#[async_trait]
impl<C: HttpClient> GradeSource for HttpGradeSource<C> {
    async fn fetch(&self, identifier: &Identifier) -> Result<Vec<RawRecord>> {
        let url = self.url_for(identifier);
        self.poll(&url).await
    }
}
