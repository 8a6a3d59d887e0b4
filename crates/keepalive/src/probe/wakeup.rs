use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use super::fetcher::Fetcher;
use super::types::{OutcomeStatus, ProbeSettings, TaskOutcome};
use crate::registry::{DomainRegistry, LogEntry, LogStatus};

/// Turn a configured domain into the URL that gets requested.
///
/// Values that already carry an http(s) scheme are used unchanged, anything
/// else is assumed to be a bare host and gets `https://`.
pub fn normalize_url(domain: &str) -> String {
    let lower = domain.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}

/// Last failure seen while retrying
#[derive(Debug)]
enum AttemptError {
    Http(u16),
    Network(String),
}

/// Wakes a single domain up, retrying a bounded number of times
pub struct WakeupProbe {
    fetcher: Arc<dyn Fetcher>,
    settings: ProbeSettings,
    registry: Option<Arc<DomainRegistry>>,
}

impl WakeupProbe {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: ProbeSettings) -> Self {
        Self { fetcher, settings, registry: None }
    }

    /// Record every terminal outcome in the domain's log
    pub fn with_registry(mut self, registry: Arc<DomainRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    /// Wake `domain` up.
    ///
    /// A 2xx response ends the attempt loop at once. Any other status or a
    /// transport failure is retried after `retry_delay`, up to `retries`
    /// extra attempts. HTTP and transport problems never escape as errors;
    /// they end up in the returned outcome, classified by the last failure.
    pub async fn attempt(&self, domain: &str) -> TaskOutcome {
        let url = normalize_url(domain);
        let max_attempts = self.settings.max_attempts();

        let mut attempts = 0;
        let mut last_error = None;

        while attempts < max_attempts {
            attempts += 1;

            match self.fetcher.fetch(&url, &self.settings.user_agent).await {
                Ok(status_code) if (200..300).contains(&status_code) => {
                    let outcome = TaskOutcome::success(domain.to_string(), status_code, attempts);
                    self.record(&url, &outcome).await;
                    return outcome;
                }
                Ok(status_code) => {
                    debug!("{} answered {} (attempt {}/{})", url, status_code, attempts, max_attempts);
                    last_error = Some(AttemptError::Http(status_code));
                }
                Err(e) => {
                    debug!("{} unreachable (attempt {}/{}): {}", url, attempts, max_attempts, e);
                    last_error = Some(AttemptError::Network(e.0));
                }
            }

            if attempts < max_attempts {
                tokio::time::sleep(self.settings.retry_delay).await;
            }
        }

        let outcome = match last_error {
            Some(AttemptError::Http(code)) => {
                TaskOutcome::failure(domain.to_string(), Some(code), attempts, format!("HTTP error: {code}"))
            }
            Some(AttemptError::Network(message)) => {
                TaskOutcome::failure(domain.to_string(), None, attempts, message)
            }
            None => TaskOutcome::failure(domain.to_string(), None, attempts, "unknown error".to_string()),
        };

        self.record(&url, &outcome).await;
        outcome
    }

    async fn record(&self, url: &str, outcome: &TaskOutcome) {
        let Some(registry) = &self.registry else {
            return;
        };

        let entry = LogEntry {
            timestamp: Utc::now(),
            status: match outcome.status {
                OutcomeStatus::Success => LogStatus::Success,
                _ => LogStatus::Failure,
            },
            status_code: outcome.status_code,
            url: url.to_string(),
            attempts: outcome.attempts,
            error: outcome.error.clone(),
        };

        if let Err(e) = registry.append_log(&outcome.domain, entry).await {
            warn!("Failed to record wakeup log for {}: {}", outcome.domain, e);
        }
    }
}
