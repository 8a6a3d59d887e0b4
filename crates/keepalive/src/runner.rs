//! Runs wakeups over a set of domains.
//!
//! A run fans out one task per domain and waits for all of them; one domain
//! failing, or its task panicking, never takes the rest of the batch down.

use std::any::Any;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::ConfigError;
use crate::probe::{Fetcher, ProbeSettings, TaskOutcome, WakeupProbe};
use crate::registry::DomainRegistry;
use crate::schedule::is_due;

/// Where the domains of a run come from
pub enum DomainSource {
    /// Managed through the registry, with per-domain intervals
    Registry(Arc<DomainRegistry>),
    /// Fixed list, woken up on every tick
    Static(Vec<String>),
    /// Nothing usable was configured; runs report this instead of probing
    Unavailable(ConfigError),
}

impl DomainSource {
    /// Parse the `TARGET_DOMAINS` value: a non-empty JSON array of strings
    pub fn from_target_domains(raw: &str) -> Self {
        match serde_json::from_str::<Vec<String>>(raw) {
            Ok(domains) if !domains.is_empty() => DomainSource::Static(domains),
            Ok(_) => DomainSource::Unavailable(ConfigError::MalformedTargetDomains(
                "expected a non-empty array".to_string(),
            )),
            Err(e) => DomainSource::Unavailable(ConfigError::MalformedTargetDomains(e.to_string())),
        }
    }

    pub fn registry(&self) -> Option<&Arc<DomainRegistry>> {
        match self {
            DomainSource::Registry(registry) => Some(registry),
            _ => None,
        }
    }
}

/// Outcome of one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub summary: String,
    /// One outcome per input domain, in input order
    pub outcomes: Vec<TaskOutcome>,
}

impl TaskReport {
    fn from_config_error(error: &ConfigError) -> Self {
        Self { summary: error.to_string(), outcomes: Vec::new() }
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }
}

/// What a scheduled pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledRun {
    pub report: TaskReport,
    /// Domains that were not due on this tick
    pub skipped: Vec<String>,
}

/// Drives wakeup probes for a domain source
pub struct TaskRunner {
    probe: Arc<WakeupProbe>,
    source: DomainSource,
}

impl TaskRunner {
    /// Build a runner; with a registry source every outcome is also logged
    /// to the registry
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: ProbeSettings, source: DomainSource) -> Self {
        let mut probe = WakeupProbe::new(fetcher, settings);
        if let Some(registry) = source.registry() {
            probe = probe.with_registry(Arc::clone(registry));
        }

        Self { probe: Arc::new(probe), source }
    }

    pub fn source(&self) -> &DomainSource {
        &self.source
    }

    /// Every domain a run right now would cover
    pub async fn resolve_domains(&self) -> Result<Vec<String>, ConfigError> {
        match &self.source {
            DomainSource::Registry(registry) => {
                let domains = registry.domains().await;
                if domains.is_empty() { Err(ConfigError::NoDomainsInStore) } else { Ok(domains) }
            }
            DomainSource::Static(domains) => Ok(domains.clone()),
            DomainSource::Unavailable(e) => Err(e.clone()),
        }
    }

    /// Wake every configured domain up now, ignoring intervals
    pub async fn run_now(&self) -> TaskReport {
        match self.resolve_domains().await {
            Ok(domains) => self.run_once(&domains).await,
            Err(e) => TaskReport::from_config_error(&e),
        }
    }

    /// Probe all `domains` concurrently and collect their outcomes.
    ///
    /// Each domain gets its own task with no cap on how many run at once.
    /// A task that dies is reported as a `system-error` outcome.
    pub async fn run_once(&self, domains: &[String]) -> TaskReport {
        let handles: Vec<_> = domains
            .iter()
            .map(|domain| {
                let probe = Arc::clone(&self.probe);
                let domain = domain.clone();
                tokio::spawn(async move { probe.attempt(&domain).await })
            })
            .collect();

        let max_attempts = self.probe.settings().max_attempts();
        let outcomes = join_all(handles)
            .await
            .into_iter()
            .zip(domains)
            .map(|(joined, domain)| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    let message = if e.is_panic() {
                        panic_message(e.into_panic())
                    } else {
                        e.to_string()
                    };
                    error!("Wakeup task for {} failed: {}", domain, message);
                    TaskOutcome::system_error(domain.clone(), max_attempts, message)
                }
            })
            .collect();

        TaskReport { summary: format!("Processed {} domain(s).", domains.len()), outcomes }
    }

    /// One scheduled pass.
    ///
    /// With a registry, only domains whose interval has elapsed are probed,
    /// one at a time, and each gets its last-checked time updated afterwards
    /// whatever the outcome. A static list is probed in full on every pass.
    pub async fn run_scheduled(&self, now: DateTime<Utc>) -> ScheduledRun {
        let registry = match &self.source {
            DomainSource::Registry(registry) => registry,
            DomainSource::Static(domains) => {
                let report = self.run_once(domains).await;
                log_report(&report);
                return ScheduledRun { report, skipped: Vec::new() };
            }
            DomainSource::Unavailable(e) => {
                let report = TaskReport::from_config_error(e);
                log_report(&report);
                return ScheduledRun { report, skipped: Vec::new() };
            }
        };

        let statuses = registry.statuses(now).await;
        let mut outcomes = Vec::new();
        let mut skipped = Vec::new();

        for status in &statuses {
            if !is_due(&status.config(), now) {
                debug!("Skipping {}: not due yet", status.domain);
                skipped.push(status.domain.clone());
                continue;
            }

            info!("Waking up {} (interval {} min)", status.domain, status.interval);
            let report = self.run_once(std::slice::from_ref(&status.domain)).await;

            if let Err(e) = registry.touch_last_checked(&status.domain, Utc::now()).await {
                warn!("Failed to update last check time of {}: {}", status.domain, e);
            }

            for outcome in &report.outcomes {
                log_outcome(outcome);
            }
            outcomes.extend(report.outcomes);
        }

        let report = TaskReport {
            summary: format!("Checked {} of {} domain(s).", outcomes.len(), statuses.len()),
            outcomes,
        };
        ScheduledRun { report, skipped }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "wakeup task panicked".to_string()
    }
}

fn log_outcome(outcome: &TaskOutcome) {
    let details = match (&outcome.error, outcome.status_code) {
        (Some(error), _) => format!("error: {error}"),
        (None, Some(code)) => format!("status code: {code}"),
        (None, None) => String::new(),
    };

    if outcome.is_success() {
        info!("{} | {} | {} attempt(s) | {}", outcome.domain, outcome.status, outcome.attempts, details);
    } else {
        warn!("{} | {} | {} attempt(s) | {}", outcome.domain, outcome.status, outcome.attempts, details);
    }
}

/// Log a batch report: the summary, one line per domain and the totals
pub fn log_report(report: &TaskReport) {
    info!("Task report: {}", report.summary);
    if report.outcomes.is_empty() {
        return;
    }

    for outcome in &report.outcomes {
        log_outcome(outcome);
    }

    info!(
        "Task totals: {} succeeded, {} failed",
        report.success_count(),
        report.failure_count()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::probe::OutcomeStatus;
    use crate::probe::wakeup::tests::ScriptedFetcher;
    use crate::registry::LogStatus;
    use crate::store::MemoryStore;
    use chrono::TimeDelta;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Fetcher that panics on URLs containing "boom" and answers 200 otherwise
    struct PanickyFetcher;

    #[async_trait::async_trait]
    impl Fetcher for PanickyFetcher {
        async fn fetch(&self, url: &str, _user_agent: &str) -> Result<u16, FetchError> {
            if url.contains("boom") {
                panic!("probe exploded for {url}");
            }
            Ok(200)
        }
    }

    /// Fetcher that answers 200 after a per-domain delay
    struct SlowFetcher;

    #[async_trait::async_trait]
    impl Fetcher for SlowFetcher {
        async fn fetch(&self, url: &str, _user_agent: &str) -> Result<u16, FetchError> {
            let secs = if url.contains("slow") { 3 } else { 1 };
            tokio::time::sleep(Duration::from_secs(secs)).await;
            Ok(200)
        }
    }

    fn settings() -> ProbeSettings {
        ProbeSettings { retries: 2, retry_delay: Duration::from_millis(10), ..ProbeSettings::default() }
    }

    fn domains(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn registry_runner(fetcher: Arc<dyn Fetcher>) -> (Arc<DomainRegistry>, TaskRunner) {
        let registry = Arc::new(DomainRegistry::new(Arc::new(MemoryStore::new()), None));
        let runner = TaskRunner::new(fetcher, settings(), DomainSource::Registry(registry.clone()));
        (registry, runner)
    }

    #[tokio::test]
    async fn test_panicking_task_becomes_system_error() {
        let runner = TaskRunner::new(
            Arc::new(PanickyFetcher),
            settings(),
            DomainSource::Static(Vec::new()),
        );

        let report = runner.run_once(&domains(&["a.example", "boom.example", "c.example"])).await;

        assert_eq!(report.summary, "Processed 3 domain(s).");
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.outcomes[0].status, OutcomeStatus::Success);
        assert_eq!(report.outcomes[2].status, OutcomeStatus::Success);

        let failed = &report.outcomes[1];
        assert_eq!(failed.domain, "boom.example");
        assert_eq!(failed.status, OutcomeStatus::SystemError);
        assert_eq!(failed.attempts, 3);
        assert!(failed.error.as_deref().is_some_and(|e| e.contains("probe exploded")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fan_out_is_concurrent_and_keeps_input_order() {
        let runner =
            TaskRunner::new(Arc::new(SlowFetcher), settings(), DomainSource::Static(Vec::new()));
        let started = Instant::now();

        let report = runner.run_once(&domains(&["slow.example", "fast.example"])).await;

        let order: Vec<_> = report.outcomes.iter().map(|o| o.domain.as_str()).collect();
        assert_eq!(order, vec!["slow.example", "fast.example"]);
        assert!(Instant::now() - started < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_config_error_short_circuits() {
        let fetcher = Arc::new(ScriptedFetcher::always(Ok(200)));
        let runner = TaskRunner::new(
            fetcher.clone(),
            settings(),
            DomainSource::Unavailable(ConfigError::Missing),
        );

        let report = runner.run_now().await;
        assert_eq!(report.summary, ConfigError::Missing.to_string());
        assert!(report.outcomes.is_empty());

        let scheduled = runner.run_scheduled(Utc::now()).await;
        assert!(scheduled.report.outcomes.is_empty());
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_registry_is_a_config_error() {
        let (_registry, runner) = registry_runner(Arc::new(ScriptedFetcher::always(Ok(200))));

        let report = runner.run_now().await;
        assert_eq!(report.summary, ConfigError::NoDomainsInStore.to_string());
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_run_now_ignores_intervals() {
        let fetcher = Arc::new(ScriptedFetcher::always(Ok(200)));
        let (registry, runner) = registry_runner(fetcher.clone());
        registry.add("a.example", 5).await.unwrap();
        registry.add("b.example", 5).await.unwrap();
        registry.touch_last_checked("a.example", Utc::now()).await.unwrap();

        let report = runner.run_now().await;
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.success_count(), 2);
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn test_scheduled_run_only_probes_due_domains() {
        let _ = tracing_subscriber::fmt::try_init();

        let fetcher = Arc::new(ScriptedFetcher::always(Ok(200)));
        let (registry, runner) = registry_runner(fetcher.clone());
        let now = Utc::now();

        registry.add("new.example", 5).await.unwrap();
        registry.add("recent.example", 5).await.unwrap();
        registry.add("stale.example", 5).await.unwrap();
        let recent_check = now - TimeDelta::minutes(2);
        registry.touch_last_checked("recent.example", recent_check).await.unwrap();
        registry.touch_last_checked("stale.example", now - TimeDelta::minutes(6)).await.unwrap();

        let run = runner.run_scheduled(now).await;

        let probed: Vec<_> = run.report.outcomes.iter().map(|o| o.domain.as_str()).collect();
        assert_eq!(probed, vec!["new.example", "stale.example"]);
        assert_eq!(run.skipped, vec!["recent.example".to_string()]);
        assert_eq!(fetcher.call_count(), 2);

        assert!(registry.config("new.example").await.last_checked.is_some_and(|t| t >= now));
        assert!(registry.config("stale.example").await.last_checked.is_some_and(|t| t >= now));
        assert_eq!(registry.config("recent.example").await.last_checked, Some(recent_check));

        assert_eq!(registry.logs("new.example", 20).await.len(), 1);
        assert!(registry.logs("recent.example", 20).await.is_empty());
    }

    #[tokio::test]
    async fn test_scheduled_run_touches_failed_domains() {
        let fetcher = Arc::new(ScriptedFetcher::always(Err(FetchError("timed out".to_string()))));
        let (registry, runner) = registry_runner(fetcher);
        registry.add("down.example", 5).await.unwrap();

        let now = Utc::now();
        let run = runner.run_scheduled(now).await;

        assert_eq!(run.report.outcomes.len(), 1);
        assert_eq!(run.report.outcomes[0].status, OutcomeStatus::Failure);
        assert!(registry.config("down.example").await.last_checked.is_some());

        let logs = registry.logs("down.example", 20).await;
        assert_eq!(logs[0].status, LogStatus::Failure);
        assert_eq!(logs[0].error.as_deref(), Some("timed out"));

        // Just checked, so the next pass skips it
        let next = runner.run_scheduled(Utc::now()).await;
        assert!(next.report.outcomes.is_empty());
        assert_eq!(next.skipped, vec!["down.example".to_string()]);
    }

    #[tokio::test]
    async fn test_static_source_probes_everything_each_tick() {
        let fetcher = Arc::new(ScriptedFetcher::always(Ok(200)));
        let runner = TaskRunner::new(
            fetcher.clone(),
            settings(),
            DomainSource::Static(domains(&["a.example", "b.example"])),
        );

        runner.run_scheduled(Utc::now()).await;
        let second = runner.run_scheduled(Utc::now()).await;

        assert_eq!(second.report.outcomes.len(), 2);
        assert_eq!(fetcher.call_count(), 4);
    }

    #[test]
    fn test_target_domains_parsing() {
        assert!(matches!(
            DomainSource::from_target_domains(r#"["a.example","https://b.example"]"#),
            DomainSource::Static(d) if d.len() == 2
        ));

        for raw in ["[]", "\"a.example\"", "[1, 2]", "not json"] {
            assert!(
                matches!(
                    DomainSource::from_target_domains(raw),
                    DomainSource::Unavailable(ConfigError::MalformedTargetDomains(_))
                ),
                "{raw:?} should be rejected"
            );
        }
    }
}
