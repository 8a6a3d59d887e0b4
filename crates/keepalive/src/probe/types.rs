use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Terminal classification of one domain's wakeup in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeStatus {
    Success,
    Failure,
    /// The probe task itself blew up
    SystemError,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Success => write!(f, "success"),
            OutcomeStatus::Failure => write!(f, "failure"),
            OutcomeStatus::SystemError => write!(f, "system-error"),
        }
    }
}

/// Result of waking up one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutcome {
    /// Domain as configured, before URL normalisation
    pub domain: String,

    pub status: OutcomeStatus,

    /// Status code of the last HTTP response, if the last attempt got one
    pub status_code: Option<u16>,

    /// Attempts used, at least 1
    pub attempts: u32,

    pub error: Option<String>,
}

impl TaskOutcome {
    pub fn success(domain: String, status_code: u16, attempts: u32) -> Self {
        Self {
            domain,
            status: OutcomeStatus::Success,
            status_code: Some(status_code),
            attempts,
            error: None,
        }
    }

    pub fn failure(domain: String, status_code: Option<u16>, attempts: u32, error: String) -> Self {
        Self { domain, status: OutcomeStatus::Failure, status_code, attempts, error: Some(error) }
    }

    pub fn system_error(domain: String, attempts: u32, error: String) -> Self {
        Self {
            domain,
            status: OutcomeStatus::SystemError,
            status_code: None,
            attempts,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Retry policy and identity of wakeup requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Extra attempts after the first one
    pub retries: u32,
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl ProbeSettings {
    pub const DEFAULT_USER_AGENT: &'static str = "KeepAlive-Worker/2.0";

    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            retries: 2,
            retry_delay: Duration::from_millis(2000),
            user_agent: Self::DEFAULT_USER_AGENT.to_string(),
        }
    }
}
