use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::DEFAULT_INTERVAL_MINUTES;

/// One monitored domain as kept in the registry list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEntry {
    pub domain: String,

    /// Secret required to delete this entry; shown to the caller once, on creation
    pub verification_code: String,

    pub added_at: DateTime<Utc>,
}

/// Registry list element as found in the store.
///
/// Early deployments stored the registry as a plain list of domain names;
/// current ones store full records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum StoredEntry {
    Bare(String),
    Record(DomainEntry),
}

/// Per-domain scheduling settings under `domain:<name>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainConfig {
    /// Minutes between wakeups
    #[serde(default = "default_interval", deserialize_with = "lenient_interval")]
    pub interval: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self { interval: DEFAULT_INTERVAL_MINUTES, last_checked: None }
    }
}

/// Public view of a domain: what the dashboard lists.
///
/// `next_check_time` is derived on every read and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainStatus {
    pub domain: String,
    pub interval: u32,
    pub last_checked: Option<DateTime<Utc>>,
    pub next_check_time: DateTime<Utc>,
}

impl DomainStatus {
    /// The stored settings this view was derived from
    pub fn config(&self) -> DomainConfig {
        DomainConfig { interval: self.interval, last_checked: self.last_checked }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Failure,
}

/// One recorded wakeup, kept in a bounded list under `domain:<name>:logs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub status: LogStatus,
    pub status_code: Option<u16>,
    pub url: String,
    pub attempts: u32,
    #[serde(default)]
    pub error: Option<String>,
}

/// What `add` hands back to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedDomain {
    pub verification_code: String,
    /// false when the domain was already registered and only its interval changed
    pub created: bool,
}

/// Result of a successful removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    /// The admin override code authorised the deletion
    pub is_admin: bool,
}

fn default_interval() -> u32 {
    DEFAULT_INTERVAL_MINUTES
}

/// Accept the interval as a number, a numeric string or null.
///
/// Anything that does not yield a positive whole number of minutes falls back
/// to the default.
fn lenient_interval<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawInterval {
        Whole(u64),
        Fraction(f64),
        Text(String),
        Other(IgnoredAny),
    }

    let minutes = match Option::<RawInterval>::deserialize(deserializer)? {
        Some(RawInterval::Whole(n)) => u32::try_from(n).ok(),
        Some(RawInterval::Fraction(f)) if f.is_finite() && f >= 1.0 && f < u32::MAX as f64 => {
            Some(f.trunc() as u32)
        }
        Some(RawInterval::Text(text)) => parse_minutes(&text),
        _ => None,
    };

    Ok(minutes.filter(|m| *m > 0).unwrap_or(DEFAULT_INTERVAL_MINUTES))
}

/// Leading decimal digits of `text`, ignoring surrounding whitespace.
///
/// `"15"` and `"15min"` both read as 15; text without leading digits is `None`.
pub fn parse_minutes(text: &str) -> Option<u32> {
    let digits: String = text.trim().chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}
