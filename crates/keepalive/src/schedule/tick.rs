use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Schedule expression used when none is configured: every minute
pub const DEFAULT_SCHEDULE: &str = "*/1 * * * *";

/// How often the scheduled pass runs.
///
/// Accepts the minute-step subset of cron syntax: `* * * * *` and
/// `*/N * * * *`. Per-domain intervals are enforced by the due test, so the
/// tick only needs to be at least as fine as the shortest interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSchedule {
    every_minutes: u32,
}

impl TickSchedule {
    pub fn every_minutes(every_minutes: u32) -> Self {
        Self { every_minutes: every_minutes.max(1) }
    }

    pub fn parse(expression: &str) -> Result<Self, ConfigError> {
        let unsupported = || ConfigError::UnsupportedSchedule(expression.to_string());

        let fields: Vec<&str> = expression.split_whitespace().collect();
        let [minute, rest @ ..] = fields.as_slice() else {
            return Err(unsupported());
        };
        if rest.len() != 4 || rest.iter().any(|field| *field != "*") {
            return Err(unsupported());
        }

        let every_minutes = match *minute {
            "*" => 1,
            step => step
                .strip_prefix("*/")
                .and_then(|n| n.parse::<u32>().ok())
                .filter(|n| (1..=59).contains(n))
                .ok_or_else(unsupported)?,
        };

        Ok(Self { every_minutes })
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(u64::from(self.every_minutes) * 60)
    }
}

impl Default for TickSchedule {
    fn default() -> Self {
        Self::every_minutes(1)
    }
}

impl FromStr for TickSchedule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TickSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "*/{} * * * *", self.every_minutes)
    }
}
