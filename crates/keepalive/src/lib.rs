//! Keepalive - periodic wakeup pings for idle-suspending hosts
//!
//! This library holds the engine behind the keep-alive service:
//! the key-value store contract, the domain registry built on it,
//! the retrying wakeup probe, the due-time bookkeeping and the task runner
//! that fans probes out on every tick.

pub mod config;
pub mod error;
pub mod probe;
pub mod registry;
pub mod runner;
pub mod schedule;
pub mod store;
pub mod ticker;

// Re-export main types
pub use config::Config;
pub use error::{ConfigError, FetchError, RegistryError, StoreError};
pub use probe::{HttpFetcher, OutcomeStatus, ProbeSettings, TaskOutcome, WakeupProbe};
pub use registry::{DomainConfig, DomainEntry, DomainRegistry, DomainStatus, LogEntry};
pub use runner::{DomainSource, ScheduledRun, TaskReport, TaskRunner};
pub use schedule::TickSchedule;
pub use store::{KeyValueStore, LibsqlStore, MemoryStore};
pub use ticker::{IntervalTicker, TickHandler};

/// Default interval between wakeups of a domain, in minutes
pub const DEFAULT_INTERVAL_MINUTES: u32 = 5;
