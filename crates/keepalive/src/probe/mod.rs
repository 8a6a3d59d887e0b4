pub mod fetcher;
/// Wakeup probing
///
/// This module is responsible for:
/// - Issuing the GET requests that keep a host warm
/// - Retrying failed attempts with a fixed delay
/// - Classifying the final outcome and recording it in the domain's log
pub mod types;
pub mod wakeup;

pub use fetcher::{Fetcher, HttpFetcher};
pub use types::{OutcomeStatus, ProbeSettings, TaskOutcome};
pub use wakeup::{WakeupProbe, normalize_url};
