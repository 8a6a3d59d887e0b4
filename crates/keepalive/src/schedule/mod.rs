pub mod due;
/// Scheduling decisions
///
/// This module is responsible for:
/// - Deciding which domains are due for a wakeup on a tick
/// - Deriving the next check time shown for each domain
/// - Turning the configured schedule expression into a tick period
pub mod tick;

pub use due::{is_due, next_check_time};
pub use tick::TickSchedule;
