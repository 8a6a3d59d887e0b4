use chrono::{DateTime, TimeDelta, Utc};

use crate::registry::DomainConfig;

fn interval_delta(config: &DomainConfig) -> TimeDelta {
    TimeDelta::minutes(i64::from(config.interval.max(1)))
}

/// Next time `config` is expected to be checked, as shown to users.
///
/// Never-checked domains are due one interval from now. Otherwise the next
/// multiple of the interval after `last_checked` is used; should that not lie
/// after `now`, one interval from now is reported instead. The result is
/// always strictly later than `now`.
pub fn next_check_time(config: &DomainConfig, now: DateTime<Utc>) -> DateTime<Utc> {
    let interval = interval_delta(config);

    let Some(last_checked) = config.last_checked else {
        return now + interval;
    };

    let elapsed_ms = (now - last_checked).num_milliseconds();
    let completed = elapsed_ms.div_euclid(interval.num_milliseconds());

    let candidate = completed
        .checked_add(1)
        .and_then(|periods| i32::try_from(periods).ok())
        .and_then(|periods| interval.checked_mul(periods))
        .and_then(|offset| last_checked.checked_add_signed(offset));

    match candidate {
        Some(candidate) if candidate > now => candidate,
        _ => now + interval,
    }
}

/// Whether a scheduled tick at `now` should wake the domain up.
///
/// Due when it was never checked or at least one full interval has elapsed.
/// Missed ticks are not skipped forward: every tick past the interval is due.
pub fn is_due(config: &DomainConfig, now: DateTime<Utc>) -> bool {
    match config.last_checked {
        None => true,
        Some(last_checked) => now - last_checked >= interval_delta(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(interval: u32, last_checked: Option<DateTime<Utc>>) -> DomainConfig {
        DomainConfig { interval, last_checked }
    }

    #[test]
    fn test_never_checked_is_due_one_interval_out() {
        let now = Utc::now();
        for interval in [1, 5, 30, 1440] {
            let cfg = config(interval, None);
            assert!(is_due(&cfg, now));
            assert_eq!(next_check_time(&cfg, now), now + TimeDelta::minutes(interval.into()));
        }
    }

    #[test]
    fn test_exact_interval_multiples() {
        let now = Utc::now();
        for interval in [1u32, 5, 17] {
            for k in 1..=6 {
                let last = now - TimeDelta::minutes(i64::from(interval) * k);
                let cfg = config(interval, Some(last));

                assert!(is_due(&cfg, now), "interval {interval}, k {k}");
                let next = next_check_time(&cfg, now);
                assert!(next > now, "interval {interval}, k {k}");
                assert_eq!(next, now + TimeDelta::minutes(interval.into()));
            }
        }
    }

    #[test]
    fn test_mid_interval() {
        let now = Utc::now();
        let cfg = config(10, Some(now - TimeDelta::minutes(3)));

        assert!(!is_due(&cfg, now));
        assert_eq!(next_check_time(&cfg, now), now + TimeDelta::minutes(7));
    }

    #[test]
    fn test_missed_ticks_stay_aligned_for_display() {
        let now = Utc::now();
        // 23 minutes ago with a 5 minute interval: next slot is 25 minutes after
        let last = now - TimeDelta::minutes(23);
        let cfg = config(5, Some(last));

        assert!(is_due(&cfg, now));
        assert_eq!(next_check_time(&cfg, now), last + TimeDelta::minutes(25));
    }

    #[test]
    fn test_last_checked_in_future() {
        let now = Utc::now();
        let last = now + TimeDelta::seconds(30);
        let cfg = config(5, Some(last));

        assert!(!is_due(&cfg, now));
        assert_eq!(next_check_time(&cfg, now), last);
    }

    #[test]
    fn test_zero_interval_treated_as_one_minute() {
        let now = Utc::now();
        let cfg = config(0, Some(now - TimeDelta::seconds(30)));

        assert!(!is_due(&cfg, now));
        assert!(next_check_time(&cfg, now) > now);
    }
}
