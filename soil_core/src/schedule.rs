//! Next-watering projection and the weighing reminder.

use crate::config::{CareCfg, CareMode};
use crate::time::days_between;
use chrono::{NaiveDateTime, TimeDelta};
use tracing::warn;

/// Next due date from the last reported watering and the cadence.
///
/// Overdue projections roll forward by whole multiples of the cadence so the
/// result is never in the past. `None` for a zero-day cadence.
pub fn project_next_watering(
    last_watering_at: NaiveDateTime,
    frequency_days: u32,
    now: NaiveDateTime,
) -> Option<NaiveDateTime> {
    if frequency_days == 0 {
        return None;
    }
    let freq = i64::from(frequency_days);
    let naive = last_watering_at.checked_add_signed(TimeDelta::try_days(freq)?)?;
    if naive >= now {
        return Some(naive);
    }
    let elapsed = days_between(last_watering_at, now);
    let steps = ((elapsed / freq as f64).ceil() as i64).max(1);
    let rolled = freq
        .checked_mul(steps)
        .and_then(TimeDelta::try_days)
        .and_then(|d| last_watering_at.checked_add_signed(d));
    match rolled {
        Some(at) => Some(at),
        None => {
            warn!(%last_watering_at, frequency_days, "roll-forward overflowed; keeping naive projection");
            Some(naive)
        }
    }
}

/// Whether the plant should be weighed again.
pub fn needs_weighing(last_measured_at: Option<NaiveDateTime>, care: &CareCfg, now: NaiveDateTime) -> bool {
    if care.mode == CareMode::Vacation {
        return false;
    }
    let Some(last) = last_measured_at else {
        return true;
    };
    let interval = TimeDelta::hours(i64::from(care.weighing_interval_hours));
    now.checked_sub_signed(interval).is_some_and(|threshold| last < threshold)
}
