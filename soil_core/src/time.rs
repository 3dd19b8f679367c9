//! Timestamp helpers shared by the engine and the store.
//!
//! Every `measured_at` reaching the engine has whole-second precision plus a
//! caller-assigned millisecond slot used as a tiebreak between rows recorded
//! in the same second.

use crate::error::{EngineError, Result};
use chrono::{DateTime, NaiveDateTime, TimeDelta, Timelike};

/// Fixed-width textual form used for storage; lexicographic order matches time order.
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Highest tiebreak slot (milliseconds).
pub const MAX_SLOT: i64 = 999;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Truncate to whole seconds and apply the millisecond slot, clamped to `0..=999`.
#[inline]
pub fn with_slot(at: NaiveDateTime, slot: i64) -> NaiveDateTime {
    let whole = at.with_nanosecond(0).unwrap_or(at);
    whole + TimeDelta::milliseconds(slot.clamp(0, MAX_SLOT))
}

/// Parse an ISO-8601 timestamp from the boundary and normalize it.
///
/// Accepts `T` or a space between date and time, optional seconds and fraction,
/// and an optional `Z`/`±hh:mm` offset (converted to UTC). Naive inputs are taken
/// as UTC.
pub fn normalize_measured_at(raw: &str, slot: i64) -> Result<NaiveDateTime> {
    let trimmed = raw.trim();
    let mut s = trimmed.replacen(' ', "T", 1);
    if let Some(stripped) = s.strip_suffix(['Z', 'z']) {
        s = format!("{stripped}+00:00");
    }

    const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"];
    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

    let parsed = OFFSET_FORMATS
        .iter()
        .find_map(|f| DateTime::parse_from_str(&s, f).ok())
        .map(|dt| dt.naive_utc())
        .or_else(|| {
            NAIVE_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(&s, f).ok())
        });

    match parsed {
        Some(at) => Ok(with_slot(at, slot)),
        None => Err(EngineError::validation(format!("invalid measured_at {trimmed:?}")).into()),
    }
}

/// Render in the storage format.
#[inline]
pub fn to_storage(at: NaiveDateTime) -> String {
    at.format(STORAGE_FORMAT).to_string()
}

/// Parse the storage format back.
pub fn from_storage(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, STORAGE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Fractional days between two instants (negative when `later` precedes `earlier`).
#[inline]
pub fn days_between(earlier: NaiveDateTime, later: NaiveDateTime) -> f64 {
    later
        .signed_duration_since(earlier)
        .num_milliseconds() as f64
        / MILLIS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32, ms: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 21)
            .and_then(|d| d.and_hms_milli_opt(h, m, s, ms))
            .unwrap()
    }

    #[test]
    fn accepts_minutes_only_with_t_or_space() {
        assert_eq!(normalize_measured_at("2025-10-21T19:33", 0).unwrap(), at(19, 33, 0, 0));
        assert_eq!(normalize_measured_at("2025-10-21 19:33", 2).unwrap(), at(19, 33, 0, 2));
    }

    #[test]
    fn drops_fraction_and_applies_slot() {
        let got = normalize_measured_at("2025-10-21T19:33:07.845", 3).unwrap();
        assert_eq!(got, at(19, 33, 7, 3));
    }

    #[test]
    fn converts_offsets_to_utc() {
        assert_eq!(
            normalize_measured_at("2025-10-21T21:33:00+02:00", 0).unwrap(),
            at(19, 33, 0, 0)
        );
        assert_eq!(normalize_measured_at("2025-10-21T19:33:00Z", 0).unwrap(), at(19, 33, 0, 0));
    }

    #[test]
    fn clamps_slot() {
        assert_eq!(normalize_measured_at("2025-10-21T19:33", 5000).unwrap(), at(19, 33, 0, 999));
        assert_eq!(normalize_measured_at("2025-10-21T19:33", -4).unwrap(), at(19, 33, 0, 0));
    }

    #[test]
    fn rejects_garbage() {
        let err = normalize_measured_at("yesterday", 0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::Validation(_))
        ));
    }

    #[test]
    fn storage_format_round_trips_and_orders() {
        let a = at(8, 0, 0, 1);
        let b = at(8, 0, 0, 12);
        assert_eq!(from_storage(&to_storage(a)), Some(a));
        assert!(to_storage(a) < to_storage(b));
    }
}
