//! Watering cadence: median interval between reported waterings since the
//! last repotting.

use crate::classify::last_repotting;
use crate::error::{Result, history};
use crate::time::days_between;
use chrono::NaiveDateTime;
use serde::Serialize;
use soil_traits::{EventFilter, MeasurementHistory, PlantId, ScanRange};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrequencyEstimate {
    /// Whole days; `None` with fewer than two waterings.
    pub days: Option<u32>,
    pub event_count: usize,
}

/// Median of consecutive gaps (days) between ascending `events`, rounded half
/// to even. Negative gaps are discarded.
pub fn median_interval_days(events: &[NaiveDateTime]) -> Option<u32> {
    let mut gaps: Vec<f64> = events
        .windows(2)
        .map(|w| days_between(w[0], w[1]))
        .filter(|d| *d >= 0.0)
        .collect();
    if gaps.is_empty() {
        return None;
    }
    gaps.sort_by(f64::total_cmp);
    let mid = gaps.len() / 2;
    let median = if gaps.len() % 2 == 0 {
        (gaps[mid - 1] + gaps[mid]) / 2.0
    } else {
        gaps[mid]
    };
    let days = median.round_ties_even();
    (days.is_finite() && days <= f64::from(u32::MAX)).then_some(days as u32)
}

pub fn estimate<H: MeasurementHistory + ?Sized>(
    h: &H,
    plant: &PlantId,
) -> Result<FrequencyEstimate> {
    let range = match last_repotting(h, plant, None)? {
        Some(repot) => ScanRange::since(repot.measured_at),
        None => ScanRange::all(),
    };
    let events: Vec<NaiveDateTime> = h
        .scan(plant, EventFilter::WateringLoose, &range)
        .map_err(history)?
        .into_iter()
        .map(|r| r.measured_at)
        .collect();
    Ok(FrequencyEstimate {
        days: median_interval_days(&events),
        event_count: events.len(),
    })
}
