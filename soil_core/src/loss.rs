//! Water-loss accumulation.
//!
//! Per-event loss compares a weighing with the one before it; cumulative loss
//! sums every per-event loss since the last strict watering. Each field is
//! computed on its own: a missing denominator or an overflow leaves that field
//! unset while its siblings still compute.

use crate::baseline::DerivedWeights;
use crate::classify::last_watering;
use crate::error::{Result, history};
use serde::Serialize;
use soil_traits::{AsOf, EventFilter, MeasurementHistory, MeasurementRow, PlantId, ScanRange};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WaterLoss {
    pub day_g: Option<i64>,
    pub day_pct: Option<f64>,
    pub total_g: Option<i64>,
    pub total_pct: Option<f64>,
    pub is_watering_event: bool,
}

impl WaterLoss {
    /// Loss figures of a watering: nothing lost yet.
    pub fn watering() -> Self {
        Self {
            total_pct: Some(0.0),
            is_watering_event: true,
            ..Self::default()
        }
    }
}

/// Round to two decimals, as stored.
#[inline]
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// `part / whole * 100` rounded to two decimals; `None` unless `whole > 0`.
#[inline]
pub fn percent_of(part: i64, whole: i64) -> Option<f64> {
    if whole <= 0 {
        return None;
    }
    let pct = part as f64 / whole as f64 * 100.0;
    pct.is_finite().then(|| round2(pct))
}

/// Loss since the previous weighing (or since the wet baseline when there is none).
///
/// Returns `(day_g, day_pct)`. A weight rise without a recorded watering counts as
/// zero loss.
pub fn day_loss(
    weight: Option<i64>,
    last_wet: Option<i64>,
    last_watering_added: i64,
    prev_weight: Option<i64>,
) -> (Option<i64>, Option<f64>) {
    let Some(weight) = weight else {
        return (None, None);
    };
    let Some(baseline) = prev_weight.or(last_wet) else {
        return (None, None);
    };
    let Some(day_g) = baseline.checked_sub(weight).map(|d| d.max(0)) else {
        warn!(baseline, weight, "day loss overflowed; leaving unset");
        return (None, None);
    };
    let day_pct = percent_of(day_g, last_watering_added)
        .or_else(|| last_wet.and_then(|wet| percent_of(day_g, wet)));
    (Some(day_g), day_pct)
}

/// Contribution of an already stored row to the running total.
///
/// Rows without a weight contribute nothing when they have no stored day loss.
fn stored_day_loss(row: &MeasurementRow) -> i64 {
    row.water_loss_day_g.unwrap_or_else(|| match row.measured_weight_g {
        Some(w) => row.last_wet_weight_g.unwrap_or(0).saturating_sub(w).max(0),
        None => 0,
    })
}

/// Fold stored rows after `last_watering` plus the current day loss into totals.
pub fn accumulate_totals(
    day_g: Option<i64>,
    day_pct: Option<f64>,
    since_watering: &[MeasurementRow],
    last_watering: &MeasurementRow,
) -> WaterLoss {
    let mut loss = WaterLoss {
        day_g,
        day_pct,
        ..WaterLoss::default()
    };
    let summed = since_watering
        .iter()
        .try_fold(0i64, |acc, r| acc.checked_add(stored_day_loss(r)))
        .and_then(|s| s.checked_add(day_g.unwrap_or(0)));
    let Some(total_g) = summed else {
        warn!("cumulative loss overflowed; leaving totals unset");
        return loss;
    };
    loss.total_g = Some(total_g);

    let added = last_watering.water_added_g.unwrap_or(0);
    loss.total_pct = percent_of(total_g, added);
    if loss.day_pct.is_none() {
        loss.day_pct = day_g.and_then(|d| percent_of(d, added));
    }
    loss
}

/// Loss figures for a candidate row at `cursor`.
pub fn accumulate<H: MeasurementHistory + ?Sized>(
    h: &H,
    plant: &PlantId,
    cursor: &AsOf,
    weight: Option<i64>,
    derived: &DerivedWeights,
) -> Result<WaterLoss> {
    if weight.is_none() {
        return Ok(WaterLoss::watering());
    }
    let (day_g, day_pct) = day_loss(
        weight,
        derived.last_wet_weight_g,
        derived.last_watering_added,
        derived.prev_measured_weight,
    );

    let Some(watered) = last_watering(h, plant, Some(cursor))? else {
        debug!("no prior watering; totals stay unset");
        return Ok(WaterLoss {
            day_g,
            day_pct,
            ..WaterLoss::default()
        });
    };
    let range = ScanRange::after(watered.measured_at)
        .until(cursor.at)
        .excluding(cursor.exclude);
    let rows = h
        .scan(plant, EventFilter::Any, &range)
        .map_err(history)?;
    Ok(accumulate_totals(day_g, day_pct, &rows, &watered))
}
