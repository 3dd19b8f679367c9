//! Calibration views: waterings that fell short of the plant's capacity.

use crate::bounds::PlantBounds;
use crate::classify::last_repotting;
use crate::error::{Result, history};
use crate::loss::round2;
use chrono::NaiveDateTime;
use serde::Serialize;
use soil_traits::{EventFilter, MeasurementHistory, MeasurementId, PlantId, ScanRange};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnderwateringItem {
    pub id: MeasurementId,
    pub measured_at: NaiveDateTime,
    pub water_added_g: Option<i64>,
    pub last_wet_weight_g: Option<i64>,
    pub target_weight_g: i64,
    /// `max(0, max_water - water_added)`
    pub under_g: Option<i64>,
    /// `under_g` as a share of `max_water`.
    pub under_pct: Option<f64>,
}

/// Waterings strictly after the last repotting, newest first.
///
/// Empty when the plant has no usable bounds.
pub fn underwatering_report<H: MeasurementHistory + ?Sized>(
    h: &H,
    plant: &PlantId,
    bounds: &PlantBounds,
) -> Result<Vec<UnderwateringItem>> {
    let (Some(min_dry), Some(max_water)) = (bounds.min_dry_weight_g, bounds.max_water_weight_g) else {
        return Ok(Vec::new());
    };
    if max_water <= 0 {
        return Ok(Vec::new());
    }
    let target = min_dry.saturating_add(max_water);
    let range = match last_repotting(h, plant, None)? {
        Some(r) => ScanRange::after(r.measured_at),
        None => ScanRange::all(),
    };
    let rows = h.scan(plant, EventFilter::Any, &range).map_err(history)?;

    Ok(rows
        .into_iter()
        .rev()
        .filter(|r| r.measured_weight_g.is_none())
        .map(|r| {
            let under_g = r.water_added_g.map(|a| max_water.saturating_sub(a).max(0));
            UnderwateringItem {
                id: r.id,
                measured_at: r.measured_at,
                water_added_g: r.water_added_g,
                last_wet_weight_g: r.last_wet_weight_g,
                target_weight_g: target,
                under_g,
                under_pct: under_g.map(|g| round2(g as f64 / max_water as f64 * 100.0)),
            }
        })
        .collect())
}
