//! Plant-level calibration bounds, recomputed from scratch after every write.

use crate::classify::last_repotting;
use crate::error::{Result, history};
use serde::Serialize;
use soil_traits::{EventFilter, MeasurementHistory, PlantId, ScanRange};

/// Smallest observed empty-pot weight and largest observed water addition in
/// the current repotting epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlantBounds {
    pub min_dry_weight_g: Option<i64>,
    pub max_water_weight_g: Option<i64>,
}

impl PlantBounds {
    /// Saturated weight, `min_dry + max_water`.
    pub fn capacity(&self) -> Option<i64> {
        self.min_dry_weight_g?.checked_add(self.max_water_weight_g?)
    }
}

/// Values of the row just written that may move a bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundCandidate {
    pub weight_g: Option<i64>,
    pub water_added_g: Option<i64>,
}

/// Recompute both bounds for `plant`.
///
/// Weights count strictly after the last repotting, water additions at or after
/// it; without a repotting the whole history counts.
pub fn recompute_bounds<H: MeasurementHistory + ?Sized>(
    h: &H,
    plant: &PlantId,
    candidate: BoundCandidate,
) -> Result<PlantBounds> {
    let repot = last_repotting(h, plant, None)?;
    let (weight_range, water_range) = match &repot {
        Some(r) => (ScanRange::after(r.measured_at), ScanRange::since(r.measured_at)),
        None => (ScanRange::all(), ScanRange::all()),
    };
    let weights = h
        .scan(plant, EventFilter::Any, &weight_range)
        .map_err(history)?;
    let waters = h
        .scan(plant, EventFilter::Any, &water_range)
        .map_err(history)?;

    let min_dry = weights
        .iter()
        .filter_map(|r| r.measured_weight_g)
        .chain(candidate.weight_g)
        .min();
    let max_water = waters
        .iter()
        .filter_map(|r| r.water_added_g)
        .chain(candidate.water_added_g)
        .max();
    Ok(PlantBounds {
        min_dry_weight_g: min_dry,
        max_water_weight_g: max_water,
    })
}
