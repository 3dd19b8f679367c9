//! Retroactive over-watering corrector.
//!
//! Waterings recorded before the plant's capacity was known can carry wet
//! weights above what the pot can actually hold. The corrector plans a capped
//! rewrite of those rows; the store applies the plan in one transaction.

use crate::bounds::PlantBounds;
use crate::classify::last_repotting;
use crate::config::{CapMode, CorrectionCfg};
use crate::error::{Result, history};
use chrono::NaiveDateTime;
use serde::Serialize;
use soil_traits::{EventFilter, MeasurementHistory, MeasurementId, MeasurementRow, PlantId, ScanRange};
use tracing::debug;

/// Inclusive time window; an open start means "since the last repotting".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrectionWindow {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowCorrection {
    pub id: MeasurementId,
    pub measured_at: NaiveDateTime,
    pub last_wet_weight_g: i64,
    pub water_added_g: Option<i64>,
    pub excess_g: i64,
    pub new_water_added_g: i64,
    pub new_last_wet_weight_g: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorrectionResult {
    pub updated: usize,
    pub total_excess_g: i64,
    pub target_weight_g: Option<i64>,
    pub rows: Vec<RowCorrection>,
}

/// Wet weight the corrector caps at; `None` when calibration is incomplete.
pub fn correction_target(bounds: &PlantBounds, recommended_pct: Option<f64>, mode: CapMode) -> Option<i64> {
    match mode {
        CapMode::Capacity => bounds.capacity(),
        CapMode::RetainedRatio => {
            let min_dry = bounds.min_dry_weight_g?;
            let max_water = bounds.max_water_weight_g?;
            let share = (recommended_pct? / 100.0 * max_water as f64).round();
            if !share.is_finite() {
                return None;
            }
            min_dry.checked_add(share as i64)
        }
    }
}

/// Plan the rewrite of every row whose wet weight exceeds `target`.
///
/// Rows are expected ascending; the plan keeps their order.
pub fn plan_corrections(rows: &[MeasurementRow], target: i64, edit_last_wet: bool) -> CorrectionResult {
    let planned: Vec<RowCorrection> = rows
        .iter()
        .filter_map(|r| {
            let wet = r.last_wet_weight_g.filter(|w| *w > target)?;
            let excess = wet - target;
            let new_added = r.water_added_g.unwrap_or(0).saturating_sub(excess).max(0);
            Some(RowCorrection {
                id: r.id,
                measured_at: r.measured_at,
                last_wet_weight_g: wet,
                water_added_g: r.water_added_g,
                excess_g: excess,
                new_water_added_g: new_added,
                new_last_wet_weight_g: if edit_last_wet { wet.min(target) } else { wet },
            })
        })
        .collect();
    CorrectionResult {
        updated: planned.len(),
        total_excess_g: planned.iter().map(|c| c.excess_g).fold(0, i64::saturating_add),
        target_weight_g: Some(target),
        rows: planned,
    }
}

/// Loose waterings of `plant` inside `window`, ascending.
pub fn correction_candidates<H: MeasurementHistory + ?Sized>(
    h: &H,
    plant: &PlantId,
    window: CorrectionWindow,
) -> Result<Vec<MeasurementRow>> {
    let from = match window.from {
        Some(at) => Some(at),
        None => last_repotting(h, plant, None)?.map(|r| r.measured_at),
    };
    let mut range = from.map_or_else(ScanRange::all, ScanRange::since);
    if let Some(to) = window.to {
        range = range.until(to);
    }
    h.scan(plant, EventFilter::WateringLoose, &range)
        .map_err(history)
}

/// Full planning step: resolve the target, select rows, plan the caps.
pub fn plan<H: MeasurementHistory + ?Sized>(
    h: &H,
    plant: &PlantId,
    bounds: &PlantBounds,
    recommended_pct: Option<f64>,
    cfg: &CorrectionCfg,
    window: CorrectionWindow,
) -> Result<CorrectionResult> {
    let Some(target) = correction_target(bounds, recommended_pct, cfg.cap) else {
        debug!(%plant, "calibration incomplete; nothing to correct");
        return Ok(CorrectionResult::default());
    };
    let rows = correction_candidates(h, plant, window)?;
    let result = plan_corrections(&rows, target, cfg.edit_last_wet);
    debug!(%plant, target, updated = result.updated, "planned corrections");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retained_ratio_rounds_the_share() {
        let b = PlantBounds {
            min_dry_weight_g: Some(80),
            max_water_weight_g: Some(25),
        };
        assert_eq!(correction_target(&b, Some(50.0), CapMode::RetainedRatio), Some(93));
        assert_eq!(correction_target(&b, None, CapMode::RetainedRatio), None);
        assert_eq!(correction_target(&b, None, CapMode::Capacity), Some(105));
    }

    #[test]
    fn water_added_never_goes_negative() {
        let row = crate::mocks::RowBuilder::new(1)
            .watering(80, 200, 30)
            .build();
        let plan = plan_corrections(&[row], 100, true);
        assert_eq!(plan.rows[0].excess_g, 100);
        assert_eq!(plan.rows[0].new_water_added_g, 0);
    }

    #[test]
    fn keeping_wet_reports_same_excess_again() {
        let row = crate::mocks::RowBuilder::new(1)
            .watering(80, 110, 50)
            .build();
        let plan = plan_corrections(&[row], 100, false);
        assert_eq!(plan.rows[0].new_last_wet_weight_g, 110);
    }
}
