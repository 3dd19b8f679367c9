//! Per-plant care view: how wet the pot is now and when it is due.

use crate::bounds::PlantBounds;
use crate::classify::last_reported_watering;
use crate::config::CareCfg;
use crate::error::{Result, history};
use crate::frequency::estimate;
use crate::retention::water_retained_pct;
use crate::schedule::{needs_weighing, project_next_watering};
use chrono::NaiveDateTime;
use serde::Serialize;
use soil_traits::{EventFilter, MeasurementHistory, PlantId};

/// A plant as the engine sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plant {
    pub id: PlantId,
    pub name: String,
    pub recommended_water_threshold_pct: Option<f64>,
    #[serde(flatten)]
    pub bounds: PlantBounds,
    pub archived: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CareSummary {
    pub plant_id: PlantId,
    pub name: String,
    pub latest_at: Option<NaiveDateTime>,
    pub measured_weight_g: Option<i64>,
    pub water_loss_total_pct: Option<f64>,
    /// Whole percent.
    pub water_retained_pct: Option<f64>,
    pub recommended_water_threshold_pct: Option<f64>,
    pub frequency_days: Option<u32>,
    pub watering_events: usize,
    pub next_watering_at: Option<NaiveDateTime>,
    pub needs_weighing: bool,
    pub below_threshold: bool,
}

pub fn care_summary<H: MeasurementHistory + ?Sized>(
    h: &H,
    plant: &Plant,
    care: &CareCfg,
    now: NaiveDateTime,
) -> Result<CareSummary> {
    let latest = h
        .latest(&plant.id, EventFilter::Any, None)
        .map_err(history)?;
    let retained = latest.as_ref().and_then(|r| {
        water_retained_pct(
            plant.bounds.min_dry_weight_g,
            plant.bounds.max_water_weight_g,
            r.measured_weight_g,
            r.last_wet_weight_g,
            r.water_loss_total_pct,
        )
    });
    let retained = retained.map(f64::round_ties_even);

    let freq = estimate(h, &plant.id)?;
    let next_watering_at = match freq.days {
        Some(days) if days > 0 => last_reported_watering(h, &plant.id)?
            .and_then(|w| project_next_watering(w.measured_at, days, now)),
        _ => None,
    };

    let below_threshold = match (retained, plant.recommended_water_threshold_pct) {
        (Some(pct), Some(threshold)) => pct <= threshold,
        _ => false,
    };
    let latest_at = latest.as_ref().map(|r| r.measured_at);

    Ok(CareSummary {
        plant_id: plant.id,
        name: plant.name.clone(),
        latest_at,
        measured_weight_g: latest.as_ref().and_then(|r| r.measured_weight_g),
        water_loss_total_pct: latest.as_ref().and_then(|r| r.water_loss_total_pct),
        water_retained_pct: retained,
        recommended_water_threshold_pct: plant.recommended_water_threshold_pct,
        frequency_days: freq.days,
        watering_events: freq.event_count,
        next_watering_at,
        needs_weighing: needs_weighing(latest_at, care, now),
        below_threshold,
    })
}
