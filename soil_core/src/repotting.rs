//! Repotting sequence.
//!
//! A repot closes the old epoch and opens a new one with three rows sharing a
//! second, ordered by millisecond slots 1, 2 and 3:
//! 1. a weighing of the old pot,
//! 2. a watering carrying the old baselines forward (`total_pct = 0`),
//! 3. the repotting row whose dry baseline is the new wet weight minus the
//!    last watering.

use crate::bounds::BoundCandidate;
use crate::error::{EngineError, Result, history};
use crate::measurement::{MeasurementInput, derive_measurement};
use crate::time::with_slot;
use chrono::NaiveDateTime;
use soil_traits::{EventFilter, MeasurementHistory, MeasurementId, MeasurementRow, PlantId};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepotInput {
    /// Whole-second instant; slots are applied here.
    pub measured_at: NaiveDateTime,
    pub old_weight_g: i64,
    pub new_wet_weight_g: i64,
    pub note: Option<String>,
}

/// Rows to insert, in order, and the bound candidate to recompute with.
#[derive(Debug, Clone, PartialEq)]
pub struct RepotPlan {
    pub rows: [MeasurementRow; 3],
    pub candidate: BoundCandidate,
}

impl RepotPlan {
    pub fn repotting(&self) -> &MeasurementRow {
        &self.rows[2]
    }
}

pub fn plan_repotting<H: MeasurementHistory + ?Sized>(
    h: &H,
    plant: &PlantId,
    input: &RepotInput,
    ids: [MeasurementId; 3],
) -> Result<RepotPlan> {
    if input.old_weight_g < 0 || input.new_wet_weight_g < 0 {
        return Err(EngineError::validation("repotting weights must be >= 0").into());
    }
    if h.latest(plant, EventFilter::Any, None).map_err(history)?.is_none() {
        return Err(EngineError::validation("cannot repot a plant without measurements").into());
    }
    let [id_weighing, id_watering, id_repot] = ids;

    let weighing_input = MeasurementInput::weighing(with_slot(input.measured_at, 1), input.old_weight_g);
    let derived = derive_measurement(h, plant, &weighing_input, None)?;
    let lwa = derived.weights.last_watering_added;
    let weighing = derived.into_row(id_weighing, *plant, weighing_input);

    let closing = MeasurementRow {
        id: id_watering,
        measured_at: with_slot(input.measured_at, 2),
        measured_weight_g: None,
        water_added_g: Some(lwa),
        water_loss_total_pct: Some(0.0),
        water_loss_total_g: None,
        water_loss_day_pct: None,
        water_loss_day_g: None,
        use_last_method: true,
        note: None,
        ..weighing.clone()
    };

    let new_dry = input.new_wet_weight_g.saturating_sub(lwa).max(0);
    let repot = MeasurementRow {
        id: id_repot,
        plant_id: *plant,
        measured_at: with_slot(input.measured_at, 3),
        measured_weight_g: Some(input.new_wet_weight_g),
        last_dry_weight_g: Some(new_dry),
        last_wet_weight_g: None,
        water_added_g: Some(lwa),
        water_loss_total_pct: None,
        water_loss_total_g: None,
        water_loss_day_pct: None,
        water_loss_day_g: None,
        method_id: None,
        use_last_method: false,
        scale_id: None,
        note: input.note.clone(),
    };
    debug!(%plant, new_dry, last_watering_added = lwa, "planned repotting");

    Ok(RepotPlan {
        candidate: BoundCandidate {
            weight_g: Some(new_dry),
            water_added_g: Some(lwa),
        },
        rows: [weighing, closing, repot],
    })
}
