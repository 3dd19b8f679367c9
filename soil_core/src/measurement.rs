//! Write-side entry point: validate an incoming observation, derive its
//! baselines and loss figures, and shape the row to persist.

use crate::baseline::{DerivedWeights, derive_weights, load_context};
use crate::classify::MeasurementKind;
use crate::error::{EngineError, Result};
use crate::loss::{WaterLoss, accumulate};
use chrono::NaiveDateTime;
use soil_traits::{AsOf, MeasurementHistory, MeasurementId, MeasurementRow, PlantId};
use tracing::debug;

/// An observation as supplied by the caller, before derivation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementInput {
    /// Already normalized (whole seconds plus slot).
    pub measured_at: NaiveDateTime,
    pub measured_weight_g: Option<i64>,
    pub last_dry_weight_g: Option<i64>,
    pub last_wet_weight_g: Option<i64>,
    pub water_added_g: Option<i64>,
    pub method_id: Option<String>,
    pub use_last_method: bool,
    pub scale_id: Option<String>,
    pub note: Option<String>,
}

impl MeasurementInput {
    pub fn weighing(measured_at: NaiveDateTime, grams: i64) -> Self {
        Self {
            measured_at,
            measured_weight_g: Some(grams),
            ..Self::default()
        }
    }

    pub fn watering(measured_at: NaiveDateTime, grams: i64) -> Self {
        Self {
            measured_at,
            water_added_g: Some(grams),
            ..Self::default()
        }
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note.filter(|n| !n.trim().is_empty());
        self
    }

    /// Reject inconsistent input and decide the kind once.
    ///
    /// Repotting rows are produced by the repotting sequence, never from input.
    pub fn validate(&self) -> Result<MeasurementKind> {
        let grams = [
            ("measured_weight_g", self.measured_weight_g),
            ("last_dry_weight_g", self.last_dry_weight_g),
            ("last_wet_weight_g", self.last_wet_weight_g),
            ("water_added_g", self.water_added_g),
        ];
        if let Some((name, _)) = grams.iter().find(|(_, v)| v.is_some_and(|g| g < 0)) {
            return Err(EngineError::validation(format!("{name} must be >= 0")).into());
        }
        match (self.measured_weight_g, self.water_added_g) {
            (Some(_), Some(added)) if added > 0 => Err(EngineError::validation(
                "provide either measured_weight_g or water_added_g, not both",
            )
            .into()),
            (Some(_), _) => Ok(MeasurementKind::Weighing),
            (None, _) => Ok(MeasurementKind::Watering),
        }
    }
}

/// Result of running the write pipeline on one input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derivation {
    pub kind: MeasurementKind,
    pub weights: DerivedWeights,
    pub loss: WaterLoss,
}

impl Derivation {
    /// Shape the persisted row.
    pub fn into_row(self, id: MeasurementId, plant: PlantId, input: MeasurementInput) -> MeasurementRow {
        MeasurementRow {
            id,
            plant_id: plant,
            measured_at: input.measured_at,
            measured_weight_g: if self.loss.is_watering_event {
                None
            } else {
                input.measured_weight_g
            },
            last_dry_weight_g: self.weights.last_dry_weight_g,
            last_wet_weight_g: self.weights.last_wet_weight_g,
            water_added_g: Some(self.weights.water_added_g),
            water_loss_total_pct: self.loss.total_pct,
            water_loss_total_g: self.loss.total_g,
            water_loss_day_pct: self.loss.day_pct,
            water_loss_day_g: self.loss.day_g,
            method_id: input.method_id,
            use_last_method: input.use_last_method,
            scale_id: input.scale_id,
            note: input.note,
        }
    }
}

/// Validate, derive baselines and accumulate loss for `input`.
///
/// `editing` names the row being rewritten; it is invisible to every lookup.
pub fn derive_measurement<H: MeasurementHistory + ?Sized>(
    h: &H,
    plant: &PlantId,
    input: &MeasurementInput,
    editing: Option<MeasurementId>,
) -> Result<Derivation> {
    let kind = input.validate()?;
    let cursor = match editing {
        Some(id) => AsOf::editing(input.measured_at, id),
        None => AsOf::append(input.measured_at),
    };
    let ctx = load_context(h, plant, &cursor)?;
    let weights = derive_weights(input, &ctx);
    let loss = accumulate(h, plant, &cursor, input.measured_weight_g, &weights)?;
    debug!(?kind, %plant, at = %input.measured_at, ?loss, "derived measurement");
    Ok(Derivation {
        kind,
        weights,
        loss,
    })
}
