//! Event classification and last-event locators.
//!
//! Stored rows carry no explicit type column; their role is recovered from the
//! null-pattern once, here, and handed around as a [`MeasurementKind`].

use crate::error::{Result, history};
use serde::Serialize;
use soil_traits::{AsOf, EventFilter, MeasurementHistory, MeasurementRow, PlantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementKind {
    Weighing,
    Watering,
    Repotting,
}

impl MeasurementKind {
    /// Role of a stored row. Anything without a weight is a watering.
    pub fn of(row: &MeasurementRow) -> Self {
        if EventFilter::Repotting.matches(row) {
            Self::Repotting
        } else if row.measured_weight_g.is_some() {
            Self::Weighing
        } else {
            Self::Watering
        }
    }

    pub fn is_watering(self) -> bool {
        matches!(self, Self::Watering)
    }
}

/// Most recent Repotting row, if the plant was ever repotted.
pub fn last_repotting<H: MeasurementHistory + ?Sized>(
    h: &H,
    plant: &PlantId,
    as_of: Option<&AsOf>,
) -> Result<Option<MeasurementRow>> {
    h.latest(plant, EventFilter::Repotting, as_of)
        .map_err(history)
}

/// Most recent watering that carries usable baselines (strict predicate).
pub fn last_watering<H: MeasurementHistory + ?Sized>(
    h: &H,
    plant: &PlantId,
    as_of: Option<&AsOf>,
) -> Result<Option<MeasurementRow>> {
    h.latest(plant, EventFilter::WateringStrict, as_of)
        .map_err(history)
}

/// Most recent reported watering (loose predicate); drives cadence projection.
pub fn last_reported_watering<H: MeasurementHistory + ?Sized>(
    h: &H,
    plant: &PlantId,
) -> Result<Option<MeasurementRow>> {
    h.latest(plant, EventFilter::WateringLoose, None)
        .map_err(history)
}
