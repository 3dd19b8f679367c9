//! Read-side view of a plant's measurement history.
//!
//! The engine never talks to a database directly. Everything it needs from the
//! store is expressed through [`MeasurementHistory`]: point lookups, "latest row
//! matching a role" locators and ordered range scans.

use crate::ids::{MeasurementId, PlantId};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::ops::Bound;

pub type HistoryError = Box<dyn std::error::Error + Send + Sync>;
pub type HistoryResult<T> = Result<T, HistoryError>;

/// One stored observation for a plant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRow {
    pub id: MeasurementId,
    pub plant_id: PlantId,
    pub measured_at: NaiveDateTime,
    pub measured_weight_g: Option<i64>,
    pub last_dry_weight_g: Option<i64>,
    pub last_wet_weight_g: Option<i64>,
    pub water_added_g: Option<i64>,
    pub water_loss_total_pct: Option<f64>,
    pub water_loss_total_g: Option<i64>,
    pub water_loss_day_pct: Option<f64>,
    pub water_loss_day_g: Option<i64>,
    pub method_id: Option<String>,
    pub use_last_method: bool,
    pub scale_id: Option<String>,
    pub note: Option<String>,
}

impl MeasurementRow {
    /// `true` when none of the four loss columns carry a value.
    pub fn losses_unset(&self) -> bool {
        self.water_loss_total_pct.is_none()
            && self.water_loss_total_g.is_none()
            && self.water_loss_day_pct.is_none()
            && self.water_loss_day_g.is_none()
    }
}

/// Row roles recognised from the null-pattern of a stored row.
///
/// Two watering predicates coexist: `WateringLoose` drives cadence statistics,
/// `WateringStrict` locates the last watering that carries usable baselines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    Any,
    Weighing,
    Repotting,
    WateringLoose,
    WateringStrict,
}

impl EventFilter {
    pub fn matches(self, row: &MeasurementRow) -> bool {
        match self {
            EventFilter::Any => true,
            EventFilter::Repotting => {
                row.measured_weight_g.is_some()
                    && row.last_dry_weight_g.is_some()
                    && row.water_added_g.is_some()
                    && row.last_wet_weight_g.is_none()
                    && row.losses_unset()
            }
            EventFilter::Weighing => {
                row.measured_weight_g.is_some() && !EventFilter::Repotting.matches(row)
            }
            EventFilter::WateringLoose => {
                row.measured_weight_g.is_none() && row.water_loss_total_pct == Some(0.0)
            }
            EventFilter::WateringStrict => {
                EventFilter::WateringLoose.matches(row)
                    && row.water_loss_total_g.is_none()
                    && row.water_loss_day_pct.is_none()
                    && row.water_loss_day_g.is_none()
                    && row.last_dry_weight_g.is_some()
                    && row.last_wet_weight_g.is_some()
                    && row.water_added_g.is_some_and(|g| g > 0)
            }
        }
    }
}

/// Position in a plant's history that a derivation is evaluated against.
///
/// `at` is the candidate timestamp; `exclude` is the row being edited, which must
/// never serve as its own neighbour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsOf {
    pub at: NaiveDateTime,
    pub exclude: Option<MeasurementId>,
}

impl AsOf {
    /// Cursor for a brand-new row.
    pub fn append(at: NaiveDateTime) -> Self {
        Self { at, exclude: None }
    }

    /// Cursor for an existing row moved to (or kept at) `at`.
    pub fn editing(at: NaiveDateTime, id: MeasurementId) -> Self {
        Self {
            at,
            exclude: Some(id),
        }
    }

    fn excludes(&self, row: &MeasurementRow) -> bool {
        self.exclude.as_ref() == Some(&row.id)
    }

    /// Row is visible at or before the cursor (used by locators).
    pub fn sees(&self, row: &MeasurementRow) -> bool {
        row.measured_at <= self.at && !self.excludes(row)
    }

    /// Row lies strictly before the cursor (used for the previous-row lookup).
    pub fn precedes(&self, row: &MeasurementRow) -> bool {
        row.measured_at < self.at && !self.excludes(row)
    }
}

/// Time window for an ordered scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRange {
    pub lower: Bound<NaiveDateTime>,
    pub upper: Bound<NaiveDateTime>,
    pub exclude: Option<MeasurementId>,
}

impl Default for ScanRange {
    fn default() -> Self {
        Self::all()
    }
}

impl ScanRange {
    pub fn all() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
            exclude: None,
        }
    }

    /// Rows at or after `at`.
    pub fn since(at: NaiveDateTime) -> Self {
        Self {
            lower: Bound::Included(at),
            ..Self::all()
        }
    }

    /// Rows strictly after `at`.
    pub fn after(at: NaiveDateTime) -> Self {
        Self {
            lower: Bound::Excluded(at),
            ..Self::all()
        }
    }

    /// Cap the window at `at`, inclusive.
    pub fn until(mut self, at: NaiveDateTime) -> Self {
        self.upper = Bound::Included(at);
        self
    }

    pub fn excluding(mut self, id: Option<MeasurementId>) -> Self {
        self.exclude = id;
        self
    }

    pub fn contains(&self, row: &MeasurementRow) -> bool {
        let t = row.measured_at;
        let lower_ok = match self.lower {
            Bound::Included(l) => t >= l,
            Bound::Excluded(l) => t > l,
            Bound::Unbounded => true,
        };
        let upper_ok = match self.upper {
            Bound::Included(u) => t <= u,
            Bound::Excluded(u) => t < u,
            Bound::Unbounded => true,
        };
        lower_ok && upper_ok && self.exclude.as_ref() != Some(&row.id)
    }
}

/// Ordered, per-plant access to stored measurements.
pub trait MeasurementHistory {
    /// Point lookup by id.
    fn get(&self, id: &MeasurementId) -> HistoryResult<Option<MeasurementRow>>;

    /// Most recent row of `plant` matching `filter`; when `as_of` is given only rows
    /// the cursor [`sees`](AsOf::sees) qualify.
    fn latest(
        &self,
        plant: &PlantId,
        filter: EventFilter,
        as_of: Option<&AsOf>,
    ) -> HistoryResult<Option<MeasurementRow>>;

    /// Row immediately preceding the cursor.
    fn previous(&self, plant: &PlantId, cursor: &AsOf) -> HistoryResult<Option<MeasurementRow>>;

    /// Rows of `plant` matching `filter` inside `range`, ascending by `measured_at`.
    fn scan(
        &self,
        plant: &PlantId,
        filter: EventFilter,
        range: &ScanRange,
    ) -> HistoryResult<Vec<MeasurementRow>>;
}
