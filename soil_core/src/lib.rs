#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Measurement derivation and water-balance engine (storage-agnostic).
//!
//! All history access goes through `soil_traits::MeasurementHistory`; the
//! engine never opens a database itself.
//!
//! ## Architecture
//!
//! - **Classification**: `MeasurementKind` and last-event locators (`classify`)
//! - **Derivation**: dry/wet baselines and water added (`baseline`), loss
//!   figures (`loss`), combined in `measurement::derive_measurement`
//! - **Reads**: retention percent (`retention`), cadence (`frequency`),
//!   next due date and weighing reminder (`schedule`), `summary`
//! - **Maintenance**: plant bounds (`bounds`), over-watering corrector
//!   (`correction`), under-watering view (`calibration`), `repotting`
//!
//! ## Units
//!
//! Grams are `i64`. Percentages are `f64`, rounded to two decimals when they are
//! stored. Timestamps are naive UTC with millisecond tiebreak slots (`time`).

pub mod baseline;
pub mod bounds;
pub mod calibration;
pub mod classify;
pub mod config;
pub mod conversions;
pub mod correction;
pub mod error;
pub mod frequency;
pub mod loss;
pub mod measurement;
pub mod mocks;
pub mod repotting;
pub mod retention;
pub mod schedule;
pub mod summary;
pub mod time;

pub use crate::bounds::{BoundCandidate, PlantBounds, recompute_bounds};
pub use crate::classify::MeasurementKind;
pub use crate::config::{CapMode, CareCfg, CareMode, CorrectionCfg};
pub use crate::correction::{CorrectionResult, CorrectionWindow, RowCorrection};
pub use crate::error::{EngineError, Result};
pub use crate::measurement::{Derivation, MeasurementInput, derive_measurement};
pub use crate::summary::{CareSummary, Plant};
