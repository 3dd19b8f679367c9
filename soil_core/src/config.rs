//! Runtime configuration types for the care engine.
//!
//! These are separate from the TOML-deserialized config in `soil_config`;
//! see `conversions` for the bridging `From` impls.

use serde::Serialize;

/// How the owner is currently looking after the plants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CareMode {
    Manual,
    #[default]
    Automatic,
    /// Nobody is around to weigh; reminders are silenced.
    Vacation,
}

/// Weighing reminder settings.
#[derive(Debug, Clone, Copy)]
pub struct CareCfg {
    pub mode: CareMode,
    /// A plant needs weighing once its last reading is older than this.
    pub weighing_interval_hours: u32,
}

impl Default for CareCfg {
    fn default() -> Self {
        Self {
            mode: CareMode::Automatic,
            weighing_interval_hours: 18,
        }
    }
}

/// Target the corrector caps recorded wet weights at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapMode {
    /// `min_dry + max_water`
    #[default]
    Capacity,
    /// `min_dry + round(recommended_pct / 100 * max_water)`
    RetainedRatio,
}

#[derive(Debug, Clone, Copy)]
pub struct CorrectionCfg {
    pub cap: CapMode,
    /// Cap `last_wet_weight_g` as well as `water_added_g`. Required for idempotent reruns.
    pub edit_last_wet: bool,
}

impl Default for CorrectionCfg {
    fn default() -> Self {
        Self {
            cap: CapMode::Capacity,
            edit_last_wet: true,
        }
    }
}
