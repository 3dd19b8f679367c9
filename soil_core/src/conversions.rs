//! `From` implementations bridging `soil_config` types to `soil_core` types.

use crate::config::{CapMode, CareCfg, CareMode, CorrectionCfg};

// ── CareCfg ──────────────────────────────────────────────────────────────────

impl From<soil_config::CareMode> for CareMode {
    fn from(m: soil_config::CareMode) -> Self {
        match m {
            soil_config::CareMode::Manual => Self::Manual,
            soil_config::CareMode::Automatic => Self::Automatic,
            soil_config::CareMode::Vacation => Self::Vacation,
        }
    }
}

impl From<&soil_config::Care> for CareCfg {
    fn from(c: &soil_config::Care) -> Self {
        Self {
            mode: c.mode.into(),
            weighing_interval_hours: c.weighing_interval_hours,
        }
    }
}

// ── CorrectionCfg ────────────────────────────────────────────────────────────

impl From<soil_config::CapMode> for CapMode {
    fn from(m: soil_config::CapMode) -> Self {
        match m {
            soil_config::CapMode::Capacity => Self::Capacity,
            soil_config::CapMode::RetainedRatio => Self::RetainedRatio,
        }
    }
}

impl From<&soil_config::Corrections> for CorrectionCfg {
    fn from(c: &soil_config::Corrections) -> Self {
        Self {
            cap: c.cap.into(),
            edit_last_wet: c.edit_last_wet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_survive_the_bridge() {
        let cfg = soil_config::load_toml("").unwrap();
        let care = CareCfg::from(&cfg.care);
        assert_eq!(care.mode, CareMode::Automatic);
        assert_eq!(care.weighing_interval_hours, 18);
        let corr = CorrectionCfg::from(&cfg.corrections);
        assert_eq!(corr.cap, CapMode::Capacity);
        assert!(corr.edit_last_wet);
    }

    #[test]
    fn retained_ratio_maps_through() {
        let cfg = soil_config::load_toml("[corrections]\ncap = \"retained_ratio\"\n").unwrap();
        assert_eq!(CorrectionCfg::from(&cfg.corrections).cap, CapMode::RetainedRatio);
    }
}
