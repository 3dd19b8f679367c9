//! Weight baseline derivation.
//!
//! A new (or edited) row rarely carries its own dry/wet baselines. They are
//! reconstructed from the row immediately preceding it and from the last
//! watering that recorded usable baselines, both seen through an [`AsOf`]
//! cursor so an edited row never serves as its own neighbour.

use crate::classify::last_watering;
use crate::error::{Result, history};
use crate::measurement::MeasurementInput;
use soil_traits::{AsOf, MeasurementHistory, PlantId};
use tracing::debug;

/// Fields of the row preceding the cursor that derivation cares about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreviousRow {
    pub measured_weight_g: Option<i64>,
    pub last_dry_weight_g: Option<i64>,
    pub last_wet_weight_g: Option<i64>,
}

/// Everything derivation reads from history, loaded once per write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DerivationContext {
    /// `water_added_g` of the last strict watering visible at the cursor; 0 when none.
    pub last_watering_added: i64,
    pub previous: Option<PreviousRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedWeights {
    pub last_dry_weight_g: Option<i64>,
    pub last_wet_weight_g: Option<i64>,
    /// Always non-negative.
    pub water_added_g: i64,
    pub prev_measured_weight: Option<i64>,
    pub last_watering_added: i64,
}

pub fn load_context<H: MeasurementHistory + ?Sized>(
    h: &H,
    plant: &PlantId,
    cursor: &AsOf,
) -> Result<DerivationContext> {
    let last_watering_added = last_watering(h, plant, Some(cursor))?
        .and_then(|r| r.water_added_g)
        .unwrap_or(0);
    let previous = h.previous(plant, cursor).map_err(history)?.map(|r| PreviousRow {
        measured_weight_g: r.measured_weight_g,
        last_dry_weight_g: r.last_dry_weight_g,
        last_wet_weight_g: r.last_wet_weight_g,
    });
    Ok(DerivationContext {
        last_watering_added,
        previous,
    })
}

/// Resolve effective baselines and water amount for `input` against `ctx`.
pub fn derive_weights(input: &MeasurementInput, ctx: &DerivationContext) -> DerivedWeights {
    let prev = ctx.previous.unwrap_or_default();
    let lwa = ctx.last_watering_added;
    let weight = input.measured_weight_g;

    // Dry: explicit › previous weight › own weight (first weighing seeds itself) › previous dry
    let dry = input
        .last_dry_weight_g
        .or(prev.measured_weight_g)
        .or(weight)
        .or(prev.last_dry_weight_g);

    // Wet: explicit › synthesized from dry when nothing carried over › previous wet
    let mut wet = match input.last_wet_weight_g {
        Some(w) => Some(w),
        None => match (prev.last_wet_weight_g, dry) {
            (None, Some(d)) => Some(d.saturating_add(lwa)),
            (carried, _) => carried,
        },
    };

    let explicit_wet = input.last_wet_weight_g.filter(|w| *w > 0);
    let explicit_added = input.water_added_g.filter(|a| *a > 0);

    let water_added = if weight.is_some() {
        // A weighing (or repot) never changes the water on record
        lwa
    } else if let (Some(_), Some(d)) = (explicit_wet, dry) {
        wet.unwrap_or(0).saturating_sub(d)
    } else if let (Some(a), Some(d)) = (explicit_added, dry.filter(|d| *d > 0)) {
        if input.last_wet_weight_g.is_none() {
            wet = Some(a.saturating_add(d));
        }
        a
    } else if let Some(a) = explicit_added {
        a
    } else {
        wet.unwrap_or(0).saturating_sub(dry.unwrap_or(0))
    };

    let derived = DerivedWeights {
        last_dry_weight_g: dry,
        last_wet_weight_g: wet,
        water_added_g: water_added.max(0),
        prev_measured_weight: prev.measured_weight_g,
        last_watering_added: lwa,
    };
    debug!(
        dry = ?derived.last_dry_weight_g,
        wet = ?derived.last_wet_weight_g,
        water_added = derived.water_added_g,
        last_watering_added = lwa,
        "derived baselines"
    );
    derived
}
