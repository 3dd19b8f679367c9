//! Water-retention normalizer: current weight as a 0–100 % share of the
//! plant's available water capacity.

/// Percent of available water still held, clamped to `[0, 100]`.
///
/// - Right after a watering (`weight` absent, `total_pct == 0`) the wet baseline
///   stands in for the weight.
/// - When the latest real fill (`last_wet`) undershoots the historical capacity,
///   the capacity shrinks to it.
/// - `None` when bounds or weights are missing, or capacity is not positive.
pub fn water_retained_pct(
    min_dry: Option<i64>,
    max_water: Option<i64>,
    weight: Option<i64>,
    last_wet: Option<i64>,
    total_pct: Option<f64>,
) -> Option<f64> {
    let min_dry = min_dry?;
    let weight = match weight {
        None if total_pct == Some(0.0) => last_wet,
        w => w,
    };
    let current = weight.or(last_wet)?;
    let remaining = current.checked_sub(min_dry)?;

    if weight == Some(min_dry) {
        let pct = 100.0 - total_pct.unwrap_or(0.0);
        return pct.is_finite().then(|| pct.clamp(0.0, 100.0));
    }

    let saturated = min_dry.checked_add(max_water?)?;
    let effective = match last_wet {
        Some(wet) if wet >= min_dry => saturated.min(wet),
        _ => saturated,
    };
    let available = effective - min_dry;
    if available <= 0 {
        return None;
    }
    let frac = (remaining as f64 / available as f64).clamp(0.0, 1.0);
    Some(frac * 100.0)
}
