//! Command handlers: resolve arguments, call the store, print results.

use crate::cli::{CapArg, Commands, PlantCmd};
use chrono::NaiveDateTime;
use serde::Serialize;
use soil_config::ReadingRow;
use soil_core::calibration::UnderwateringItem;
use soil_core::correction::{self, CorrectionWindow};
use soil_core::repotting::RepotInput;
use soil_core::time::{normalize_measured_at, with_slot};
use soil_core::{
    CapMode, CareCfg, CareSummary, CorrectionCfg, CorrectionResult, EngineError, MeasurementInput,
    Plant, Result,
};
use soil_store::{MeasurementPatch, Store};
use soil_traits::{Clock, MeasurementId, MeasurementRow};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Everything a handler needs besides its own arguments.
pub struct Ctx<'a> {
    pub store: Store,
    pub clock: &'a dyn Clock,
    pub care: CareCfg,
    pub corrections: CorrectionCfg,
    pub json: bool,
}

impl Ctx<'_> {
    fn at(&self, raw: Option<&str>) -> Result<NaiveDateTime> {
        match raw {
            Some(raw) => normalize_measured_at(raw, 0),
            None => Ok(with_slot(self.clock.now(), 0)),
        }
    }

    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }
}

fn parse_measurement_id(raw: &str) -> Result<MeasurementId> {
    raw.parse()
        .map_err(|e| EngineError::validation(format!("measurement id {raw:?}: {e}")).into())
}

fn grams(g: Option<i64>) -> String {
    g.map_or_else(|| "-".to_string(), |g| format!("{g} g"))
}

fn pct(p: Option<f64>) -> String {
    p.map_or_else(|| "-".to_string(), |p| format!("{p:.2} %"))
}

fn describe_row(r: &MeasurementRow) -> String {
    let kind = soil_core::MeasurementKind::of(r);
    format!(
        "{id}  {at}  {kind:?}  weight={w}  dry={d}  wet={wet}  water={a}  day_loss={dl} ({dp})  total_loss={tl} ({tp})",
        id = r.id,
        at = r.measured_at.format("%Y-%m-%d %H:%M:%S"),
        w = grams(r.measured_weight_g),
        d = grams(r.last_dry_weight_g),
        wet = grams(r.last_wet_weight_g),
        a = grams(r.water_added_g),
        dl = grams(r.water_loss_day_g),
        dp = pct(r.water_loss_day_pct),
        tl = grams(r.water_loss_total_g),
        tp = pct(r.water_loss_total_pct),
    )
}

fn describe_plant(p: &Plant) -> String {
    format!(
        "{id}  {name}  threshold={t}  min_dry={d}  max_water={w}{archived}",
        id = p.id,
        name = p.name,
        t = pct(p.recommended_water_threshold_pct),
        d = grams(p.bounds.min_dry_weight_g),
        w = grams(p.bounds.max_water_weight_g),
        archived = if p.archived { "  (archived)" } else { "" },
    )
}

fn describe_summary(s: &CareSummary) -> String {
    let mut line = format!(
        "{name}: retained={r}  last={last}",
        name = s.name,
        r = s
            .water_retained_pct
            .map_or_else(|| "-".to_string(), |p| format!("{p:.0} %")),
        last = s
            .latest_at
            .map_or_else(|| "never".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string()),
    );
    if let Some(days) = s.frequency_days {
        line.push_str(&format!("  every {days} d"));
    }
    if let Some(next) = s.next_watering_at {
        line.push_str(&format!("  next water {}", next.format("%Y-%m-%d")));
    }
    if s.below_threshold {
        line.push_str("  [water now]");
    }
    if s.needs_weighing {
        line.push_str("  [weigh]");
    }
    line
}

fn describe_corrections(r: &CorrectionResult, applied: bool) -> String {
    let Some(target) = r.target_weight_g else {
        return "Calibration incomplete; nothing to correct.".to_string();
    };
    let mut out = format!(
        "{verb} {n} watering(s) capped at {target} g, {excess} g excess removed",
        verb = if applied { "Corrected" } else { "Would correct" },
        n = r.updated,
        excess = r.total_excess_g,
    );
    for c in &r.rows {
        out.push_str(&format!(
            "\n  {id}  {at}  water {old} -> {new} g  wet {wet} -> {new_wet} g",
            id = c.id,
            at = c.measured_at.format("%Y-%m-%d %H:%M:%S"),
            old = c.water_added_g.unwrap_or(0),
            new = c.new_water_added_g,
            wet = c.last_wet_weight_g,
            new_wet = c.new_last_wet_weight_g,
        ));
    }
    out
}

fn describe_underwatering(items: &[UnderwateringItem]) -> String {
    if items.is_empty() {
        return "No under-watering found.".to_string();
    }
    items
        .iter()
        .map(|i| {
            format!(
                "{at}  water {a} g  wet {wet}  target {t} g  short {u} ({p})",
                at = i.measured_at.format("%Y-%m-%d %H:%M:%S"),
                a = i.water_added_g.unwrap_or(0),
                wet = grams(i.last_wet_weight_g),
                t = i.target_weight_g,
                u = grams(i.under_g),
                p = pct(i.under_pct),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turn one CSV reading into engine input at its tiebreak slot.
fn reading_input(row: &ReadingRow, slot: i64) -> Result<MeasurementInput> {
    let measured_at = normalize_measured_at(&row.measured_at, slot)?;
    Ok(MeasurementInput {
        measured_at,
        measured_weight_g: row.measured_weight_g,
        water_added_g: row.water_added_g,
        ..MeasurementInput::default()
    }
    .with_note(row.note.clone()))
}

fn at_line(line: usize, e: eyre::Report) -> eyre::Report {
    match e.downcast_ref::<EngineError>() {
        Some(EngineError::Validation(msg)) => {
            EngineError::validation(format!("line {line}: {msg}")).into()
        }
        _ => e,
    }
}

fn import(ctx: &mut Ctx<'_>, plant: &str, file: &Path) -> Result<()> {
    let plant = ctx.store.find_plant(plant)?;
    let rows = soil_config::load_readings_csv(file)
        .map_err(|e| EngineError::validation(format!("{e:#}")))?;
    let mut slots: HashMap<NaiveDateTime, i64> = HashMap::new();
    let mut inputs = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        // header is line 1
        let line = i + 2;
        let base = normalize_measured_at(&row.measured_at, 0).map_err(|e| at_line(line, e))?;
        let slot = slots.entry(base).or_insert(0);
        let input = reading_input(row, *slot).map_err(|e| at_line(line, e))?;
        input.validate().map_err(|e| at_line(line, e))?;
        *slot += 1;
        inputs.push(input);
    }
    let imported = ctx.store.record_measurements(&plant.id, inputs)?;
    info!(plant = %plant.id, rows = imported.len(), "readings imported");
    ctx.emit(&imported, || {
        format!("Imported {} reading(s) for {}", imported.len(), plant.name)
    })
}

pub fn run(ctx: &mut Ctx<'_>, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Plant { cmd } => match cmd {
            PlantCmd::Add { name, threshold } => {
                let p = ctx.store.create_plant(&name, threshold, ctx.clock.now())?;
                ctx.emit(&p, || format!("Added {}", describe_plant(&p)))
            }
            PlantCmd::Archive { plant } => {
                let id = ctx.store.find_plant(&plant)?.id;
                let p = ctx.store.archive_plant(&id)?;
                ctx.emit(&p, || format!("Archived {}", p.name))
            }
            PlantCmd::List { all } => {
                let plants = ctx.store.list_plants(all)?;
                ctx.emit(&plants, || {
                    if plants.is_empty() {
                        "No plants yet.".to_string()
                    } else {
                        plants.iter().map(describe_plant).collect::<Vec<_>>().join("\n")
                    }
                })
            }
        },
        Commands::Weigh {
            plant,
            grams,
            at,
            note,
        } => {
            let p = ctx.store.find_plant(&plant)?;
            let input = MeasurementInput::weighing(ctx.at(at.as_deref())?, grams).with_note(note);
            let row = ctx.store.record_measurement(&p.id, input)?;
            ctx.emit(&row, || describe_row(&row))
        }
        Commands::Water {
            plant,
            grams,
            at,
            note,
        } => {
            let p = ctx.store.find_plant(&plant)?;
            let input = MeasurementInput::watering(ctx.at(at.as_deref())?, grams).with_note(note);
            let row = ctx.store.record_measurement(&p.id, input)?;
            ctx.emit(&row, || describe_row(&row))
        }
        Commands::Repot {
            plant,
            old_weight,
            new_weight,
            at,
            note,
        } => {
            let p = ctx.store.find_plant(&plant)?;
            let input = RepotInput {
                measured_at: ctx.at(at.as_deref())?,
                old_weight_g: old_weight,
                new_wet_weight_g: new_weight,
                note: note.filter(|n| !n.trim().is_empty()),
            };
            let rows = ctx.store.record_repotting(&p.id, input)?;
            ctx.emit(&rows, || rows.iter().map(describe_row).collect::<Vec<_>>().join("\n"))
        }
        Commands::Edit {
            id,
            at,
            weight,
            dry,
            wet,
            water,
            note,
        } => {
            let id = parse_measurement_id(&id)?;
            let patch = MeasurementPatch {
                measured_at: at.as_deref().map(|raw| normalize_measured_at(raw, 0)).transpose()?,
                measured_weight_g: weight,
                last_dry_weight_g: dry,
                last_wet_weight_g: wet,
                water_added_g: water,
                note,
            };
            let row = ctx.store.update_measurement(&id, patch)?;
            ctx.emit(&row, || describe_row(&row))
        }
        Commands::Delete { id } => {
            let id = parse_measurement_id(&id)?;
            ctx.store.delete_measurement(&id)?;
            ctx.emit(&serde_json::json!({ "deleted": id.to_string() }), || format!("Deleted {id}"))
        }
        Commands::History { plant, limit } => {
            let p = ctx.store.find_plant(&plant)?;
            let rows = ctx.store.recent(&p.id, limit)?;
            ctx.emit(&rows, || {
                if rows.is_empty() {
                    format!("No measurements for {}", p.name)
                } else {
                    rows.iter().map(describe_row).collect::<Vec<_>>().join("\n")
                }
            })
        }
        Commands::Status { plant } => {
            let summaries = match plant {
                Some(key) => {
                    let p = ctx.store.find_plant(&key)?;
                    vec![ctx.store.care_summary(&p.id, ctx.clock, &ctx.care)?]
                }
                None => ctx.store.care_summaries(ctx.clock, &ctx.care)?,
            };
            ctx.emit(&summaries, || {
                if summaries.is_empty() {
                    "No plants yet.".to_string()
                } else {
                    summaries.iter().map(describe_summary).collect::<Vec<_>>().join("\n")
                }
            })
        }
        Commands::Calibration { plant } => {
            let p = ctx.store.find_plant(&plant)?;
            let items = ctx.store.underwatering(&p.id)?;
            ctx.emit(&items, || describe_underwatering(&items))
        }
        Commands::Correct {
            plant,
            from,
            to,
            cap,
            keep_wet,
            dry_run,
        } => {
            let p = ctx.store.find_plant(&plant)?;
            let window = CorrectionWindow {
                from: from.as_deref().map(|raw| normalize_measured_at(raw, 0)).transpose()?,
                to: to.as_deref().map(|raw| normalize_measured_at(raw, 0)).transpose()?,
            };
            let mut cfg = ctx.corrections;
            if let Some(cap) = cap {
                cfg.cap = match cap {
                    CapArg::Capacity => CapMode::Capacity,
                    CapArg::RetainedRatio => CapMode::RetainedRatio,
                };
            }
            if keep_wet {
                cfg.edit_last_wet = false;
            }
            let result = if dry_run {
                correction::plan(
                    &ctx.store.history(),
                    &p.id,
                    &p.bounds,
                    p.recommended_water_threshold_pct,
                    &cfg,
                    window,
                )?
            } else {
                ctx.store.apply_corrections(&p.id, &cfg, window)?
            };
            ctx.emit(&result, || describe_corrections(&result, !dry_run))
        }
        Commands::Import { plant, file } => import(ctx, &plant, &file),
    }
}
