//! Transactional write paths and read views over SQLite.
//!
//! Every write runs derive → loss → persist → bounds inside one transaction.
//! Storage failures are logged with detail and surfaced as
//! `EngineError::Transaction`; the transaction is dropped, which rolls it back.

use crate::error::StoreError;
use crate::history::{COLUMNS, SqliteHistory, conversion, measurement_from_row};
use crate::schema::bootstrap_schema;
use chrono::NaiveDateTime;
use rand::RngCore;
use rand::rngs::OsRng;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use soil_core::calibration::{UnderwateringItem, underwatering_report};
use soil_core::correction::{self, CorrectionWindow};
use soil_core::repotting::{RepotInput, plan_repotting};
use soil_core::summary::care_summary;
use soil_core::time::{from_storage, to_storage};
use soil_core::{
    BoundCandidate, CareCfg, CareSummary, CorrectionCfg, CorrectionResult, EngineError,
    MeasurementInput, MeasurementKind, Plant, PlantBounds, Result, derive_measurement,
    recompute_bounds,
};
use soil_traits::{
    Clock, EventFilter, MeasurementHistory, MeasurementId, MeasurementRow, PlantId, ScanRange,
};
use std::path::Path;
use tracing::{debug, error, info};

/// Changes to an existing measurement. `None` keeps the stored value; stored
/// baselines are re-derived unless supplied. A blank note clears the stored one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementPatch {
    pub measured_at: Option<NaiveDateTime>,
    pub measured_weight_g: Option<i64>,
    pub last_dry_weight_g: Option<i64>,
    pub last_wet_weight_g: Option<i64>,
    pub water_added_g: Option<i64>,
    pub note: Option<String>,
}

/// Log storage detail, hand back a generic transaction failure.
fn storage_failure(op: &'static str, e: impl std::fmt::Display) -> eyre::Report {
    error!(op, error = %e, "storage step failed; rolling back");
    EngineError::Transaction.into()
}

/// History errors inside a write carry storage detail; keep it in the log only.
fn conceal(op: &'static str, e: eyre::Report) -> eyre::Report {
    match e.downcast_ref::<EngineError>() {
        Some(EngineError::History(detail)) => storage_failure(op, detail),
        _ => e,
    }
}

fn new_measurement_id() -> MeasurementId {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    MeasurementId::from_bytes(bytes)
}

fn new_plant_id() -> PlantId {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    PlantId::from_bytes(bytes)
}

fn plant_from_row(row: &Row<'_>) -> rusqlite::Result<Plant> {
    let id: Vec<u8> = row.get(0)?;
    let created: String = row.get(6)?;
    Ok(Plant {
        id: PlantId::try_from(id.as_slice()).map_err(|e| conversion(0, Type::Blob, e))?,
        name: row.get(1)?,
        recommended_water_threshold_pct: row.get(2)?,
        bounds: PlantBounds {
            min_dry_weight_g: row.get(3)?,
            max_water_weight_g: row.get(4)?,
        },
        archived: row.get(5)?,
        created_at: from_storage(&created).ok_or_else(|| {
            conversion(6, Type::Text, StoreError::Corrupt(format!("created_at {created:?}")))
        })?,
    })
}

const PLANT_COLUMNS: &str = "id, name, recommended_water_threshold_pct, min_dry_weight_g, \
     max_water_weight_g, archived, created_at";

fn insert_measurement(tx: &Transaction<'_>, row: &MeasurementRow) -> rusqlite::Result<usize> {
    tx.execute(
        "INSERT INTO plants_measurements (id, plant_id, measured_at, measured_weight_g, \
         last_dry_weight_g, last_wet_weight_g, water_added_g, water_loss_total_pct, \
         water_loss_total_g, water_loss_day_pct, water_loss_day_g, method_id, \
         use_last_method, scale_id, note) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            row.id.as_bytes().as_slice(),
            row.plant_id.as_bytes().as_slice(),
            to_storage(row.measured_at),
            row.measured_weight_g,
            row.last_dry_weight_g,
            row.last_wet_weight_g,
            row.water_added_g,
            row.water_loss_total_pct,
            row.water_loss_total_g,
            row.water_loss_day_pct,
            row.water_loss_day_g,
            row.method_id,
            row.use_last_method,
            row.scale_id,
            row.note,
        ],
    )
}

fn update_measurement_row(tx: &Transaction<'_>, row: &MeasurementRow) -> rusqlite::Result<usize> {
    tx.execute(
        "UPDATE plants_measurements SET measured_at = ?2, measured_weight_g = ?3, \
         last_dry_weight_g = ?4, last_wet_weight_g = ?5, water_added_g = ?6, \
         water_loss_total_pct = ?7, water_loss_total_g = ?8, water_loss_day_pct = ?9, \
         water_loss_day_g = ?10, note = ?11 WHERE id = ?1",
        params![
            row.id.as_bytes().as_slice(),
            to_storage(row.measured_at),
            row.measured_weight_g,
            row.last_dry_weight_g,
            row.last_wet_weight_g,
            row.water_added_g,
            row.water_loss_total_pct,
            row.water_loss_total_g,
            row.water_loss_day_pct,
            row.water_loss_day_g,
            row.note,
        ],
    )
}

/// Recompute and persist both bounds inside `tx`.
fn refresh_bounds(
    tx: &Transaction<'_>,
    plant: &PlantId,
    candidate: BoundCandidate,
) -> Result<PlantBounds> {
    let bounds = recompute_bounds(&SqliteHistory::new(tx), plant, candidate)?;
    tx.execute(
        "UPDATE plants SET min_dry_weight_g = ?2, max_water_weight_g = ?3 WHERE id = ?1",
        params![
            plant.as_bytes().as_slice(),
            bounds.min_dry_weight_g,
            bounds.max_water_weight_g
        ],
    )
    .map_err(|e| storage_failure("refresh_bounds", e))?;
    debug!(%plant, ?bounds, "bounds refreshed");
    Ok(bounds)
}

fn write_measurement(
    tx: &Transaction<'_>,
    plant: &PlantId,
    input: MeasurementInput,
) -> Result<MeasurementRow> {
    let derived = derive_measurement(&SqliteHistory::new(tx), plant, &input, None)?;
    let row = derived.into_row(new_measurement_id(), *plant, input);
    insert_measurement(tx, &row).map_err(|e| storage_failure("insert_measurement", e))?;
    refresh_bounds(
        tx,
        plant,
        BoundCandidate {
            weight_g: row.measured_weight_g,
            water_added_g: row.water_added_g,
        },
    )?;
    Ok(row)
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> std::result::Result<Self, StoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        bootstrap_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> std::result::Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        bootstrap_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Raw connection, for maintenance and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn history(&self) -> SqliteHistory<'_> {
        SqliteHistory::new(&self.conn)
    }

    fn in_tx<T>(&mut self, op: &'static str, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| storage_failure(op, e))?;
        let out = f(&tx).map_err(|e| conceal(op, e))?;
        tx.commit().map_err(|e| storage_failure(op, e))?;
        Ok(out)
    }

    // ── Plants ───────────────────────────────────────────────────────────────

    pub fn create_plant(
        &mut self,
        name: &str,
        recommended_water_threshold_pct: Option<f64>,
        created_at: NaiveDateTime,
    ) -> Result<Plant> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::validation("plant name must not be empty").into());
        }
        if let Some(pct) = recommended_water_threshold_pct
            && !(0.0..=100.0).contains(&pct)
        {
            return Err(EngineError::validation("threshold must be within 0..=100").into());
        }
        let plant = Plant {
            id: new_plant_id(),
            name: name.to_string(),
            recommended_water_threshold_pct,
            bounds: PlantBounds::default(),
            archived: false,
            created_at,
        };
        self.in_tx("create_plant", |tx| {
            tx.execute(
                "INSERT INTO plants (id, name, recommended_water_threshold_pct, archived, created_at) \
                 VALUES (?1, ?2, ?3, 0, ?4)",
                params![
                    plant.id.as_bytes().as_slice(),
                    plant.name,
                    plant.recommended_water_threshold_pct,
                    to_storage(plant.created_at)
                ],
            )
            .map_err(|e| storage_failure("create_plant", e))?;
            Ok(())
        })?;
        info!(plant = %plant.id, name = %plant.name, "plant created");
        Ok(plant)
    }

    /// Hide a plant from care summaries; its history is kept.
    pub fn archive_plant(&mut self, id: &PlantId) -> Result<Plant> {
        self.get_plant(id)?;
        self.in_tx("archive_plant", |tx| {
            tx.execute(
                "UPDATE plants SET archived = 1 WHERE id = ?1",
                params![id.as_bytes().as_slice()],
            )
            .map_err(|e| storage_failure("archive_plant", e))?;
            Ok(())
        })?;
        info!(plant = %id, "plant archived");
        self.get_plant(id)
    }

    pub fn list_plants(&self, include_archived: bool) -> Result<Vec<Plant>> {
        let sql = format!(
            "SELECT {PLANT_COLUMNS} FROM plants WHERE (?1 OR archived = 0) ORDER BY name, created_at"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(StoreError::from)?;
        let plants = stmt
            .query_map(params![include_archived], plant_from_row)
            .map_err(StoreError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)?;
        Ok(plants)
    }

    pub fn get_plant(&self, id: &PlantId) -> Result<Plant> {
        let sql = format!("SELECT {PLANT_COLUMNS} FROM plants WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id.as_bytes().as_slice()], plant_from_row)
            .optional()
            .map_err(StoreError::from)?
            .ok_or_else(|| EngineError::NotFound(format!("plant {id}")).into())
    }

    /// Resolve a plant by hex id or by exact name.
    pub fn find_plant(&self, key: &str) -> Result<Plant> {
        if let Ok(id) = key.parse::<PlantId>() {
            return self.get_plant(&id);
        }
        let sql = format!("SELECT {PLANT_COLUMNS} FROM plants WHERE name = ?1 ORDER BY created_at LIMIT 2");
        let mut stmt = self.conn.prepare(&sql).map_err(StoreError::from)?;
        let mut found = stmt
            .query_map(params![key.trim()], plant_from_row)
            .map_err(StoreError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)?;
        match found.len() {
            0 => Err(EngineError::NotFound(format!("plant {key:?}")).into()),
            1 => Ok(found.remove(0)),
            _ => Err(EngineError::validation(format!("plant name {key:?} is ambiguous; use the id")).into()),
        }
    }

    // ── Measurements ─────────────────────────────────────────────────────────

    pub fn get_measurement(&self, id: &MeasurementId) -> Result<MeasurementRow> {
        self.history()
            .get(id)
            .map_err(soil_core::error::history)?
            .ok_or_else(|| EngineError::NotFound(format!("measurement {id}")).into())
    }

    /// All rows of a plant, ascending.
    pub fn measurements(&self, plant: &PlantId) -> Result<Vec<MeasurementRow>> {
        self.history()
            .scan(plant, EventFilter::Any, &ScanRange::all())
            .map_err(soil_core::error::history)
    }

    pub fn last_measurement(&self, plant: &PlantId) -> Result<Option<MeasurementRow>> {
        self.history()
            .latest(plant, EventFilter::Any, None)
            .map_err(soil_core::error::history)
    }

    /// Create path: validate, derive, accumulate loss, insert, refresh bounds.
    pub fn record_measurement(&mut self, plant: &PlantId, input: MeasurementInput) -> Result<MeasurementRow> {
        self.get_plant(plant)?;
        let row = self.in_tx("record_measurement", |tx| write_measurement(tx, plant, input))?;
        info!(plant = %plant, id = %row.id, kind = ?MeasurementKind::of(&row), "measurement recorded");
        Ok(row)
    }

    /// Record `inputs` in order inside one transaction. Each row sees the ones
    /// before it; any failure leaves the plant untouched.
    pub fn record_measurements(
        &mut self,
        plant: &PlantId,
        inputs: Vec<MeasurementInput>,
    ) -> Result<Vec<MeasurementRow>> {
        self.get_plant(plant)?;
        let rows = self.in_tx("record_measurements", |tx| {
            inputs
                .into_iter()
                .map(|input| write_measurement(tx, plant, input))
                .collect::<Result<Vec<_>>>()
        })?;
        info!(plant = %plant, rows = rows.len(), "measurements recorded");
        Ok(rows)
    }

    /// Edit path: the row is excluded from its own neighbour lookups.
    pub fn update_measurement(&mut self, id: &MeasurementId, patch: MeasurementPatch) -> Result<MeasurementRow> {
        let current = self.get_measurement(id)?;
        if MeasurementKind::of(&current) == MeasurementKind::Repotting {
            return Err(EngineError::validation(
                "repotting rows cannot be edited; delete and repot again",
            )
            .into());
        }
        let weight = patch.measured_weight_g.or(current.measured_weight_g);
        let input = MeasurementInput {
            measured_at: patch.measured_at.unwrap_or(current.measured_at),
            measured_weight_g: weight,
            last_dry_weight_g: patch.last_dry_weight_g,
            last_wet_weight_g: patch.last_wet_weight_g,
            water_added_g: match weight {
                Some(_) => patch.water_added_g,
                None => patch.water_added_g.or(current.water_added_g),
            },
            method_id: current.method_id.clone(),
            use_last_method: current.use_last_method,
            scale_id: current.scale_id.clone(),
            note: match patch.note {
                Some(n) if n.trim().is_empty() => None,
                Some(n) => Some(n),
                None => current.note.clone(),
            },
        };
        let plant = current.plant_id;
        let row = self.in_tx("update_measurement", |tx| {
            let history = SqliteHistory::new(tx);
            let derived = derive_measurement(&history, &plant, &input, Some(*id))?;
            let row = derived.into_row(*id, plant, input);
            update_measurement_row(tx, &row).map_err(|e| storage_failure("update_measurement", e))?;
            refresh_bounds(
                tx,
                &plant,
                BoundCandidate {
                    weight_g: row.measured_weight_g,
                    water_added_g: row.water_added_g,
                },
            )?;
            Ok(row)
        })?;
        info!(plant = %plant, id = %row.id, "measurement updated");
        Ok(row)
    }

    pub fn delete_measurement(&mut self, id: &MeasurementId) -> Result<()> {
        let current = self.get_measurement(id)?;
        let plant = current.plant_id;
        self.in_tx("delete_measurement", |tx| {
            tx.execute(
                "DELETE FROM plants_measurements WHERE id = ?1",
                params![id.as_bytes().as_slice()],
            )
            .map_err(|e| storage_failure("delete_measurement", e))?;
            refresh_bounds(tx, &plant, BoundCandidate::default())?;
            Ok(())
        })?;
        info!(plant = %plant, id = %id, "measurement deleted");
        Ok(())
    }

    /// Three-row repotting sequence in one transaction.
    pub fn record_repotting(&mut self, plant: &PlantId, input: RepotInput) -> Result<[MeasurementRow; 3]> {
        self.get_plant(plant)?;
        let rows = self.in_tx("record_repotting", |tx| {
            let history = SqliteHistory::new(tx);
            let ids = [new_measurement_id(), new_measurement_id(), new_measurement_id()];
            let plan = plan_repotting(&history, plant, &input, ids)?;
            for row in &plan.rows {
                insert_measurement(tx, row).map_err(|e| storage_failure("insert_repotting", e))?;
            }
            refresh_bounds(tx, plant, plan.candidate)?;
            Ok(plan.rows)
        })?;
        info!(plant = %plant, new_dry = ?rows[2].last_dry_weight_g, "plant repotted");
        Ok(rows)
    }

    // ── Corrections ──────────────────────────────────────────────────────────

    /// Plan and apply the over-watering corrector as one batch.
    ///
    /// Plant bounds and other rows' loss figures are left as they are.
    pub fn apply_corrections(
        &mut self,
        plant: &PlantId,
        cfg: &CorrectionCfg,
        window: CorrectionWindow,
    ) -> Result<CorrectionResult> {
        let p = self.get_plant(plant)?;
        let tx = self.conn.transaction().map_err(|e| {
            error!(error = %e, "could not open correction batch");
            eyre::Report::new(EngineError::Correction)
        })?;
        let result = match correction::plan(
            &SqliteHistory::new(&tx),
            plant,
            &p.bounds,
            p.recommended_water_threshold_pct,
            cfg,
            window,
        ) {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "correction planning failed");
                return Err(EngineError::Correction.into());
            }
        };
        for c in &result.rows {
            let applied = tx.execute(
                "UPDATE plants_measurements SET water_added_g = ?2, last_wet_weight_g = ?3 WHERE id = ?1",
                params![c.id.as_bytes().as_slice(), c.new_water_added_g, c.new_last_wet_weight_g],
            );
            if let Err(e) = applied {
                error!(id = %c.id, error = %e, "correction row failed; rolling back batch");
                return Err(EngineError::Correction.into());
            }
        }
        tx.commit().map_err(|e| {
            error!(error = %e, "correction commit failed");
            eyre::Report::new(EngineError::Correction)
        })?;
        info!(
            plant = %plant,
            updated = result.updated,
            total_excess_g = result.total_excess_g,
            "corrections applied"
        );
        Ok(result)
    }

    // ── Read views ───────────────────────────────────────────────────────────

    pub fn care_summaries(&self, clock: &dyn Clock, care: &CareCfg) -> Result<Vec<CareSummary>> {
        let now = clock.now();
        let history = self.history();
        self.list_plants(false)?
            .iter()
            .map(|p| care_summary(&history, p, care, now))
            .collect()
    }

    pub fn care_summary(&self, plant: &PlantId, clock: &dyn Clock, care: &CareCfg) -> Result<CareSummary> {
        let p = self.get_plant(plant)?;
        care_summary(&self.history(), &p, care, clock.now())
    }

    pub fn underwatering(&self, plant: &PlantId) -> Result<Vec<UnderwateringItem>> {
        let p = self.get_plant(plant)?;
        underwatering_report(&self.history(), plant, &p.bounds)
    }

    /// Rows in a window for listing, newest first.
    pub fn recent(&self, plant: &PlantId, limit: usize) -> Result<Vec<MeasurementRow>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM plants_measurements WHERE plant_id = ?1 \
             ORDER BY measured_at DESC LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(StoreError::from)?;
        let rows = stmt
            .query_map(
                params![plant.as_bytes().as_slice(), i64::try_from(limit).unwrap_or(i64::MAX)],
                measurement_from_row,
            )
            .map_err(StoreError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)?;
        Ok(rows)
    }
}
