//! `MeasurementHistory` over a SQLite connection (or an open transaction).

use crate::error::StoreError;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use soil_core::time::{from_storage, to_storage};
use soil_traits::{
    AsOf, EventFilter, HistoryResult, MeasurementHistory, MeasurementId, MeasurementRow, PlantId,
    ScanRange,
};
use std::ops::Bound;

pub(crate) const COLUMNS: &str = "id, plant_id, measured_at, measured_weight_g, last_dry_weight_g, \
     last_wet_weight_g, water_added_g, water_loss_total_pct, water_loss_total_g, \
     water_loss_day_pct, water_loss_day_g, method_id, use_last_method, scale_id, note";

// Sorts after every stored timestamp.
const END_OF_TIME: &str = "9999-12-31 23:59:59.999";

fn filter_sql(filter: EventFilter) -> &'static str {
    match filter {
        EventFilter::Any => "1 = 1",
        EventFilter::Repotting => {
            "measured_weight_g IS NOT NULL AND last_dry_weight_g IS NOT NULL \
             AND water_added_g IS NOT NULL AND last_wet_weight_g IS NULL \
             AND water_loss_total_pct IS NULL AND water_loss_total_g IS NULL \
             AND water_loss_day_pct IS NULL AND water_loss_day_g IS NULL"
        }
        EventFilter::Weighing => {
            "measured_weight_g IS NOT NULL AND NOT (last_dry_weight_g IS NOT NULL \
             AND water_added_g IS NOT NULL AND last_wet_weight_g IS NULL \
             AND water_loss_total_pct IS NULL AND water_loss_total_g IS NULL \
             AND water_loss_day_pct IS NULL AND water_loss_day_g IS NULL)"
        }
        EventFilter::WateringLoose => "measured_weight_g IS NULL AND water_loss_total_pct = 0",
        EventFilter::WateringStrict => {
            "measured_weight_g IS NULL AND water_loss_total_pct = 0 \
             AND water_loss_total_g IS NULL AND water_loss_day_pct IS NULL \
             AND water_loss_day_g IS NULL AND last_dry_weight_g IS NOT NULL \
             AND last_wet_weight_g IS NOT NULL AND water_added_g > 0"
        }
    }
}

pub(crate) fn conversion(idx: usize, ty: Type, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(e))
}

pub(crate) fn measurement_from_row(row: &Row<'_>) -> rusqlite::Result<MeasurementRow> {
    let id: Vec<u8> = row.get(0)?;
    let plant: Vec<u8> = row.get(1)?;
    let at: String = row.get(2)?;
    Ok(MeasurementRow {
        id: MeasurementId::try_from(id.as_slice()).map_err(|e| conversion(0, Type::Blob, e))?,
        plant_id: PlantId::try_from(plant.as_slice()).map_err(|e| conversion(1, Type::Blob, e))?,
        measured_at: from_storage(&at).ok_or_else(|| {
            conversion(2, Type::Text, StoreError::Corrupt(format!("measured_at {at:?}")))
        })?,
        measured_weight_g: row.get(3)?,
        last_dry_weight_g: row.get(4)?,
        last_wet_weight_g: row.get(5)?,
        water_added_g: row.get(6)?,
        water_loss_total_pct: row.get(7)?,
        water_loss_total_g: row.get(8)?,
        water_loss_day_pct: row.get(9)?,
        water_loss_day_g: row.get(10)?,
        method_id: row.get(11)?,
        use_last_method: row.get(12)?,
        scale_id: row.get(13)?,
        note: row.get(14)?,
    })
}

fn lower_bound(b: &Bound<chrono::NaiveDateTime>) -> (&'static str, String) {
    match b {
        Bound::Included(t) => (">=", to_storage(*t)),
        Bound::Excluded(t) => (">", to_storage(*t)),
        Bound::Unbounded => (">=", String::new()),
    }
}

fn upper_bound(b: &Bound<chrono::NaiveDateTime>) -> (&'static str, String) {
    match b {
        Bound::Included(t) => ("<=", to_storage(*t)),
        Bound::Excluded(t) => ("<", to_storage(*t)),
        Bound::Unbounded => ("<=", END_OF_TIME.to_string()),
    }
}

/// Read-side view used by the engine; borrows the connection so it works the
/// same inside and outside a transaction.
pub struct SqliteHistory<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteHistory<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl MeasurementHistory for SqliteHistory<'_> {
    fn get(&self, id: &MeasurementId) -> HistoryResult<Option<MeasurementRow>> {
        let sql = format!("SELECT {COLUMNS} FROM plants_measurements WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![id.as_bytes().as_slice()], measurement_from_row)
            .optional()
            .map_err(StoreError::from)?;
        Ok(row)
    }

    fn latest(
        &self,
        plant: &PlantId,
        filter: EventFilter,
        as_of: Option<&AsOf>,
    ) -> HistoryResult<Option<MeasurementRow>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM plants_measurements \
             WHERE plant_id = ?1 AND {} AND measured_at <= ?2 AND (?3 IS NULL OR id <> ?3) \
             ORDER BY measured_at DESC LIMIT 1",
            filter_sql(filter)
        );
        let upto = as_of.map_or_else(|| END_OF_TIME.to_string(), |c| to_storage(c.at));
        let exclude = as_of.and_then(|c| c.exclude).map(|id| id.as_bytes().to_vec());
        let row = self
            .conn
            .query_row(
                &sql,
                params![plant.as_bytes().as_slice(), upto, exclude],
                measurement_from_row,
            )
            .optional()
            .map_err(StoreError::from)?;
        Ok(row)
    }

    fn previous(&self, plant: &PlantId, cursor: &AsOf) -> HistoryResult<Option<MeasurementRow>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM plants_measurements \
             WHERE plant_id = ?1 AND measured_at < ?2 AND (?3 IS NULL OR id <> ?3) \
             ORDER BY measured_at DESC LIMIT 1"
        );
        let exclude = cursor.exclude.map(|id| id.as_bytes().to_vec());
        let row = self
            .conn
            .query_row(
                &sql,
                params![plant.as_bytes().as_slice(), to_storage(cursor.at), exclude],
                measurement_from_row,
            )
            .optional()
            .map_err(StoreError::from)?;
        Ok(row)
    }

    fn scan(
        &self,
        plant: &PlantId,
        filter: EventFilter,
        range: &ScanRange,
    ) -> HistoryResult<Vec<MeasurementRow>> {
        let (lo_op, lo) = lower_bound(&range.lower);
        let (hi_op, hi) = upper_bound(&range.upper);
        let sql = format!(
            "SELECT {COLUMNS} FROM plants_measurements \
             WHERE plant_id = ?1 AND {} AND measured_at {lo_op} ?2 AND measured_at {hi_op} ?3 \
             AND (?4 IS NULL OR id <> ?4) \
             ORDER BY measured_at ASC",
            filter_sql(filter)
        );
        let exclude = range.exclude.map(|id| id.as_bytes().to_vec());
        let mut stmt = self.conn.prepare(&sql).map_err(StoreError::from)?;
        let rows = stmt
            .query_map(
                params![plant.as_bytes().as_slice(), lo, hi, exclude],
                measurement_from_row,
            )
            .map_err(StoreError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)?;
        Ok(rows)
    }
}
