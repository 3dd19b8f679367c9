//! Test and helper mocks for soil_core

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use soil_traits::{
    AsOf, EventFilter, HistoryResult, MeasurementHistory, MeasurementId, MeasurementRow, PlantId,
    ScanRange,
};

/// Vec-backed history; rows may be pushed in any order.
#[derive(Debug, Default, Clone)]
pub struct InMemoryHistory {
    rows: Vec<MeasurementRow>,
}

impl InMemoryHistory {
    pub fn from_rows(rows: Vec<MeasurementRow>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: MeasurementRow) {
        self.rows.push(row);
    }

    /// Replace the row with the same id (or append it).
    pub fn upsert(&mut self, row: MeasurementRow) {
        match self.rows.iter_mut().find(|r| r.id == row.id) {
            Some(slot) => *slot = row,
            None => self.rows.push(row),
        }
    }

    pub fn remove(&mut self, id: &MeasurementId) -> Option<MeasurementRow> {
        let pos = self.rows.iter().position(|r| &r.id == id)?;
        Some(self.rows.remove(pos))
    }

    pub fn rows(&self) -> &[MeasurementRow] {
        &self.rows
    }

    fn sorted(
        &self,
        plant: &PlantId,
        keep: impl Fn(&MeasurementRow) -> bool,
    ) -> Vec<&MeasurementRow> {
        let mut out: Vec<_> = self
            .rows
            .iter()
            .filter(|r| &r.plant_id == plant && keep(r))
            .collect();
        out.sort_by_key(|r| r.measured_at);
        out
    }
}

impl MeasurementHistory for InMemoryHistory {
    fn get(&self, id: &MeasurementId) -> HistoryResult<Option<MeasurementRow>> {
        Ok(self.rows.iter().find(|r| &r.id == id).cloned())
    }

    fn latest(
        &self,
        plant: &PlantId,
        filter: EventFilter,
        as_of: Option<&AsOf>,
    ) -> HistoryResult<Option<MeasurementRow>> {
        let rows = self.sorted(plant, |r| {
            filter.matches(r) && as_of.is_none_or(|c| c.sees(r))
        });
        Ok(rows.last().map(|r| (*r).clone()))
    }

    fn previous(&self, plant: &PlantId, cursor: &AsOf) -> HistoryResult<Option<MeasurementRow>> {
        let rows = self.sorted(plant, |r| cursor.precedes(r));
        Ok(rows.last().map(|r| (*r).clone()))
    }

    fn scan(
        &self,
        plant: &PlantId,
        filter: EventFilter,
        range: &ScanRange,
    ) -> HistoryResult<Vec<MeasurementRow>> {
        Ok(self
            .sorted(plant, |r| filter.matches(r) && range.contains(r))
            .into_iter()
            .cloned()
            .collect())
    }
}

/// History whose every call fails; for error-path tests.
pub struct BrokenHistory;

impl MeasurementHistory for BrokenHistory {
    fn get(&self, _id: &MeasurementId) -> HistoryResult<Option<MeasurementRow>> {
        Err(Box::new(std::io::Error::other("broken history")))
    }

    fn latest(
        &self,
        _plant: &PlantId,
        _filter: EventFilter,
        _as_of: Option<&AsOf>,
    ) -> HistoryResult<Option<MeasurementRow>> {
        Err(Box::new(std::io::Error::other("broken history")))
    }

    fn previous(&self, _plant: &PlantId, _cursor: &AsOf) -> HistoryResult<Option<MeasurementRow>> {
        Err(Box::new(std::io::Error::other("broken history")))
    }

    fn scan(
        &self,
        _plant: &PlantId,
        _filter: EventFilter,
        _range: &ScanRange,
    ) -> HistoryResult<Vec<MeasurementRow>> {
        Err(Box::new(std::io::Error::other("broken history")))
    }
}

/// Terse construction of stored rows for tests and benches.
///
/// `RowBuilder::new(n)` gives id `[n; 16]` on plant `[1; 16]`, measured `n` days
/// after 2025-01-01 08:00.
#[derive(Debug, Clone)]
pub struct RowBuilder {
    row: MeasurementRow,
}

impl RowBuilder {
    pub fn epoch() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .unwrap_or_default()
    }

    pub fn plant() -> PlantId {
        PlantId::from_bytes([1; 16])
    }

    pub fn id(n: u8) -> MeasurementId {
        MeasurementId::from_bytes([n; 16])
    }

    pub fn new(n: u8) -> Self {
        Self {
            row: MeasurementRow {
                id: Self::id(n),
                plant_id: Self::plant(),
                measured_at: Self::epoch() + TimeDelta::days(i64::from(n)),
                measured_weight_g: None,
                last_dry_weight_g: None,
                last_wet_weight_g: None,
                water_added_g: None,
                water_loss_total_pct: None,
                water_loss_total_g: None,
                water_loss_day_pct: None,
                water_loss_day_g: None,
                method_id: None,
                use_last_method: false,
                scale_id: None,
                note: None,
            },
        }
    }

    pub fn at(mut self, at: NaiveDateTime) -> Self {
        self.row.measured_at = at;
        self
    }

    pub fn hours(mut self, h: i64) -> Self {
        self.row.measured_at = Self::epoch() + TimeDelta::hours(h);
        self
    }

    pub fn weight(mut self, g: i64) -> Self {
        self.row.measured_weight_g = Some(g);
        self
    }

    pub fn dry(mut self, g: i64) -> Self {
        self.row.last_dry_weight_g = Some(g);
        self
    }

    pub fn wet(mut self, g: i64) -> Self {
        self.row.last_wet_weight_g = Some(g);
        self
    }

    pub fn added(mut self, g: i64) -> Self {
        self.row.water_added_g = Some(g);
        self
    }

    pub fn day_g(mut self, g: i64) -> Self {
        self.row.water_loss_day_g = Some(g);
        self
    }

    pub fn total_pct(mut self, pct: f64) -> Self {
        self.row.water_loss_total_pct = Some(pct);
        self
    }

    pub fn total_g(mut self, g: i64) -> Self {
        self.row.water_loss_total_g = Some(g);
        self
    }

    /// Strict watering shape: no weight, baselines present, `total_pct = 0`.
    pub fn watering(self, dry: i64, wet: i64, added: i64) -> Self {
        self.dry(dry).wet(wet).added(added).total_pct(0.0)
    }

    /// Repotting shape: weight, dry and added present, wet and losses absent.
    pub fn repotting(self, weight: i64, dry: i64, added: i64) -> Self {
        self.weight(weight).dry(dry).added(added)
    }

    pub fn build(self) -> MeasurementRow {
        self.row
    }
}
