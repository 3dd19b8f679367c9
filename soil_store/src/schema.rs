use rusqlite::Connection;

/// Create tables and indexes if missing; idempotent.
pub fn bootstrap_schema(connection: &Connection) -> rusqlite::Result<()> {
    connection.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS plants (
          id BLOB PRIMARY KEY,
          name TEXT NOT NULL,
          recommended_water_threshold_pct REAL,
          min_dry_weight_g INTEGER,
          max_water_weight_g INTEGER,
          archived INTEGER NOT NULL DEFAULT 0,
          created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS plants_measurements (
          id BLOB PRIMARY KEY,
          plant_id BLOB NOT NULL REFERENCES plants(id) ON DELETE CASCADE,
          measured_at TEXT NOT NULL,
          measured_weight_g INTEGER,
          last_dry_weight_g INTEGER,
          last_wet_weight_g INTEGER,
          water_added_g INTEGER CHECK (water_added_g IS NULL OR water_added_g >= 0),
          water_loss_total_pct REAL,
          water_loss_total_g INTEGER,
          water_loss_day_pct REAL,
          water_loss_day_g INTEGER,
          method_id TEXT,
          use_last_method INTEGER NOT NULL DEFAULT 0,
          scale_id TEXT,
          note TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_measurements_plant_time
          ON plants_measurements(plant_id, measured_at);
        ",
    )
}
