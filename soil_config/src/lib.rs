#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and reading-import parsing for the soil-moisture tracker.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Reading CSV loader enforces exact headers and rejects rows that mix a
//!   weight with a positive water amount.
use serde::Deserialize;

/// Historical reading CSV schema.
///
/// Expected headers:
/// measured_at,measured_weight_g,water_added_g,note
///
/// Example:
/// measured_at,measured_weight_g,water_added_g,note
/// 2025-01-02T08:00:00,812,,
/// 2025-01-05T08:00,,240,soaked
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ReadingRow {
    pub measured_at: String,
    pub measured_weight_g: Option<i64>,
    pub water_added_g: Option<i64>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Database {
    /// SQLite file holding plants and measurements
    pub path: String,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            path: "soil.sqlite".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CareMode {
    Manual,
    #[default]
    Automatic,
    Vacation,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Care {
    /// "manual" | "automatic" | "vacation"; vacation silences weighing reminders
    pub mode: CareMode,
    /// A plant needs weighing once its last reading is older than this
    pub weighing_interval_hours: u32,
}

impl Default for Care {
    fn default() -> Self {
        Self {
            mode: CareMode::Automatic,
            weighing_interval_hours: 18,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CapMode {
    /// target = min_dry + max_water
    #[default]
    Capacity,
    /// target = min_dry + recommended_pct of max_water
    RetainedRatio,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Corrections {
    pub cap: CapMode,
    /// Also cap the stored wet weight, not only the water amount
    pub edit_last_wet: bool,
}

impl Default for Corrections {
    fn default() -> Self {
        Self {
            cap: CapMode::Capacity,
            edit_last_wet: true,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub care: Care,
    /// Defaults for the historical over-watering corrector
    #[serde(default)]
    pub corrections: Corrections,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_readings_csv(path: &std::path::Path) -> eyre::Result<Vec<ReadingRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open readings CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["measured_at", "measured_weight_g", "water_added_g", "note"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "readings CSV must have headers 'measured_at,measured_weight_g,water_added_g,note', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<ReadingRow>().enumerate() {
        let line = idx + 2;
        let row = match rec {
            Ok(row) => row,
            Err(e) => eyre::bail!("invalid CSV row {}: {}", line, e),
        };
        if row.measured_at.is_empty() {
            eyre::bail!("invalid CSV row {}: measured_at is empty", line);
        }
        match (row.measured_weight_g, row.water_added_g) {
            (Some(_), Some(w)) if w > 0 => {
                eyre::bail!(
                    "invalid CSV row {}: provide either measured_weight_g or water_added_g, not both",
                    line
                )
            }
            (None, None) => {
                eyre::bail!(
                    "invalid CSV row {}: one of measured_weight_g or water_added_g is required",
                    line
                )
            }
            (Some(g), _) | (None, Some(g)) if g < 0 => {
                eyre::bail!("invalid CSV row {}: grams must be >= 0", line)
            }
            _ => {}
        }
        rows.push(row);
    }

    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Database
        if self.database.path.trim().is_empty() {
            eyre::bail!("database.path must not be empty");
        }

        // Logging
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !matches!(rotation, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }
        if let Some(level) = self.logging.level.as_deref()
            && !matches!(level, "error" | "warn" | "info" | "debug" | "trace")
        {
            eyre::bail!("logging.level must be one of error|warn|info|debug|trace");
        }

        // Care
        if self.care.weighing_interval_hours == 0 {
            eyre::bail!("care.weighing_interval_hours must be >= 1");
        }
        if self.care.weighing_interval_hours > 24 * 60 {
            eyre::bail!("care.weighing_interval_hours is unreasonably large (>60 days)");
        }

        // Corrections: serde restricts cap to known modes

        Ok(())
    }
}
