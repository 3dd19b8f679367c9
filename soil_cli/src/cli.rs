//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "soil", version, about = "Soil-moisture tracker")]
pub struct Cli {
    /// Path to config TOML (optional; defaults apply when absent)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides [database] path)
    #[arg(long, value_name = "FILE")]
    pub db: Option<PathBuf>,

    /// Print results and errors as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Cap used by `correct`; overrides `[corrections] cap`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CapArg {
    /// Cap wet weight at min dry + max water
    Capacity,
    /// Cap at min dry + the recommended share of max water
    RetainedRatio,
}

#[derive(Subcommand, Debug)]
pub enum PlantCmd {
    /// Register a new plant
    Add {
        name: String,
        /// Retention percent at or below which the plant wants water
        #[arg(long, value_name = "PCT")]
        threshold: Option<f64>,
    },
    /// Hide a plant from `status`; its history is kept
    Archive {
        /// Plant id or name
        plant: String,
    },
    /// List plants
    List {
        /// Include archived plants
        #[arg(long, action = ArgAction::SetTrue)]
        all: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage plants
    Plant {
        #[command(subcommand)]
        cmd: PlantCmd,
    },
    /// Record a weighing
    Weigh {
        /// Plant id or name
        plant: String,
        /// Measured pot weight in grams
        #[arg(allow_negative_numbers = true)]
        grams: i64,
        /// ISO-8601 time of the reading (default: now)
        #[arg(long, value_name = "TIME")]
        at: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Record a watering
    Water {
        /// Plant id or name
        plant: String,
        /// Grams of water added
        #[arg(allow_negative_numbers = true)]
        grams: i64,
        #[arg(long, value_name = "TIME")]
        at: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Record a repotting (weighing, closing watering and repot rows)
    Repot {
        plant: String,
        /// Weight of the old pot just before repotting
        #[arg(long, value_name = "GRAMS", allow_negative_numbers = true)]
        old_weight: i64,
        /// Wet weight of the new pot after watering in
        #[arg(long, value_name = "GRAMS", allow_negative_numbers = true)]
        new_weight: i64,
        #[arg(long, value_name = "TIME")]
        at: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Rewrite a stored measurement; baselines are re-derived unless given
    Edit {
        /// Measurement id
        id: String,
        #[arg(long, value_name = "TIME")]
        at: Option<String>,
        #[arg(long, value_name = "GRAMS")]
        weight: Option<i64>,
        #[arg(long, value_name = "GRAMS")]
        dry: Option<i64>,
        #[arg(long, value_name = "GRAMS")]
        wet: Option<i64>,
        #[arg(long, value_name = "GRAMS")]
        water: Option<i64>,
        /// New note; an empty value clears the stored one
        #[arg(long)]
        note: Option<String>,
    },
    /// Delete a stored measurement
    Delete {
        /// Measurement id
        id: String,
    },
    /// Show recent measurements, newest first
    History {
        plant: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Care summary for one plant or every active plant
    Status { plant: Option<String> },
    /// Waterings that did not reach the calibrated capacity
    Calibration { plant: String },
    /// Cap historical waterings that exceed the calibrated target
    Correct {
        plant: String,
        /// Window start (default: last repotting)
        #[arg(long, value_name = "TIME")]
        from: Option<String>,
        /// Window end, inclusive
        #[arg(long, value_name = "TIME")]
        to: Option<String>,
        #[arg(long, value_enum)]
        cap: Option<CapArg>,
        /// Only cap the water amount, keep stored wet weights
        #[arg(long, action = ArgAction::SetTrue)]
        keep_wet: bool,
        /// Print the plan without writing
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Import readings from CSV (measured_at,measured_weight_g,water_added_g,note)
    ///
    /// Every row is checked before anything is written; the file is stored
    /// in one transaction or not at all.
    Import {
        plant: String,
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}
