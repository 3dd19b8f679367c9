#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cli;
mod commands;
mod error_fmt;

use clap::Parser;
use cli::{Cli, FILE_GUARD, JSON_MODE};
use commands::Ctx;
use error_fmt::{exit_code_for_error, format_error_json, humanize};
use eyre::WrapErr;
use soil_config::Config;
use soil_core::EngineError;
use soil_store::Store;
use soil_traits::SystemClock;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_CONFIG: &str = "soil.toml";

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

/// Read and validate the config; an explicit path must exist, the default may not.
fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG), false),
    };
    if !required && !path.exists() {
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(&path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = soil_config::load_toml(&text)
        .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
    cfg.validate()
        .map_err(|e| EngineError::Config(e.to_string()))?;
    Ok(cfg)
}

fn init_tracing(json: bool, level: &str, logging: &soil_config::Logging) -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    // Console goes to stderr so stdout stays machine-readable
    let (pretty, json_layer) = if json {
        (
            None,
            Some(fmt::layer().json().with_writer(std::io::stderr).with_target(true)),
        )
    } else {
        (
            Some(fmt::layer().with_writer(std::io::stderr).with_target(false)),
            None,
        )
    };

    let file_layer = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)
                .wrap_err_with(|| format!("create log directory {}", dir.display()))?;
            let prefix = path
                .file_name()
                .map_or_else(|| "soil.log".into(), |n| n.to_string_lossy().into_owned());
            let rotation = match logging.rotation.as_deref() {
                Some("daily") => Rotation::DAILY,
                Some("hourly") => Rotation::HOURLY,
                _ => Rotation::NEVER,
            };
            let appender = RollingFileAppender::new(rotation, dir, prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_writer(writer).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json_layer)
        .with(file_layer)
        .try_init()?;
    Ok(())
}

fn run(cli: Cli) -> eyre::Result<()> {
    color_eyre::install()?;
    let cfg = load_config(cli.config.as_deref())?;

    let level = cli
        .log_level
        .clone()
        .or_else(|| cfg.logging.level.clone())
        .unwrap_or_else(|| "warn".to_string());
    init_tracing(cli.json, &level, &cfg.logging)?;

    let db = cli
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from(&cfg.database.path));
    let store = Store::open(&db).wrap_err_with(|| format!("open database {}", db.display()))?;
    tracing::debug!(db = %db.display(), "database ready");

    let clock = SystemClock::new();
    let mut ctx = Ctx {
        store,
        clock: &clock,
        care: (&cfg.care).into(),
        corrections: (&cfg.corrections).into(),
        json: cli.json,
    };
    commands::run(&mut ctx, cli.cmd)
}
