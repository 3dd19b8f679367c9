#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! SQLite persistence for plants and measurements.
//!
//! `SqliteHistory` answers the engine's history queries; `Store` wraps every
//! write path in a single transaction.

pub mod error;
pub mod history;
pub mod schema;
pub mod store;

pub use error::StoreError;
pub use history::SqliteHistory;
pub use schema::bootstrap_schema;
pub use store::{MeasurementPatch, Store};
