pub mod clock;
pub mod history;
pub mod ids;

pub use clock::{Clock, FixedClock, SystemClock};
pub use history::{
    AsOf, EventFilter, HistoryError, HistoryResult, MeasurementHistory, MeasurementRow, ScanRange,
};
pub use ids::{IdParseError, MeasurementId, PlantId};
