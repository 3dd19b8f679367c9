use soil_traits::HistoryError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("history unavailable: {0}")]
    History(String),
    #[error("transaction failed")]
    Transaction,
    #[error("correction batch failed; no rows were changed")]
    Correction,
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Lift a history backend failure into the engine taxonomy.
pub fn history(e: HistoryError) -> eyre::Report {
    eyre::Report::new(EngineError::History(e.to_string()))
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
