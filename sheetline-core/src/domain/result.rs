//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// Every port returns this error. Adapters convert their own failures
/// (DuckDB, lock poisoning) into `Database` at the boundary; parsing of
/// domain values fails with `Validation`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
