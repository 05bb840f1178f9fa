//! Helpers for folding backend errors into [`Error`].

use super::{Error, StorageError};

/// Maps any displayable backend error into [`StorageError::Database`], logging the
/// root cause so callers only ever see a generic failure.
pub trait DatabaseResultExt<T> {
    fn map_db_err(self) -> Result<T, Error>;

    fn map_db_err_with_context(self, context: &str) -> Result<T, Error>;
}

impl<T, E> DatabaseResultExt<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn map_db_err(self) -> Result<T, Error> {
        self.map_err(|e| {
            tracing::error!(error = %e, "Database operation failed");
            Error::Storage(StorageError::Database(e.to_string()))
        })
    }

    fn map_db_err_with_context(self, context: &str) -> Result<T, Error> {
        self.map_err(|e| {
            tracing::error!(error = %e, context, "Database operation failed");
            Error::Storage(StorageError::Database(format!("{context}: {e}")))
        })
    }
}
