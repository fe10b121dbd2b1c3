use thiserror::Error;

/// Error taxonomy for the Store (§7).
///
/// `DuplicateIgnored` is the one variant callers are expected to match on;
/// everything else is a hard failure that aborts the current batch.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate row ignored")]
    DuplicateIgnored,

    #[error("no rows received for {0}")]
    EmptyBatch(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Classify a raw rusqlite error as returned by an INSERT.
    ///
    /// rusqlite surfaces unique-constraint violations as
    /// `ErrorCode::ConstraintViolation` with a message mentioning "UNIQUE
    /// constraint failed"; there's no stronger-typed variant to match on.
    pub fn classify(err: rusqlite::Error) -> StoreError {
        if let rusqlite::Error::SqliteFailure(ref sqlite_err, ref msg) = err {
            let is_unique = sqlite_err.code == rusqlite::ErrorCode::ConstraintViolation
                && msg
                    .as_deref()
                    .map(|m| m.to_ascii_uppercase().contains("UNIQUE"))
                    .unwrap_or(false);
            if is_unique {
                return StoreError::DuplicateIgnored;
            }
        }
        StoreError::Sqlite(err)
    }
}
