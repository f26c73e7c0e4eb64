//! Error types for the domain services.

use travelhi_types::InputError;

/// A storage backend failed.
///
/// Backends convert their native errors into this type so services stay
/// independent of the database driver.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not complete the operation.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A stored row could not be converted into a domain type.
    #[error("invalid stored row: {0}")]
    InvalidRow(String),
}

/// Errors returned by the domain services.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The caller supplied invalid input. Nothing was written.
    #[error(transparent)]
    Input(#[from] InputError),

    /// The requested entity does not exist.
    #[error("{kind} with id={id} not found")]
    NotFound {
        /// Entity kind (`report`, `event`).
        kind: &'static str,
        /// The requested identifier.
        id: i64,
    },

    /// The storage backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
