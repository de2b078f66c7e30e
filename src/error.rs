use thiserror::Error;

/// Opaque backend failure (connectivity, serialization, driver errors).
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by repository implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Uniqueness violation (role name, username, email).
    #[error("conflict: {0}")]
    Conflict(String),
    /// Any other backend failure, passed through unchanged.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors returned by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Store error wrapper.
    #[error("store error: {0}")]
    Store(#[source] BackendError),
    /// A lookup by id or name found no record.
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },
    /// Violated uniqueness constraint.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Invalid identifier input.
    #[error("invalid id: {0}")]
    InvalidId(String),
    /// Malformed resource pattern.
    #[error("invalid resource pattern: {0}")]
    InvalidPattern(String),
    /// Unknown action token.
    #[error("invalid action: {0}")]
    InvalidAction(String),
}

impl From<StoreError> for Error {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict(what) => Self::Conflict(what),
            StoreError::Backend(source) => Self::Store(source),
        }
    }
}

impl Error {
    pub(crate) fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }
}
