use thiserror::Error;
use uuid::Uuid;

/// Failures reported by a [`crate::store::MaterialStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Service-level error taxonomy. Callers pattern-match on the variant
/// rather than inspecting messages.
#[derive(Debug, Error)]
pub enum MaterialError {
    /// A required call parameter was missing, empty, or the wrong shape.
    /// Raised before any store contact.
    #[error("Wrong parameter: {0}")]
    InvalidArgument(&'static str),

    /// No material matches the composite key (and, where it applies, the
    /// release-date visibility filter).
    #[error("Material {0} not found")]
    NotFound(Uuid),

    /// The store rejected a write on schema-level constraints. The store's
    /// message is carried verbatim.
    #[error("Material validation error: {0}")]
    Validation(String),

    /// Unclassified store failure, propagated unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MaterialError {
    /// Classify a store failure on a write path: constraint rejections are
    /// user-facing validation errors, everything else passes through.
    pub(crate) fn from_write(err: StoreError) -> Self {
        match err {
            StoreError::ConstraintViolation(message) => MaterialError::Validation(message),
            other => MaterialError::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, MaterialError>;
