//! Library error type

use crate::validation::ValidationError;

/// Errors returned by the StudySync library
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Storage(#[source] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("You are already a member of this group ({group_id})")]
    AlreadyMember { group_id: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error(
        "Streak record for {user_id} was modified concurrently (expected version {expected}, found {found})"
    )]
    Conflict {
        user_id: String,
        expected: u64,
        found: u64,
    },
}

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, Error>;

/// Row mappers report bad stored values as a `ValidationError` wrapped in a
/// conversion failure; unwrap those back into [`Error::Validation`].
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::FromSqlConversionFailure(idx, ty, source) => {
                match source.downcast::<ValidationError>() {
                    Ok(invalid) => Self::Validation(*invalid),
                    Err(source) => {
                        Self::Storage(rusqlite::Error::FromSqlConversionFailure(idx, ty, source))
                    }
                }
            }
            other => Self::Storage(other),
        }
    }
}
