//! Objects related to reporting errors from this library

/// A list of error types that can occur within this library
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("invalid report: '{field}' must be at most {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("The requested resource could not be found")]
    NotFound,

    #[error("Unexpected response from server: HTTP {status}")]
    Http { status: u16 },

    #[error("Invalid server url '{0}'")]
    InvalidUrl(String),

    #[error("Failed to submit report")]
    Submission(#[source] Box<Error>),

    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the backend reported that the resource doesn't exist. Requests that fail this way
    /// are not failures from the sync loop's point of view.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// A convenience type alias for a [Result] with [Error] as its error type
pub type Result<T, E = Error> = std::result::Result<T, E>;
