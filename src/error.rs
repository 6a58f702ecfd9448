use thiserror::Error;

/// Convenience result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error type returned by every stage of the upload pipeline.
///
/// This is a single error enum shared by parsing, validation, storage, retention and
/// configuration, so callers can match one type and render a precise message.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The caller is not an authenticated principal.
    #[error("authentication required: log in to upload datasets")]
    AuthRequired,

    /// One or more required columns are absent. Lists every missing column.
    #[error("missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// A cell could not be coerced to a number.
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    RowType {
        row: u64,
        column: String,
        raw: String,
        message: String,
    },

    /// The uploaded bytes are not a well-formed table.
    #[error("malformed input: {message}")]
    Parse { message: String },

    /// The upload was refused before parsing (size ceiling, extension, name).
    #[error("upload rejected: {message}")]
    Rejected { message: String },

    /// Storage-layer failure during create/delete.
    #[error("persistence error: {message}")]
    Persistence { message: String },

    /// Invalid pipeline configuration.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// The dataset does not exist (or is not visible to the caller).
    #[error("dataset not found: {dataset_id}")]
    NotFound { dataset_id: String },

    /// Underlying I/O error (blob writes, log files).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable classification of a [`PipelineError`], independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AuthRequired,
    Schema,
    RowType,
    Parse,
    Rejected,
    Persistence,
    Config,
    NotFound,
    Io,
}

impl PipelineError {
    /// Returns the error kind tag.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthRequired => ErrorKind::AuthRequired,
            Self::Schema { .. } => ErrorKind::Schema,
            Self::RowType { .. } => ErrorKind::RowType,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Rejected { .. } => ErrorKind::Rejected,
            Self::Persistence { .. } => ErrorKind::Persistence,
            Self::Config { .. } => ErrorKind::Config,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub(crate) fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            match err.into_kind() {
                csv::ErrorKind::Io(io) => Self::Io(io),
                other => Self::Parse {
                    message: format!("{other:?}"),
                },
            }
        } else {
            Self::Parse {
                message: err.to_string(),
            }
        }
    }
}

#[cfg(feature = "excel")]
impl From<calamine::Error> for PipelineError {
    fn from(err: calamine::Error) -> Self {
        Self::Parse {
            message: format!("workbook: {err}"),
        }
    }
}
