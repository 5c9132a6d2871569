use std::path::PathBuf;
use thiserror::Error;

/// A line that could not be parsed as JSON
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid JSON: {0}")]
    Simd(#[from] simd_json::Error),
}

/// The routing field could not be resolved on a record
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("missing field `{field}`")]
    Missing { field: String },

    #[error("`{field}` is not an object")]
    NotAnObject { field: String },

    #[error("`{field}` is {found}, expected a string, number or boolean")]
    NotStringRepresentable { field: String, found: &'static str },
}

/// Errors raised while splitting an ndjson file
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("could not open file: {}. File does not exist", .0.display())]
    InputNotFound(PathBuf),

    #[error("could not open file: {}. Not a file", .0.display())]
    InputNotRegularFile(PathBuf),

    #[error("line {line}: {source}")]
    Decode {
        line: u64,
        #[source]
        source: DecodeError,
    },

    #[error("line {line}: {source}")]
    Key {
        line: u64,
        #[source]
        source: KeyError,
    },

    #[error("routing key {key:?} is not a safe file name")]
    UnsafeKey { key: String },

    #[error("routing keys {key:?} and {existing:?} both map to {file_name}")]
    KeyCollision {
        key: String,
        existing: String,
        file_name: String,
    },

    #[error("key path must name at least one field")]
    EmptyKeyPath,

    #[error("partition engine has already run")]
    AlreadyRun,

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl SplitError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        SplitError::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether this error concerns a single record rather than the run as a whole.
    ///
    /// Only these errors are eligible for [`ErrorPolicy::Skip`](crate::ErrorPolicy::Skip).
    pub fn is_record_error(&self) -> bool {
        matches!(
            self,
            SplitError::Decode { .. }
                | SplitError::Key { .. }
                | SplitError::UnsafeKey { .. }
                | SplitError::KeyCollision { .. }
        )
    }
}
