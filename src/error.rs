//! Pipeline error taxonomy.
//!
//! Every operation of the [`Pipeline`](crate::pipeline::Pipeline) returns a
//! [`PipelineError`] on failure. Callers branch on the variant (or on
//! [`PipelineError::code`]) rather than on message text; the HTTP layer maps
//! codes to status codes and the CLI prints the message.

use crate::models::Namespace;

/// Errors raised by the ingestion pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The filename's extension is not a recognized tabular format.
    #[error("unsupported file format: {filename} (expected one of: {expected})")]
    UnsupportedFormat { filename: String, expected: String },

    /// The filename cannot be used as a flat key in a namespace.
    #[error("invalid filename: {0:?}")]
    InvalidFilename(String),

    /// Every decode attempt failed.
    #[error("could not decode {filename}: {reason}")]
    Decode { filename: String, reason: String },

    /// The referenced artifact is absent from the expected namespace.
    #[error("{namespace} file not found: {filename}")]
    NotFound {
        namespace: Namespace,
        filename: String,
    },

    /// Writing the canonical serialization failed.
    #[error("failed to serialize cleaned table: {0}")]
    Encode(#[from] csv::Error),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::UnsupportedFormat { .. } => "unsupported_format",
            PipelineError::InvalidFilename(_) => "invalid_filename",
            PipelineError::Decode { .. } => "decode_error",
            PipelineError::NotFound { .. } => "not_found",
            PipelineError::Encode(_) | PipelineError::Io(_) => "internal",
        }
    }

    pub(crate) fn decode(filename: &str, reason: impl Into<String>) -> Self {
        PipelineError::Decode {
            filename: filename.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(namespace: Namespace, filename: &str) -> Self {
        PipelineError::NotFound {
            namespace,
            filename: filename.to_string(),
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let err = PipelineError::not_found(Namespace::Cleaned, "missing.csv");
        assert_eq!(err.code(), "not_found");
        assert_eq!(err.to_string(), "cleaned file not found: missing.csv");

        let err = PipelineError::decode("a.csv", "bad bytes");
        assert_eq!(err.code(), "decode_error");
        assert!(err.to_string().contains("bad bytes"));

        let err = PipelineError::InvalidFilename("../x.csv".into());
        assert_eq!(err.code(), "invalid_filename");
    }

    #[test]
    fn io_errors_are_internal() {
        let err: PipelineError = std::io::Error::other("disk gone").into();
        assert_eq!(err.code(), "internal");
    }
}
