use crate::layout::LayoutError;
use crate::parser::ParseError;
use crate::resolver::ResolveError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    SourceUnavailable,
    RecordNotFound,
    NotARecord,
    UnsupportedRecord,
    TypeResolution,
    ArrayLength,
    InvalidTypeTable,
    LayoutOverflow,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SourceUnavailable => "source-unavailable",
            ErrorKind::RecordNotFound => "record-not-found",
            ErrorKind::NotARecord => "not-a-record",
            ErrorKind::UnsupportedRecord => "unsupported-record",
            ErrorKind::TypeResolution => "type-resolution",
            ErrorKind::ArrayLength => "array-length",
            ErrorKind::InvalidTypeTable => "invalid-type-table",
            ErrorKind::LayoutOverflow => "layout-overflow",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every way an analysis run can fail. None of them leave a partial report
/// behind.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse source: {0}")]
    Parse(#[from] ParseError),

    #[error("no type declaration named `{0}`")]
    RecordNotFound(String),

    #[error("`{0}` is not a struct type")]
    NotARecord(String),

    #[error("`{0}` has type parameters, generic structs are not supported")]
    GenericRecord(String),

    #[error("field `{field}` of `{record}`: {source}")]
    FieldResolution {
        record: String,
        field: String,
        #[source]
        source: ResolveError,
    },

    #[error("type table entry `{entry}`: {reason}")]
    InvalidTypeTable { entry: String, reason: String },

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Io { .. } | AnalysisError::Parse(_) => ErrorKind::SourceUnavailable,
            AnalysisError::RecordNotFound(_) => ErrorKind::RecordNotFound,
            AnalysisError::NotARecord(_) => ErrorKind::NotARecord,
            AnalysisError::GenericRecord(_) => ErrorKind::UnsupportedRecord,
            AnalysisError::FieldResolution {
                source: ResolveError::ArrayLength(_),
                ..
            } => ErrorKind::ArrayLength,
            AnalysisError::FieldResolution { .. } => ErrorKind::TypeResolution,
            AnalysisError::InvalidTypeTable { .. } => ErrorKind::InvalidTypeTable,
            AnalysisError::Layout(_) => ErrorKind::LayoutOverflow,
        }
    }
}
