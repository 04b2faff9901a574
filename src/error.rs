
use thiserror::Error;

/// The specific rule a versification definition line broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineErrorKind {
    MissingName,
    InvalidSyntax,
    DuplicateExcludedVerse,
    UnspecifiedSegmentLocation,
    NoSegmentsDefined,
    DuplicateSegment,
    InvalidManyToOneMap,
}

#[derive(Error, Debug)]
pub enum CanonryError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Invalid versification line ({kind:?}): {line}")]
    InvalidLine {
        kind: LineErrorKind,
        line: String,
        file: Option<String>,
    },
    #[error("Invalid reference: {0}")]
    InvalidReference(String),
    #[error("Invalid book set: {0}")]
    InvalidBookSet(String),
    #[error("Scheme error: {0}")]
    Scheme(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

impl CanonryError {
    pub fn invalid_line(kind: LineErrorKind, line: &str, file: Option<&str>) -> Self {
        Self::InvalidLine {
            kind,
            line: line.to_owned(),
            file: file.map(str::to_owned),
        }
    }

    /// The line-error kind, when this error came from the versification parser.
    pub fn line_error_kind(&self) -> Option<LineErrorKind> {
        match self {
            Self::InvalidLine { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CanonryError>;
