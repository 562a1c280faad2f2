// Decode errors shared by every format reader

use std::fmt;
use thiserror::Error;

/// Where in the source file a problem was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Absolute byte offset into a binary file.
    Byte(usize),
    /// 1-based line number in a text file.
    Line(usize),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Byte(offset) => write!(f, "byte {}", offset),
            Location::Line(line) => write!(f, "line {}", line),
        }
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed header at {location}: {reason}")]
    MalformedHeader { location: Location, reason: String },

    #[error("Truncated payload: header implies {expected} bytes, only {available} available")]
    TruncatedPayload { expected: usize, available: usize },

    #[error("Dimension mismatch in {what}: expected {expected}, found {actual}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Row length mismatch at line {line}: expected {expected} values, found {actual}")]
    RowLengthMismatch {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Missing required header field '{field}'")]
    MissingRequiredField { field: String },

    #[error("A sampling frequency is required to build the time axis")]
    SamplingFrequencyRequired,

    #[error("Invalid sampling frequency {0}: must be finite and positive")]
    InvalidSamplingFrequency(f64),

    #[error("Cannot delimit channel section at line {line}: {reason}")]
    UnknownChannelMarker { line: usize, reason: String },

    #[error("Invalid sample '{token}' at line {line}")]
    InvalidSample { line: usize, token: String },

    #[error("Invalid axis '{axis}': {reason}")]
    InvalidAxis { axis: String, reason: String },
}

impl DecodeError {
    pub(crate) fn malformed(location: Location, reason: impl Into<String>) -> Self {
        DecodeError::MalformedHeader {
            location,
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(field: impl Into<String>) -> Self {
        DecodeError::MissingRequiredField {
            field: field.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
