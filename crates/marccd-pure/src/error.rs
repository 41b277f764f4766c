//! Error types for MarCCD decoding, encoding, and file I/O.

use thiserror::Error;

/// A violation of the MarCCD on-disk format.
///
/// Every decode and encode routine reports these to its immediate caller;
/// nothing in the crate recovers from them heuristically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Fewer bytes remain than the fixed-size text header block.
    #[error("truncated text header: need {needed} bytes, {available} available")]
    TruncatedHeader { needed: usize, available: usize },

    /// Fewer bytes remain than the fixed-size binary metadata block.
    #[error("truncated metadata block: need {needed} bytes, {available} available")]
    TruncatedMetadata { needed: usize, available: usize },

    /// Fewer bytes remain than `width * height * bytes_per_pixel`.
    #[error("truncated pixel data: need {needed} bytes, {available} available")]
    TruncatedPixelData { needed: usize, available: usize },

    /// A text header token could not be split into a key and a value.
    #[error("malformed header field: {token:?}")]
    MalformedField { token: String },

    /// A cross-field invariant does not hold.
    #[error("inconsistent header ({invariant}): expected {expected}, found {actual}")]
    InconsistentHeader {
        invariant: &'static str,
        expected: String,
        actual: String,
    },

    /// A pixel bit depth outside of {8, 16, 32}.
    #[error("unsupported bit depth: {0}")]
    UnsupportedBitDepth(u32),

    /// Content does not fit into its fixed-size slot.
    #[error("{field} too large: {size} bytes exceeds capacity of {capacity}")]
    FieldTooLarge {
        field: String,
        size: usize,
        capacity: usize,
    },

    /// A required text header keyword is absent.
    #[error("missing required keyword: {0}")]
    MissingKeyword(&'static str),

    /// A field holds a value that cannot be interpreted.
    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: String, value: String },

    /// A metadata field name that is not part of the frame layout.
    #[error("unknown metadata field: {0}")]
    UnknownField(String),
}

impl FormatError {
    pub(crate) fn inconsistent(
        invariant: &'static str,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        FormatError::InconsistentHeader {
            invariant,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// All errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The bytes do not form a valid MarCCD image.
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    /// The underlying storage failed. Never retried by this crate.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the format error, if this is one.
    pub fn as_format(&self) -> Option<&FormatError> {
        match self {
            Error::Format(e) => Some(e),
            Error::Io(_) => None,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
