//! The Error and Result types shared by the tag model and both codecs.

use std::fmt;

/// An error raised by the tag model, a codec, or the document facade.
///
/// Every error carries an [`ErrorKind`] so callers can tell a broken API
/// contract from untrustworthy input from a plain I/O failure. Not-found
/// conditions (path queries, compound lookups) are not errors; they are
/// `Option`s.
#[derive(Debug, Clone)]
pub struct Error {
    msg: String,
    kind: ErrorKind,
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The caller broke an API contract: a named tag pushed into a list, a
    /// mismatched element type, a duplicate compound key, a state-machine
    /// transition out of order. These indicate a programming error and are
    /// never produced by bad input data.
    Usage,

    /// The input does not form a valid document: an unknown tag-type byte, a
    /// list element type outside the valid range, missing or unrecognized
    /// XML attributes, invalid UTF-8, or a string too long for the wire
    /// format.
    Malformed,

    /// The input ended part way through a fixed-size field.
    UnexpectedEof,

    /// An underlying I/O failure, distinct from problems with the content
    /// itself: a missing file, a failed seek, a failed write.
    Io,
}

/// Convenience type for Result.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The classification of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// True when the error indicates untrustworthy input rather than a
    /// caller mistake or an I/O failure.
    pub fn is_malformed(&self) -> bool {
        matches!(self.kind, ErrorKind::Malformed | ErrorKind::UnexpectedEof)
    }

    /// True when the error indicates a broken API contract.
    pub fn is_usage(&self) -> bool {
        matches!(self.kind, ErrorKind::Usage)
    }

    pub(crate) fn usage(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            kind: ErrorKind::Usage,
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            kind: ErrorKind::Malformed,
        }
    }

    pub(crate) fn invalid_tag(value: u8) -> Self {
        Self::malformed(format!("invalid tag type value: {}", value))
    }

    pub(crate) fn invalid_list_type(value: u8) -> Self {
        Self::malformed(format!("invalid list element type value: {}", value))
    }

    pub(crate) fn string_too_long(len: usize) -> Self {
        Self::malformed(format!(
            "string of {} bytes exceeds the 32767 byte wire limit",
            len
        ))
    }

    pub(crate) fn missing_attribute(name: &str) -> Self {
        Self::malformed(format!(
            "missing {} attribute, unable to determine tag type",
            name
        ))
    }

    pub(crate) fn unknown_type_token(token: &str) -> Self {
        Self::malformed(format!("unrecognized or unsupported tag type {:?}", token))
    }

    pub(crate) fn nonunicode(data: &[u8]) -> Self {
        Self::malformed(format!(
            "invalid string, not unicode: {}",
            String::from_utf8_lossy(data)
        ))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.msg)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Self {
                msg: e.to_string(),
                kind: ErrorKind::UnexpectedEof,
            },
            _ => Self {
                msg: format!("io error: {}", e),
                kind: ErrorKind::Io,
            },
        }
    }
}
