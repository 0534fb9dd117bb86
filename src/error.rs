use std::fmt;

/// The error kinds produced anywhere in this crate.
///
/// Modeled as a single hand-rolled enum (no `thiserror`) in the same style
/// the rest of this crate's ambient stack uses: a flat `enum` with a manual
/// `Display` impl and small constructor helpers, matching the shape of the
/// original PDF.js-style port this crate grew out of.
#[derive(Debug, Clone, PartialEq)]
pub enum CosError {
    /// A caller passed a null/empty/otherwise unusable argument at a public
    /// boundary (e.g. zero-length filter input, a zero stream-reader buffer).
    InvalidArgument { message: String },

    /// The underlying byte stream failed a read, seek, or tell.
    Io { message: String },

    /// A malformed literal, unterminated string, bad numeral, or unrecognized
    /// keyword. Soft at the tokenizer level (the current token becomes
    /// `Unknown` and scanning continues); can be hard at the parser level
    /// when no recovery point exists.
    Syntax {
        message: String,
        offset: usize,
    },

    /// A numeric literal exceeded the bounds of its target type, or an index
    /// fell outside a valid range.
    OutOfRange { message: String },

    /// An allocation failed.
    Memory { message: String },

    /// An internal invariant (reservoir/peek-queue bookkeeping) was
    /// violated. This should never occur in practice; treat it as fatal.
    InvalidState { message: String },

    /// A cross-reference table or entry was structurally malformed.
    Xref { message: String },
}

impl CosError {
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        CosError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        CosError::Io {
            message: message.into(),
        }
    }

    pub fn syntax<S: Into<String>>(message: S, offset: usize) -> Self {
        CosError::Syntax {
            message: message.into(),
            offset,
        }
    }

    pub fn out_of_range<S: Into<String>>(message: S) -> Self {
        CosError::OutOfRange {
            message: message.into(),
        }
    }

    pub fn memory<S: Into<String>>(message: S) -> Self {
        CosError::Memory {
            message: message.into(),
        }
    }

    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        CosError::InvalidState {
            message: message.into(),
        }
    }

    pub fn xref<S: Into<String>>(message: S) -> Self {
        CosError::Xref {
            message: message.into(),
        }
    }
}

impl fmt::Display for CosError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CosError::InvalidArgument { message } => write!(f, "invalid argument: {message}"),
            CosError::Io { message } => write!(f, "I/O error: {message}"),
            CosError::Syntax { message, offset } => {
                write!(f, "syntax error at byte {offset}: {message}")
            }
            CosError::OutOfRange { message } => write!(f, "out of range: {message}"),
            CosError::Memory { message } => write!(f, "allocation failure: {message}"),
            CosError::InvalidState { message } => write!(f, "invalid internal state: {message}"),
            CosError::Xref { message } => write!(f, "malformed xref: {message}"),
        }
    }
}

impl std::error::Error for CosError {}

impl From<std::io::Error> for CosError {
    fn from(err: std::io::Error) -> Self {
        CosError::io(err.to_string())
    }
}

pub type CosResult<T> = Result<T, CosError>;
