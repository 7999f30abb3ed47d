//! Error handling for the training pipeline
//!
//! A single `Error` type is shared by the encoder, the engine interface and
//! the optimizer. Every variant is fatal for the run: nothing in this crate
//! retries.

use std::fmt;

use crate::encoding::SlotLayout;

/// Training pipeline error
#[derive(Debug)]
pub enum Error {
    /// Pre-flight configuration problem (dimensions, depth budget, keys, refresh width)
    Config(String),
    /// A vector or matrix does not fit in its target slot layout
    CapacityExceeded {
        /// What was being encoded
        what: &'static str,
        /// Unpadded length that was requested
        len: usize,
        /// Largest length the layout can host
        capacity: usize,
    },
    /// An operand with the wrong layout tag reached a protocol step
    LayoutMismatch {
        /// Layout the step expects
        expected: String,
        /// Layout the operand carries
        found: SlotLayout,
    },
    /// An operand ran out of multiplicative depth
    DepthExhausted {
        /// Depth the operation would reach
        required: usize,
        /// Maximum depth the engine supports between refreshes
        available: usize,
    },
    /// Malformed input data
    Data(String),
    /// Unreadable input or unwritable output
    Io(std::io::Error),
    /// Summary serialization failure
    Json(serde_json::Error),
}

impl Error {
    /// Returns true for errors detected before any ciphertext is produced.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::CapacityExceeded { .. } | Error::LayoutMismatch { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
            Error::CapacityExceeded {
                what,
                len,
                capacity,
            } => write!(
                f,
                "configuration error: {} of length {} exceeds layout capacity {}",
                what, len, capacity
            ),
            Error::LayoutMismatch { expected, found } => write!(
                f,
                "configuration error: expected {} operand, found {}",
                expected, found
            ),
            Error::DepthExhausted {
                required,
                available,
            } => write!(
                f,
                "multiplicative depth exhausted: operation needs depth {} but only {} levels are available",
                required, available
            ),
            Error::Data(msg) => write!(f, "data error: {}", msg),
            Error::Io(err) => write!(f, "i/o error: {}", err),
            Error::Json(err) => write!(f, "serialization error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

/// Result type for training operations
pub type Result<T> = std::result::Result<T, Error>;

/// Create a configuration `Error` with format string support
macro_rules! config_err {
    ($($arg:tt)*) => {
        $crate::error::Error::Config(format!($($arg)*))
    };
}

pub(crate) use config_err;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(config_err!("bad {}", 1).is_configuration());
        assert!(Error::CapacityExceeded {
            what: "vector",
            len: 9,
            capacity: 8
        }
        .is_configuration());
        assert!(!Error::DepthExhausted {
            required: 14,
            available: 13
        }
        .is_configuration());
        assert!(!Error::Data("x".into()).is_configuration());
    }

    #[test]
    fn test_display_mentions_capacity() {
        let err = Error::CapacityExceeded {
            what: "row-cloned vector",
            len: 5,
            capacity: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("row-cloned vector"));
        assert!(msg.contains('5'));
        assert!(msg.contains('4'));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
