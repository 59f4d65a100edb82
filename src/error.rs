//! Error types for index-compat.
//!
//! All failures are represented by the [`CompatError`] enum. Three variants
//! carry the verification taxonomy and must stay distinguishable for triage:
//!
//! - [`CompatError::Decode`]: a codec could not decode its input (malformed
//!   bytes, type-mismatched JSON member). Indicates codec breakage.
//! - [`CompatError::Mismatch`]: both codecs decoded successfully but produced
//!   different index states. Indicates semantic drift.
//! - [`CompatError::InvariantViolation`]: a constructed or decoded index state
//!   breaks a data-model invariant.
//!
//! # Examples
//!
//! ```
//! use index_compat::error::{CompatError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(CompatError::invariant("sequence lengths differ"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::fmt;
use std::io;

use serde::Serialize;
use thiserror::Error;

/// The codec that produced a decode error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// Structured-text (JSON) codec.
    Text,
    /// Compact-binary envelope codec.
    Binary,
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::Text => write!(f, "text"),
            Codec::Binary => write!(f, "binary"),
        }
    }
}

/// The first field at which two index states differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMismatch {
    /// Field name as it appears in the text projection.
    pub field: &'static str,
    /// Position inside a sequence field, if the difference is element-wise.
    pub index: Option<usize>,
    /// Rendered value from the text decode.
    pub expected: String,
    /// Rendered value from the binary decode.
    pub actual: String,
}

impl fmt::Display for FieldMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(
                f,
                "{}[{}]: expected {}, found {}",
                self.field, index, self.expected, self.actual
            ),
            None => write!(
                f,
                "{}: expected {}, found {}",
                self.field, self.expected, self.actual
            ),
        }
    }
}

/// The main error type for index-compat operations.
#[derive(Error, Debug)]
pub enum CompatError {
    /// Malformed or type-inconsistent encoded data.
    #[error("Decode error ({codec}): {message}")]
    Decode { codec: Codec, message: String },

    /// Both decodes succeeded but the instances differ.
    #[error("Mismatch error: {0}")]
    Mismatch(FieldMismatch),

    /// An index state violates a data-model invariant.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration or manifest errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with CompatError.
pub type Result<T> = std::result::Result<T, CompatError>;

impl CompatError {
    /// Create a new decode error attributed to the text codec.
    pub fn decode_text<S: Into<String>>(msg: S) -> Self {
        CompatError::Decode {
            codec: Codec::Text,
            message: msg.into(),
        }
    }

    /// Create a new decode error attributed to the binary codec.
    pub fn decode_binary<S: Into<String>>(msg: S) -> Self {
        CompatError::Decode {
            codec: Codec::Binary,
            message: msg.into(),
        }
    }

    /// Create a new invariant violation.
    pub fn invariant<S: Into<String>>(msg: S) -> Self {
        CompatError::InvariantViolation(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        CompatError::Storage(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        CompatError::Config(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        CompatError::Other(msg.into())
    }

    /// Whether this error came from a codec failing to decode.
    pub fn is_decode(&self) -> bool {
        matches!(self, CompatError::Decode { .. })
    }

    /// Whether this error reports a value mismatch between codecs.
    pub fn is_mismatch(&self) -> bool {
        matches!(self, CompatError::Mismatch(_))
    }

    /// Whether this error reports a broken data-model invariant.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, CompatError::InvariantViolation(_))
    }
}
