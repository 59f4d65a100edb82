//! # index-compat
//!
//! Round-trip compatibility checks for the segment index state record.
//!
//! The same index state can be persisted as structured text (JSON) or as a
//! compact, versioned binary record. This crate checks that both encodings
//! keep describing the same state as the code evolves.
//!
//! ## Features
//!
//! - Typed text and binary codecs for [`model::IndexState`]
//! - Seeded generation of valid states
//! - Corpus fixtures written to and read back from pluggable storage
//! - Cross-version check planning from a compatibility manifest

pub mod cli;
pub mod codec;
pub mod corpus;
pub mod error;
pub mod generator;
pub mod matrix;
pub mod model;
pub mod storage;
pub mod util;
pub mod verifier;

pub mod prelude {
    pub use crate::error::{CompatError, Result};
    pub use crate::generator::{GeneratorConfig, IndexStateGenerator};
    pub use crate::model::{Field, IndexState, Offset, Timestamp};
    pub use crate::verifier::{CompatibilityVerifier, Fixture, VerifierConfig};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
