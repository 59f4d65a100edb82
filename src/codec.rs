//! The two projections of an index state.
//!
//! [`json`] is the human-readable fixture format and [`binary`] is the
//! persisted on-disk format. Both describe the same [`crate::model::IndexState`]
//! field by field; the verifier checks that they agree.

pub mod binary;
pub mod json;
