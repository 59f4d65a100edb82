//! Data model for segment index metadata.

pub mod index_state;
pub mod types;

pub use index_state::{Field, IndexState};
pub use types::{Offset, Timestamp};
