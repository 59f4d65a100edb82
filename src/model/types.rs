//! Named wrappers for the scalar quantities stored in an index state.
//!
//! Offsets and timestamps are both `i64` on the wire. Keeping them as distinct
//! types stops one being assigned to the other by accident; conversion to and
//! from the raw value is always explicit.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A logical record offset within a log.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Offset(i64);

impl Offset {
    /// Wrap a raw offset.
    pub const fn new(value: i64) -> Self {
        Offset(value)
    }

    /// The raw offset value.
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl From<Offset> for i64 {
    fn from(offset: Offset) -> Self {
        offset.0
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A timestamp in milliseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Wrap a raw millisecond timestamp.
    pub const fn new(millis: i64) -> Self {
        Timestamp(millis)
    }

    /// The raw millisecond value.
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl From<Timestamp> for i64 {
    fn from(timestamp: Timestamp) -> Self {
        timestamp.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_conversion() {
        let offset = Offset::new(100);
        let raw: i64 = offset.into();
        assert_eq!(raw, 100);
        assert_eq!(offset.value(), 100);

        let ts = Timestamp::new(-5);
        assert_eq!(i64::from(ts), -5);
        assert_eq!(ts.to_string(), "-5");
    }

    #[test]
    fn test_ordering_and_default() {
        assert!(Offset::new(1) < Offset::new(2));
        assert_eq!(Offset::default(), Offset::new(0));
        assert_eq!(Timestamp::default(), Timestamp::new(0));
    }
}
