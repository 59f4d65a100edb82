//! The per-segment index state.
//!
//! An [`IndexState`] is a lookup table from logical offsets and timestamps to
//! byte positions inside one segment file. Each sample is a triple of
//! (relative offset, relative timestamp, file position) spread across three
//! index-aligned sequences.

use std::fmt::Display;

use crate::error::{CompatError, FieldMismatch, Result};
use crate::model::types::{Offset, Timestamp};

/// The fields of an index state, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Bitflags,
    BaseOffset,
    MaxOffset,
    BaseTimestamp,
    MaxTimestamp,
    RelativeOffsetIndex,
    RelativeTimeIndex,
    PositionIndex,
}

impl Field {
    /// Every field, in binary body order.
    pub const ALL: &'static [Field] = &[
        Field::Bitflags,
        Field::BaseOffset,
        Field::MaxOffset,
        Field::BaseTimestamp,
        Field::MaxTimestamp,
        Field::RelativeOffsetIndex,
        Field::RelativeTimeIndex,
        Field::PositionIndex,
    ];

    /// Fields carried by the structured-text projection. `max_offset` is
    /// binary-only.
    pub const TEXT_PROJECTION: &'static [Field] = &[
        Field::Bitflags,
        Field::BaseOffset,
        Field::BaseTimestamp,
        Field::MaxTimestamp,
        Field::RelativeOffsetIndex,
        Field::RelativeTimeIndex,
        Field::PositionIndex,
    ];

    /// The member name used by the text projection.
    pub fn name(self) -> &'static str {
        match self {
            Field::Bitflags => "bitflags",
            Field::BaseOffset => "base_offset",
            Field::MaxOffset => "max_offset",
            Field::BaseTimestamp => "base_timestamp",
            Field::MaxTimestamp => "max_timestamp",
            Field::RelativeOffsetIndex => "relative_offset_index",
            Field::RelativeTimeIndex => "relative_time_index",
            Field::PositionIndex => "position_index",
        }
    }
}

/// Index metadata for a single segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexState {
    /// Opaque feature/format flags.
    pub bitflags: u32,
    /// First logical offset in the segment.
    pub base_offset: Offset,
    /// Last logical offset in the segment.
    pub max_offset: Offset,
    /// Timestamp of the first record.
    pub base_timestamp: Timestamp,
    /// Largest record timestamp.
    pub max_timestamp: Timestamp,
    relative_offset_index: Vec<u32>,
    relative_time_index: Vec<u32>,
    position_index: Vec<u64>,
}

impl IndexState {
    /// Create an empty index state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a state from decoded sequences without checking invariants.
    ///
    /// Callers that need a valid state must follow up with [`IndexState::validate`].
    pub(crate) fn with_sequences(
        mut self,
        relative_offset_index: Vec<u32>,
        relative_time_index: Vec<u32>,
        position_index: Vec<u64>,
    ) -> Self {
        self.relative_offset_index = relative_offset_index;
        self.relative_time_index = relative_time_index;
        self.position_index = position_index;
        self
    }

    /// Build a state in one step from its scalar header and sample sequences.
    pub fn from_parts(
        header: IndexState,
        relative_offset_index: Vec<u32>,
        relative_time_index: Vec<u32>,
        position_index: Vec<u64>,
    ) -> Result<Self> {
        let st = header.with_sequences(relative_offset_index, relative_time_index, position_index);
        st.validate()?;
        Ok(st)
    }

    /// Append one index sample.
    ///
    /// Samples must arrive in non-decreasing relative offset order.
    pub fn add_entry(&mut self, relative_offset: u32, relative_time: u32, position: u64) -> Result<()> {
        if let Some(&last) = self.relative_offset_index.last()
            && relative_offset < last
        {
            return Err(CompatError::invariant(format!(
                "relative offset {relative_offset} appended after {last}"
            )));
        }

        self.relative_offset_index.push(relative_offset);
        self.relative_time_index.push(relative_time);
        self.position_index.push(position);
        Ok(())
    }

    /// Offsets relative to `base_offset` at which samples were taken.
    pub fn relative_offset_index(&self) -> &[u32] {
        &self.relative_offset_index
    }

    /// Timestamps relative to `base_timestamp`, aligned with the offsets.
    pub fn relative_time_index(&self) -> &[u32] {
        &self.relative_time_index
    }

    /// Byte positions inside the segment file, aligned with the offsets.
    pub fn position_index(&self) -> &[u64] {
        &self.position_index
    }

    /// Number of samples.
    ///
    /// Only meaningful on a validated state; it reports the offset sequence length.
    pub fn len(&self) -> usize {
        self.relative_offset_index.len()
    }

    /// Whether the state holds no samples.
    pub fn is_empty(&self) -> bool {
        self.relative_offset_index.is_empty()
    }

    /// Iterate over `(relative_offset, relative_time, position)` samples.
    pub fn entries(&self) -> impl Iterator<Item = (u32, u32, u64)> + '_ {
        self.relative_offset_index
            .iter()
            .zip(&self.relative_time_index)
            .zip(&self.position_index)
            .map(|((&offset, &time), &position)| (offset, time, position))
    }

    /// Check every data-model invariant, reporting the first one broken.
    pub fn validate(&self) -> Result<()> {
        let offsets = self.relative_offset_index.len();
        let times = self.relative_time_index.len();
        let positions = self.position_index.len();
        if offsets != times || offsets != positions {
            return Err(CompatError::invariant(format!(
                "index sequence lengths differ: relative_offset_index={offsets}, \
                 relative_time_index={times}, position_index={positions}"
            )));
        }

        if self.base_offset > self.max_offset {
            return Err(CompatError::invariant(format!(
                "base_offset {} exceeds max_offset {}",
                self.base_offset, self.max_offset
            )));
        }

        if self.base_timestamp > self.max_timestamp {
            return Err(CompatError::invariant(format!(
                "base_timestamp {} exceeds max_timestamp {}",
                self.base_timestamp, self.max_timestamp
            )));
        }

        if let Some(i) = self
            .relative_offset_index
            .windows(2)
            .position(|pair| pair[1] < pair[0])
        {
            return Err(CompatError::invariant(format!(
                "relative_offset_index decreases at position {}: {} after {}",
                i + 1,
                self.relative_offset_index[i + 1],
                self.relative_offset_index[i]
            )));
        }

        Ok(())
    }

    /// Compare two states over `fields`, stopping at the first difference.
    ///
    /// `self` is reported as the expected side and `other` as the actual side.
    pub fn first_difference(&self, other: &IndexState, fields: &[Field]) -> Option<FieldMismatch> {
        fields.iter().find_map(|&field| match field {
            Field::Bitflags => scalar_difference(field, self.bitflags, other.bitflags),
            Field::BaseOffset => scalar_difference(field, self.base_offset, other.base_offset),
            Field::MaxOffset => scalar_difference(field, self.max_offset, other.max_offset),
            Field::BaseTimestamp => {
                scalar_difference(field, self.base_timestamp, other.base_timestamp)
            }
            Field::MaxTimestamp => {
                scalar_difference(field, self.max_timestamp, other.max_timestamp)
            }
            Field::RelativeOffsetIndex => sequence_difference(
                field,
                &self.relative_offset_index,
                &other.relative_offset_index,
            ),
            Field::RelativeTimeIndex => sequence_difference(
                field,
                &self.relative_time_index,
                &other.relative_time_index,
            ),
            Field::PositionIndex => {
                sequence_difference(field, &self.position_index, &other.position_index)
            }
        })
    }
}

fn scalar_difference<T: PartialEq + Display>(
    field: Field,
    expected: T,
    actual: T,
) -> Option<FieldMismatch> {
    (expected != actual).then(|| FieldMismatch {
        field: field.name(),
        index: None,
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

fn sequence_difference<T: PartialEq + Display>(
    field: Field,
    expected: &[T],
    actual: &[T],
) -> Option<FieldMismatch> {
    let render = |value: Option<&T>| match value {
        Some(v) => v.to_string(),
        None => "<missing>".to_string(),
    };

    let index = expected
        .iter()
        .zip(actual)
        .position(|(a, b)| a != b)
        .or_else(|| (expected.len() != actual.len()).then(|| expected.len().min(actual.len())))?;

    Some(FieldMismatch {
        field: field.name(),
        index: Some(index),
        expected: render(expected.get(index)),
        actual: render(actual.get(index)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> IndexState {
        let mut st = IndexState::new();
        st.bitflags = 7;
        st.base_offset = Offset::new(100);
        st.max_offset = Offset::new(200);
        st.base_timestamp = Timestamp::new(1000);
        st.max_timestamp = Timestamp::new(2000);
        st.add_entry(0, 0, 512).unwrap();
        st.add_entry(10, 5, 1024).unwrap();
        st.add_entry(20, 9, 2048).unwrap();
        st
    }

    #[test]
    fn test_add_entry_keeps_sequences_aligned() {
        let st = sample_state();
        assert_eq!(st.len(), 3);
        assert_eq!(st.relative_offset_index(), &[0, 10, 20]);
        assert_eq!(st.relative_time_index(), &[0, 5, 9]);
        assert_eq!(st.position_index(), &[512, 1024, 2048]);

        let entries: Vec<_> = st.entries().collect();
        assert_eq!(entries, vec![(0, 0, 512), (10, 5, 1024), (20, 9, 2048)]);
        st.validate().unwrap();
    }

    #[test]
    fn test_add_entry_rejects_decreasing_offset() {
        let mut st = sample_state();
        st.add_entry(20, 11, 4096).unwrap();
        let err = st.add_entry(19, 12, 8192).unwrap_err();
        assert!(err.is_invariant_violation());
        assert_eq!(st.len(), 4);
    }

    #[test]
    fn test_validate_rejects_unequal_lengths() {
        let st = IndexState::new().with_sequences(vec![1, 2], vec![1], vec![1, 2]);
        let err = st.validate().unwrap_err();
        assert!(err.is_invariant_violation());
        assert!(err.to_string().contains("lengths differ"));
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let mut st = sample_state();
        st.base_offset = Offset::new(201);
        assert!(st.validate().unwrap_err().to_string().contains("base_offset"));

        let mut st = sample_state();
        st.max_timestamp = Timestamp::new(999);
        assert!(st.validate().unwrap_err().to_string().contains("base_timestamp"));
    }

    #[test]
    fn test_from_parts_validates() {
        let mut header = IndexState::new();
        header.max_offset = Offset::new(10);

        let st = IndexState::from_parts(header.clone(), vec![1, 3], vec![0, 2], vec![8, 16]).unwrap();
        assert_eq!(st.len(), 2);
        assert_eq!(st.max_offset, Offset::new(10));

        let err = IndexState::from_parts(header, vec![1], vec![], vec![8]).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_validate_rejects_decreasing_offsets() {
        let st = IndexState::new().with_sequences(vec![5, 4], vec![0, 0], vec![0, 0]);
        assert!(st.validate().unwrap_err().is_invariant_violation());
    }

    #[test]
    fn test_first_difference_scalar() {
        let a = sample_state();
        let mut b = a.clone();
        b.max_timestamp = Timestamp::new(2001);

        let diff = a.first_difference(&b, Field::ALL).unwrap();
        assert_eq!(diff.field, "max_timestamp");
        assert_eq!(diff.index, None);
        assert_eq!(diff.expected, "2000");
        assert_eq!(diff.actual, "2001");
    }

    #[test]
    fn test_first_difference_reports_earliest_field() {
        let a = sample_state();
        let mut b = a.clone();
        b.bitflags = 6;
        b.base_offset = Offset::new(0);

        let diff = a.first_difference(&b, Field::ALL).unwrap();
        assert_eq!(diff.field, "bitflags");
    }

    #[test]
    fn test_first_difference_sequence_element_and_length() {
        let a = sample_state();
        let b = a.clone().with_sequences(vec![0, 10, 20], vec![0, 5, 9], vec![512, 1000, 2048]);
        let diff = a.first_difference(&b, Field::ALL).unwrap();
        assert_eq!(diff.field, "position_index");
        assert_eq!(diff.index, Some(1));

        let c = a.clone().with_sequences(vec![0, 10], vec![0, 5, 9], vec![512, 1024, 2048]);
        let diff = a.first_difference(&c, Field::ALL).unwrap();
        assert_eq!(diff.field, "relative_offset_index");
        assert_eq!(diff.index, Some(2));
        assert_eq!(diff.expected, "20");
        assert_eq!(diff.actual, "<missing>");
    }

    #[test]
    fn test_text_projection_skips_max_offset() {
        let a = sample_state();
        let mut b = a.clone();
        b.max_offset = Offset::new(0);

        assert!(a.first_difference(&b, Field::TEXT_PROJECTION).is_none());
        assert_eq!(a.first_difference(&b, Field::ALL).unwrap().field, "max_offset");
    }
}
