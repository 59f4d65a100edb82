//! Structured-text (JSON) projection of an index state.
//!
//! Each member is read through [`JsonValue`], a per-type trait that checks
//! the width and signedness of the encoded number against the target field.
//! Missing members leave the field at its default so that fields can be
//! added or removed without breaking older documents.
//!
//! `max_offset` is not part of this projection.

use serde_json::{Map, Value};

use crate::error::{CompatError, Result};
use crate::model::{Field, IndexState, Offset, Timestamp};

/// A value that can be read from and written to a JSON member.
pub trait JsonValue: Sized + Default {
    /// Decode `v`, rejecting values that do not fit `Self` exactly.
    ///
    /// `field` names the member being decoded and is used in error messages.
    fn read_value(v: &Value, field: &str) -> Result<Self>;

    /// Encode `self` as a JSON value.
    fn to_value(&self) -> Value;
}

fn type_error(field: &str, expected: &str, v: &Value) -> CompatError {
    CompatError::decode_text(format!("member `{field}`: expected {expected}, found {v}"))
}

impl JsonValue for i64 {
    fn read_value(v: &Value, field: &str) -> Result<Self> {
        v.as_i64().ok_or_else(|| type_error(field, "signed 64-bit integer", v))
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl JsonValue for u64 {
    fn read_value(v: &Value, field: &str) -> Result<Self> {
        v.as_u64().ok_or_else(|| type_error(field, "unsigned 64-bit integer", v))
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl JsonValue for u32 {
    fn read_value(v: &Value, field: &str) -> Result<Self> {
        v.as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| type_error(field, "unsigned 32-bit integer", v))
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl JsonValue for i32 {
    fn read_value(v: &Value, field: &str) -> Result<Self> {
        v.as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| type_error(field, "signed 32-bit integer", v))
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl JsonValue for Offset {
    fn read_value(v: &Value, field: &str) -> Result<Self> {
        i64::read_value(v, field).map(Offset::new)
    }

    fn to_value(&self) -> Value {
        self.value().to_value()
    }
}

impl JsonValue for Timestamp {
    fn read_value(v: &Value, field: &str) -> Result<Self> {
        i64::read_value(v, field).map(Timestamp::new)
    }

    fn to_value(&self) -> Value {
        self.value().to_value()
    }
}

impl<T: JsonValue> JsonValue for Vec<T> {
    fn read_value(v: &Value, field: &str) -> Result<Self> {
        let items = v.as_array().ok_or_else(|| type_error(field, "array", v))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| T::read_value(item, &format!("{field}[{i}]")))
            .collect()
    }

    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(|item| item.to_value()).collect())
    }
}

/// Read member `key` of `obj` into `target`, leaving `target` untouched if absent.
pub fn read_member<T: JsonValue>(obj: &Map<String, Value>, key: &str, target: &mut T) -> Result<()> {
    if let Some(v) = obj.get(key) {
        *target = T::read_value(v, key)?;
    }
    Ok(())
}

/// Project an index state onto a JSON object.
pub fn to_json_value(st: &IndexState) -> Value {
    let mut obj = Map::new();
    obj.insert(Field::Bitflags.name().to_string(), st.bitflags.to_value());
    obj.insert(Field::BaseOffset.name().to_string(), st.base_offset.to_value());
    obj.insert(
        Field::BaseTimestamp.name().to_string(),
        st.base_timestamp.to_value(),
    );
    obj.insert(
        Field::MaxTimestamp.name().to_string(),
        st.max_timestamp.to_value(),
    );
    obj.insert(
        Field::RelativeOffsetIndex.name().to_string(),
        st.relative_offset_index().to_vec().to_value(),
    );
    obj.insert(
        Field::RelativeTimeIndex.name().to_string(),
        st.relative_time_index().to_vec().to_value(),
    );
    obj.insert(
        Field::PositionIndex.name().to_string(),
        st.position_index().to_vec().to_value(),
    );
    Value::Object(obj)
}

/// Check the invariants whose members are all present in `obj`.
fn check_present_members(obj: &Map<String, Value>, st: &IndexState) -> Result<()> {
    let has = |field: Field| obj.contains_key(field.name());

    if has(Field::RelativeOffsetIndex) && has(Field::RelativeTimeIndex) && has(Field::PositionIndex) {
        let lengths = [
            st.relative_offset_index().len(),
            st.relative_time_index().len(),
            st.position_index().len(),
        ];
        if lengths.iter().any(|&len| len != lengths[0]) {
            return Err(CompatError::invariant(format!(
                "sequence lengths differ: relative_offset_index={}, relative_time_index={}, position_index={}",
                lengths[0], lengths[1], lengths[2]
            )));
        }
    }

    if has(Field::BaseTimestamp) && has(Field::MaxTimestamp) && st.base_timestamp > st.max_timestamp {
        return Err(CompatError::invariant(format!(
            "base_timestamp {} exceeds max_timestamp {}",
            st.base_timestamp, st.max_timestamp
        )));
    }

    Ok(())
}

/// Decode an index state from its JSON projection.
///
/// Missing members take their defaults. Invariants are checked only where
/// every member they involve is present.
pub fn from_json_value(v: &Value) -> Result<IndexState> {
    let obj = v
        .as_object()
        .ok_or_else(|| type_error("<root>", "object", v))?;

    let mut st = IndexState::new();
    read_member(obj, Field::Bitflags.name(), &mut st.bitflags)?;
    read_member(obj, Field::BaseOffset.name(), &mut st.base_offset)?;
    read_member(obj, Field::BaseTimestamp.name(), &mut st.base_timestamp)?;
    read_member(obj, Field::MaxTimestamp.name(), &mut st.max_timestamp)?;

    let mut relative_offset_index: Vec<u32> = Vec::new();
    let mut relative_time_index: Vec<u32> = Vec::new();
    let mut position_index: Vec<u64> = Vec::new();
    read_member(obj, Field::RelativeOffsetIndex.name(), &mut relative_offset_index)?;
    read_member(obj, Field::RelativeTimeIndex.name(), &mut relative_time_index)?;
    read_member(obj, Field::PositionIndex.name(), &mut position_index)?;

    let st = st.with_sequences(relative_offset_index, relative_time_index, position_index);
    check_present_members(obj, &st)?;
    Ok(st)
}

/// Encode an index state as compact JSON text.
pub fn to_text(st: &IndexState) -> Result<String> {
    Ok(serde_json::to_string(&to_json_value(st))?)
}

/// Decode an index state from JSON text.
pub fn from_text(text: &str) -> Result<IndexState> {
    let v: Value = serde_json::from_str(text)
        .map_err(|e| CompatError::decode_text(format!("malformed JSON: {e}")))?;
    from_json_value(&v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

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
    fn test_projection_members() {
        let v = to_json_value(&sample_state());
        assert_eq!(
            v,
            json!({
                "bitflags": 7,
                "base_offset": 100,
                "base_timestamp": 1000,
                "max_timestamp": 2000,
                "relative_offset_index": [0, 10, 20],
                "relative_time_index": [0, 5, 9],
                "position_index": [512, 1024, 2048],
            })
        );
        assert!(v.get("max_offset").is_none());
    }

    #[test]
    fn test_text_roundtrip_drops_max_offset() {
        let st = sample_state();
        let decoded = from_text(&to_text(&st).unwrap()).unwrap();

        assert!(st.first_difference(&decoded, Field::TEXT_PROJECTION).is_none());
        assert_eq!(decoded.max_offset, Offset::default());
    }

    #[test]
    fn test_max_timestamp_read_independently() {
        let st = from_text(r#"{"base_timestamp": 5, "max_timestamp": 9}"#).unwrap();
        assert_eq!(st.base_timestamp, Timestamp::new(5));
        assert_eq!(st.max_timestamp, Timestamp::new(9));
    }

    #[test]
    fn test_missing_members_default() {
        let st = from_text("{}").unwrap();
        assert_eq!(st, IndexState::new());

        let st = from_text(r#"{"relative_offset_index": [1, 2]}"#).unwrap();
        assert_eq!(st.relative_offset_index(), &[1, 2]);
        assert!(st.relative_time_index().is_empty());
        assert!(st.validate().unwrap_err().is_invariant_violation());
    }

    #[test]
    fn test_unknown_members_ignored() {
        let st = from_text(r#"{"bitflags": 3, "max_offset": 99, "future_field": "x"}"#).unwrap();
        assert_eq!(st.bitflags, 3);
        assert_eq!(st.max_offset, Offset::default());
    }

    #[test]
    fn test_rejects_signedness_and_width_mismatch() {
        let cases = [
            r#"{"bitflags": -1}"#,
            r#"{"bitflags": 4294967296}"#,
            r#"{"bitflags": 1.5}"#,
            r#"{"base_offset": 9223372036854775808}"#,
            r#"{"base_timestamp": "1000"}"#,
            r#"{"position_index": [1, -2]}"#,
            r#"{"relative_time_index": [4294967296]}"#,
            r#"{"relative_offset_index": 5}"#,
        ];

        for case in cases {
            let err = from_text(case).unwrap_err();
            assert!(err.is_decode(), "{case} should fail to decode, got {err}");
        }
    }

    #[test]
    fn test_error_names_member() {
        let err = from_text(r#"{"position_index": [1, -2]}"#).unwrap_err();
        assert!(err.to_string().contains("position_index[1]"));
    }

    #[test]
    fn test_rejects_non_object_and_malformed() {
        assert!(from_text("[1, 2, 3]").unwrap_err().is_decode());
        assert!(from_text("{\"bitflags\": ").unwrap_err().is_decode());
    }

    #[test]
    fn test_primitive_widths() {
        assert_eq!(u64::read_value(&json!(u64::MAX), "f").unwrap(), u64::MAX);
        assert_eq!(i64::read_value(&json!(i64::MIN), "f").unwrap(), i64::MIN);
        assert_eq!(i32::read_value(&json!(-7), "f").unwrap(), -7);
        assert!(i32::read_value(&json!(i64::from(i32::MAX) + 1), "f").is_err());
        assert!(u64::read_value(&json!(-1), "f").is_err());
    }

    #[test]
    fn test_misaligned_sequences_rejected() {
        let err = from_text(
            r#"{"relative_offset_index": [0, 10, 20], "relative_time_index": [0, 5], "position_index": [512, 1024, 2048]}"#,
        )
        .unwrap_err();
        assert!(err.is_invariant_violation(), "unexpected error: {err}");
        assert!(err.to_string().contains("relative_time_index=2"));
    }

    #[test]
    fn test_inverted_timestamps_rejected() {
        let err = from_text(r#"{"base_timestamp": 10, "max_timestamp": 9}"#).unwrap_err();
        assert!(err.is_invariant_violation(), "unexpected error: {err}");

        // A missing max_timestamp defaults to zero and is not checked.
        let st = from_text(r#"{"base_timestamp": 10}"#).unwrap();
        assert_eq!(st.base_timestamp, Timestamp::new(10));
    }
}
