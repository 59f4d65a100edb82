//! Cross-codec compatibility verification.
//!
//! A fixture is one index state captured in both encodings. Writing a
//! fixture manufactures the regression corpus; reading one back proves that
//! the current codecs still agree on historical data.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::codec::{binary, json};
use crate::error::{CompatError, Result};
use crate::generator::{GeneratorConfig, IndexStateGenerator};
use crate::model::{Field, IndexState};

/// Configuration for a verification run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Generator seed. `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Bounds for generated states.
    pub generator: GeneratorConfig,
}

/// One index state in both encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub binary: Vec<u8>,
    pub text: String,
}

/// Checks that the text and binary codecs agree.
#[derive(Debug)]
pub struct CompatibilityVerifier {
    config: VerifierConfig,
    generator: IndexStateGenerator,
}

impl CompatibilityVerifier {
    /// Create a verifier from its configuration.
    pub fn new(config: VerifierConfig) -> Result<Self> {
        let generator = IndexStateGenerator::new(config.generator, config.seed)?;
        Ok(CompatibilityVerifier { config, generator })
    }

    /// Create a verifier with default bounds and a fixed seed.
    pub fn seeded(seed: u64) -> Result<Self> {
        Self::new(VerifierConfig {
            seed: Some(seed),
            ..Default::default()
        })
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Decode a persisted fixture and check both encodings describe the same state.
    ///
    /// Returns the binary-decoded state, which is authoritative.
    pub fn verify_read(&self, persisted_binary: &[u8], persisted_text: &str) -> Result<IndexState> {
        let from_text = json::from_text(persisted_text)?;
        let from_binary = binary::from_bytes(persisted_binary)?;

        if let Some(mismatch) = from_text.first_difference(&from_binary, Field::TEXT_PROJECTION) {
            warn!("text and binary fixtures disagree: {mismatch}");
            return Err(CompatError::Mismatch(mismatch));
        }

        info!(
            "fixture verified: {} samples, {} binary bytes, {} text bytes",
            from_binary.len(),
            persisted_binary.len(),
            persisted_text.len()
        );
        Ok(from_binary)
    }

    /// Generate a fresh valid state and encode it with both codecs.
    pub fn verify_write(&mut self) -> Result<Fixture> {
        let st = self.generator.random_valid_index_state();
        st.validate()?;

        let fixture = Fixture {
            binary: binary::to_bytes(&st)?,
            text: json::to_text(&st)?,
        };

        info!(
            "fixture generated: {} samples, {} binary bytes, {} text bytes",
            st.len(),
            fixture.binary.len(),
            fixture.text.len()
        );
        Ok(fixture)
    }

    /// Check that `st` survives both codecs unchanged.
    ///
    /// The binary codec must preserve every field; the text codec must
    /// preserve the fields it projects.
    pub fn verify_round_trip(&self, st: &IndexState) -> Result<()> {
        let decoded = binary::from_bytes(&binary::to_bytes(st)?)?;
        if let Some(mismatch) = st.first_difference(&decoded, Field::ALL) {
            return Err(CompatError::Mismatch(mismatch));
        }

        let decoded = json::from_text(&json::to_text(st)?)?;
        if let Some(mismatch) = st.first_difference(&decoded, Field::TEXT_PROJECTION) {
            return Err(CompatError::Mismatch(mismatch));
        }

        debug!("round trip verified for {} samples", st.len());
        Ok(())
    }

    /// Generate a state and run it through [`Self::verify_round_trip`].
    pub fn check_generated(&mut self) -> Result<IndexState> {
        let st = self.generator.random_valid_index_state();
        self.verify_round_trip(&st)?;
        Ok(st)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::binary::BITFLAGS_RANGE;
    use crate::model::{Offset, Timestamp};

    fn small_verifier(seed: u64) -> CompatibilityVerifier {
        CompatibilityVerifier::new(VerifierConfig {
            seed: Some(seed),
            generator: GeneratorConfig {
                min_entries: 1,
                max_entries: 32,
            },
        })
        .unwrap()
    }

    fn scenario_state() -> IndexState {
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
    fn test_write_then_read() {
        let mut verifier = small_verifier(11);
        for _ in 0..20 {
            let fixture = verifier.verify_write().unwrap();
            let st = verifier.verify_read(&fixture.binary, &fixture.text).unwrap();
            st.validate().unwrap();
        }
    }

    #[test]
    fn test_read_returns_binary_state() {
        let st = scenario_state();
        let verifier = small_verifier(0);
        let read = verifier
            .verify_read(&binary::to_bytes(&st).unwrap(), &json::to_text(&st).unwrap())
            .unwrap();

        // max_offset only travels in the binary encoding.
        assert_eq!(read, st);
    }

    #[test]
    fn test_mutated_bitflags_detected() {
        let st = scenario_state();
        let text = json::to_text(&st).unwrap();
        let mut bytes = binary::to_bytes(&st).unwrap();
        bytes[BITFLAGS_RANGE.start] ^= 0x10;

        let verifier = small_verifier(0);
        let err = verifier.verify_read(&bytes, &text).unwrap_err();
        assert!(err.is_decode() || err.is_mismatch(), "unexpected error: {err}");
    }

    #[test]
    fn test_value_drift_is_a_mismatch() {
        let st = scenario_state();
        let mut drifted = st.clone();
        drifted.bitflags = 3;

        let verifier = small_verifier(0);
        let err = verifier
            .verify_read(&binary::to_bytes(&drifted).unwrap(), &json::to_text(&st).unwrap())
            .unwrap_err();

        match err {
            CompatError::Mismatch(mismatch) => {
                assert_eq!(mismatch.field, "bitflags");
                assert_eq!(mismatch.expected, "7");
                assert_eq!(mismatch.actual, "3");
            }
            other => panic!("expected mismatch, got {other}"),
        }
    }

    #[test]
    fn test_sequence_drift_names_index() {
        let st = scenario_state();
        let drifted = IndexState::from_parts(
            st.clone(),
            vec![0, 10, 20],
            vec![0, 6, 9],
            vec![512, 1024, 2048],
        )
        .unwrap();

        let verifier = small_verifier(0);
        let err = verifier
            .verify_read(&binary::to_bytes(&drifted).unwrap(), &json::to_text(&st).unwrap())
            .unwrap_err();
        assert_eq!(err.to_string(), "Mismatch error: relative_time_index[1]: expected 5, found 6");
    }

    #[test]
    fn test_misaligned_text_is_an_invariant_violation() {
        let st = scenario_state();
        let text = r#"{"bitflags": 7, "base_offset": 100, "base_timestamp": 1000, "max_timestamp": 2000,
            "relative_offset_index": [0, 10, 20], "relative_time_index": [0, 5],
            "position_index": [512, 1024, 2048]}"#;

        let err = small_verifier(0)
            .verify_read(&binary::to_bytes(&st).unwrap(), text)
            .unwrap_err();
        assert!(err.is_invariant_violation(), "unexpected error: {err}");
        assert!(!err.is_mismatch());
    }

    #[test]
    fn test_decode_errors_propagate() {
        let st = scenario_state();
        let verifier = small_verifier(0);

        let err = verifier
            .verify_read(&binary::to_bytes(&st).unwrap(), "not json")
            .unwrap_err();
        assert!(err.is_decode());

        let err = verifier
            .verify_read(&[1, 2, 3], &json::to_text(&st).unwrap())
            .unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_round_trip_of_generated_states() {
        let mut verifier = small_verifier(99);
        for _ in 0..50 {
            verifier.check_generated().unwrap();
        }
    }

    #[test]
    fn test_round_trip_rejects_invalid_state() {
        let mut st = scenario_state();
        st.base_timestamp = Timestamp::new(3000);
        let err = small_verifier(0).verify_round_trip(&st).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_same_seed_same_fixture() {
        let a = small_verifier(5).verify_write().unwrap();
        let b = small_verifier(5).verify_write().unwrap();
        assert_eq!(a, b);
    }
}
