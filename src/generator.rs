//! Random construction of valid index states.
//!
//! The generator owns its RNG so fixture runs can be reproduced from a seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{CompatError, Result};
use crate::model::{IndexState, Offset, Timestamp};

/// Bounds on the generated sample count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Minimum number of index samples.
    pub min_entries: usize,
    /// Maximum number of index samples.
    pub max_entries: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            min_entries: 1,
            max_entries: 10_000,
        }
    }
}

impl GeneratorConfig {
    /// Check that the sample count bounds form a non-empty range.
    pub fn validate(&self) -> Result<()> {
        if self.min_entries > self.max_entries {
            return Err(CompatError::config(format!(
                "min_entries ({}) must not exceed max_entries ({})",
                self.min_entries, self.max_entries
            )));
        }
        Ok(())
    }
}

/// Produces random index states that satisfy every model invariant.
#[derive(Debug)]
pub struct IndexStateGenerator {
    rng: StdRng,
    config: GeneratorConfig,
}

impl IndexStateGenerator {
    /// Create a generator, seeded deterministically when `seed` is given.
    pub fn new(config: GeneratorConfig, seed: Option<u64>) -> Result<Self> {
        config.validate()?;

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(IndexStateGenerator { rng, config })
    }

    /// The sample count bounds in use.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Build a random, valid index state.
    pub fn random_valid_index_state(&mut self) -> IndexState {
        let mut st = IndexState::new();
        st.bitflags = self.rng.random();

        let (base_offset, max_offset) = self.ordered_pair();
        st.base_offset = Offset::new(base_offset);
        st.max_offset = Offset::new(max_offset);

        let (base_timestamp, max_timestamp) = self.ordered_pair();
        st.base_timestamp = Timestamp::new(base_timestamp);
        st.max_timestamp = Timestamp::new(max_timestamp);

        let offset_span = relative_span(base_offset, max_offset);
        let time_span = relative_span(base_timestamp, max_timestamp);
        let n = self
            .rng
            .random_range(self.config.min_entries..=self.config.max_entries);

        let mut relative_offsets: Vec<u32> =
            (0..n).map(|_| self.rng.random_range(0..=offset_span)).collect();
        relative_offsets.sort_unstable();

        let relative_times: Vec<u32> = (0..n)
            .map(|_| self.rng.random_range(0..=time_span))
            .collect();

        let mut positions: Vec<u64> = (0..n).map(|_| self.rng.random()).collect();
        positions.sort_unstable();

        st.with_sequences(relative_offsets, relative_times, positions)
    }

    fn ordered_pair(&mut self) -> (i64, i64) {
        let a: i64 = self.rng.random();
        let b: i64 = self.rng.random();
        (a.min(b), a.max(b))
    }
}

/// The largest relative value that still fits a u32 between `base` and `max`.
fn relative_span(base: i64, max: i64) -> u32 {
    let span = i128::from(max) - i128::from(base);
    span.clamp(0, i128::from(u32::MAX)) as u32
}
