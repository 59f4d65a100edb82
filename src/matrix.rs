//! Cross-version compatibility planning.
//!
//! A manifest lists every released version in order and, per reader version,
//! the corpus versions it cannot read. The matrix expands the manifest into
//! one planned check per (reader, corpus) pair.
//!
//! Rules are applied in listed order to the reader's row, which starts out
//! fully compatible:
//!
//! - `> V` marks every version after `V` incompatible.
//! - `< V` marks every version before `V` incompatible.
//! - `+ V` marks `V` compatible again.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CompatError, Result};

/// The on-disk compatibility manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Every version, oldest first.
    pub all_versions: Vec<String>,
    /// Incompatibility rules keyed by reader version.
    #[serde(default, alias = "not_compatbile")]
    pub not_compatible: BTreeMap<String, Vec<String>>,
}

impl Manifest {
    /// Parse a manifest from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| CompatError::config(format!("invalid manifest: {e}")))
    }

    /// Load a manifest from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            CompatError::config(format!("cannot read manifest {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }
}

/// One compatibility rule from a manifest row.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Rule {
    After(usize),
    Before(usize),
    Allow(usize),
}

/// How the reader relates to the corpus it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// The reader is newer than the corpus.
    Upgrade,
    /// The reader is older than the corpus.
    Downgrade,
    /// The reader reads its own corpus.
    SelfRead,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upgrade => f.pad("UPGRADE"),
            Direction::Downgrade => f.pad("DOWNGRADE"),
            Direction::SelfRead => f.pad("SELF"),
        }
    }
}

/// A single reader/corpus pairing and the outcome it should have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedCheck {
    pub reader_version: String,
    pub corpus_version: String,
    pub direction: Direction,
    pub expect_compatible: bool,
}

impl fmt::Display for PlannedCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = if self.expect_compatible {
            "compat"
        } else {
            "INCOMPAT"
        };
        write!(
            f,
            "{:<9} {:<8} {} reads corpus/{}",
            self.direction, outcome, self.reader_version, self.corpus_version
        )
    }
}

/// A square table of reader-by-corpus compatibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatMatrix {
    versions: Vec<String>,
    table: Vec<Vec<bool>>,
}

impl CompatMatrix {
    /// Build the matrix, rejecting unknown versions and indicators.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self> {
        let versions = manifest.all_versions.clone();
        for (i, version) in versions.iter().enumerate() {
            if versions[..i].contains(version) {
                return Err(CompatError::config(format!(
                    "version {version} listed more than once"
                )));
            }
        }

        let n = versions.len();
        let mut matrix = CompatMatrix {
            table: vec![vec![true; n]; n],
            versions,
        };

        for (reader, rules) in &manifest.not_compatible {
            let row = matrix.index_of(reader)?;
            for rule in rules {
                match matrix.parse_rule(rule)? {
                    Rule::After(v) => matrix.table[row][v + 1..].fill(false),
                    Rule::Before(v) => matrix.table[row][..v].fill(false),
                    Rule::Allow(v) => matrix.table[row][v] = true,
                }
            }

            if !matrix.table[row][row] {
                return Err(CompatError::config(format!(
                    "version {reader} is not self-compatible"
                )));
            }
        }

        Ok(matrix)
    }

    /// All versions, oldest first.
    pub fn versions(&self) -> &[String] {
        &self.versions
    }

    /// Whether `reader` is expected to read a corpus written by `corpus`.
    ///
    /// Unknown versions are never compatible.
    pub fn is_compatible(&self, reader: &str, corpus: &str) -> bool {
        match (self.position(reader), self.position(corpus)) {
            (Some(i), Some(j)) => self.table[i][j],
            _ => false,
        }
    }

    /// Expand the matrix into one check per ordered version pair.
    pub fn plan(&self) -> Vec<PlannedCheck> {
        let mut checks = Vec::with_capacity(self.versions.len() * self.versions.len());

        for (i, row) in self.table.iter().enumerate() {
            for (j, &expect_compatible) in row.iter().enumerate() {
                let direction = match j.cmp(&i) {
                    std::cmp::Ordering::Less => Direction::Upgrade,
                    std::cmp::Ordering::Greater => Direction::Downgrade,
                    std::cmp::Ordering::Equal => Direction::SelfRead,
                };

                checks.push(PlannedCheck {
                    reader_version: self.versions[i].clone(),
                    corpus_version: self.versions[j].clone(),
                    direction,
                    expect_compatible,
                });
            }
        }

        checks
    }

    fn position(&self, version: &str) -> Option<usize> {
        self.versions.iter().position(|v| v == version)
    }

    fn index_of(&self, version: &str) -> Result<usize> {
        self.position(version)
            .ok_or_else(|| CompatError::config(format!("unknown version {version}")))
    }

    fn parse_rule(&self, rule: &str) -> Result<Rule> {
        let rule = rule.trim();
        let mut chars = rule.chars();
        let indicator = chars
            .next()
            .ok_or_else(|| CompatError::config("empty compatibility rule"))?;
        let make: fn(usize) -> Rule = match indicator {
            '>' => Rule::After,
            '<' => Rule::Before,
            '+' => Rule::Allow,
            other => {
                return Err(CompatError::config(format!(
                    "unknown indicator `{other}` in rule `{rule}`"
                )));
            }
        };

        Ok(make(self.index_of(chars.as_str().trim())?))
    }
}
