//! Split levels and split sets.
//!
//! A `SplitLevel` names one clause component maintained by the splitter.
//! Even levels name positive ground literals and non-ground components;
//! odd levels name negations of ground components. A clause's `SplitSet`
//! records the levels its derivation depends on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a clause component (see `splitter`)
pub type SplitLevel = u32;

/// A sorted, duplicate-free set of split levels.
///
/// Kept canonical so that equal sets compare equal structurally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SplitSet(Vec<SplitLevel>);

impl SplitSet {
    /// The empty split set
    pub fn empty() -> Self {
        SplitSet(Vec::new())
    }

    /// A set containing a single level
    pub fn singleton(level: SplitLevel) -> Self {
        SplitSet(vec![level])
    }

    /// Build a set from an arbitrary list of levels
    pub fn from_levels(mut levels: Vec<SplitLevel>) -> Self {
        levels.sort_unstable();
        levels.dedup();
        SplitSet(levels)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, level: SplitLevel) -> bool {
        self.0.binary_search(&level).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = SplitLevel> + '_ {
        self.0.iter().copied()
    }

    /// Union of two sets
    pub fn union(&self, other: &SplitSet) -> SplitSet {
        let mut merged = Vec::with_capacity(self.0.len() + other.0.len());
        let (mut i, mut j) = (0, 0);
        while i < self.0.len() && j < other.0.len() {
            match self.0[i].cmp(&other.0[j]) {
                std::cmp::Ordering::Less => {
                    merged.push(self.0[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    merged.push(other.0[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    merged.push(self.0[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&self.0[i..]);
        merged.extend_from_slice(&other.0[j..]);
        SplitSet(merged)
    }

    /// True if every level of `self` satisfies `pred`
    pub fn all(&self, mut pred: impl FnMut(SplitLevel) -> bool) -> bool {
        self.0.iter().all(|&l| pred(l))
    }
}

impl fmt::Display for SplitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, l) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", l)?;
        }
        write!(f, "}}")
    }
}
