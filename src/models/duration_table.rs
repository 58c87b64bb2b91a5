//! Duration engine: canonical lookup between scalar values and triples
//!
//! The table maps every value reachable from a registered tuplet ratio,
//! a dot count and a base duration to one canonical triple. It is filled by
//! walking ratios (outer), dots (middle) and bases (inner), each in reverse
//! declaration order; a later triple replaces an earlier one with the same
//! rounded value. The net effect is that regular ratios beat tuplets and
//! fewer dots beat more dots.
//!
//! The table is built once per process on first use and never mutated
//! afterwards.

use num_rational::Rational64;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound;

use super::duration::{BaseDuration, Dots, DurationKey, ResolvedDuration, TupletName};

static TABLE: Lazy<DurationTable> = Lazy::new(DurationTable::build);

/// Outcome of resolving a scalar value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Resolution {
    /// The value has this exact canonical form
    Exact(ResolvedDuration),

    /// No exact form; `nearest` is the closest table entry
    Approximate {
        requested: Rational64,
        nearest: ResolvedDuration,
    },
}

impl Resolution {
    /// The resolved duration, exact or substituted
    pub fn duration(&self) -> ResolvedDuration {
        match self {
            Resolution::Exact(duration) => *duration,
            Resolution::Approximate { nearest, .. } => *nearest,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Resolution::Exact(_))
    }
}

/// Rounded value → canonical triple
#[derive(Debug)]
pub struct DurationTable {
    entries: BTreeMap<DurationKey, ResolvedDuration>,
}

impl DurationTable {
    /// The process-wide table
    pub fn global() -> &'static DurationTable {
        &TABLE
    }

    fn build() -> Self {
        let mut entries = BTreeMap::new();

        for name in TupletName::REGISTRY.iter().rev() {
            let Some(ratio) = name.ratio() else { continue };
            for dots in Dots::ALL.iter().rev() {
                for base in BaseDuration::ALL.iter().rev() {
                    let duration = ResolvedDuration::new(*base, *dots, ratio);
                    entries.insert(duration.key(), duration);
                }
            }
        }

        log::debug!("Built duration table with {} canonical entries", entries.len());
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical entries in ascending value order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&DurationKey, &ResolvedDuration)> {
        self.entries.iter()
    }

    /// True iff the rounded value is a table key
    pub fn contains(&self, value: Rational64) -> bool {
        self.entries.contains_key(&DurationKey::from_scalar(value))
    }

    /// Resolve a value to its canonical triple.
    ///
    /// Without an exact match the entry at minimum key distance is returned.
    /// When two entries are equally distant the shorter one wins.
    pub fn lookup(&self, value: Rational64) -> Resolution {
        let key = DurationKey::from_scalar(value);
        if let Some(duration) = self.entries.get(&key) {
            return Resolution::Exact(*duration);
        }

        let below = self.entries.range(..key).next_back();
        let above = self
            .entries
            .range((Bound::Excluded(key), Bound::Unbounded))
            .next();

        let nearest = match (below, above) {
            (Some((low_key, low)), Some((high_key, high))) => {
                if key.distance(*high_key) < key.distance(*low_key) {
                    *high
                } else {
                    *low
                }
            }
            (Some((_, low)), None) => *low,
            (None, Some((_, high))) => *high,
            // the table is never empty
            (None, None) => ResolvedDuration::plain(BaseDuration::Quarter),
        };

        log::debug!(
            "No exact duration for {}; substituting {}",
            value,
            nearest
        );
        Resolution::Approximate {
            requested: value,
            nearest,
        }
    }
}
