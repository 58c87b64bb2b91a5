//! Duration algebra: base durations, augmentation dots and tuplet ratios
//!
//! A symbolic duration is the triple `(base, dots, ratio)`. Its scalar value,
//! measured in whole notes, is
//!
//! ```text
//! base × (2 − 2⁻ᵈᵒᵗˢ) × normal / actual
//! ```
//!
//! Several triples can alias one scalar (a sextuplet eighth and a triplet
//! eighth have the same length), so equality and ordering of
//! [`ResolvedDuration`] are defined on the scalar rounded to
//! [`KEY_PRECISION`] decimal digits, never on the triple itself.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Mul, Sub};

use super::duration_table::{DurationTable, Resolution};
use super::errors::ModelError;

/// Position or length on the fixed-denominator timeline
pub type Ticks = i64;

/// Ticks in one whole note.
///
/// 2¹⁸ covers the shortest base duration with four dots under a 3/4 or
/// 3/2 tuplet factor; 315 = 5·7·9 covers every other registered tuplet
/// divisor, so each canonical duration is an integer number of ticks.
pub const TICKS_PER_WHOLE: Ticks = 262_144 * 315;

/// Decimal digits kept when comparing durations
pub const KEY_PRECISION: u32 = 10;

// ============================================================================
// BASE DURATION
// ============================================================================

/// Undotted, untupleted note value, from maxima down to the 4096th note.
/// Each variant is exactly double the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseDuration {
    Maxima,
    Longa,
    Breve,
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    SixtyFourth,
    OneHundredTwentyEighth,
    TwoHundredFiftySixth,
    FiveHundredTwelfth,
    OneThousandTwentyFourth,
    TwoThousandFortyEighth,
    FourThousandNinetySixth,
}

impl BaseDuration {
    /// All base durations in declaration order (longest first)
    pub const ALL: [BaseDuration; 16] = [
        BaseDuration::Maxima,
        BaseDuration::Longa,
        BaseDuration::Breve,
        BaseDuration::Whole,
        BaseDuration::Half,
        BaseDuration::Quarter,
        BaseDuration::Eighth,
        BaseDuration::Sixteenth,
        BaseDuration::ThirtySecond,
        BaseDuration::SixtyFourth,
        BaseDuration::OneHundredTwentyEighth,
        BaseDuration::TwoHundredFiftySixth,
        BaseDuration::FiveHundredTwelfth,
        BaseDuration::OneThousandTwentyFourth,
        BaseDuration::TwoThousandFortyEighth,
        BaseDuration::FourThousandNinetySixth,
    ];

    /// Power of two relative to a whole note (maxima = 3, whole = 0, quarter = -2)
    pub const fn exponent(self) -> i32 {
        match self {
            BaseDuration::Maxima => 3,
            BaseDuration::Longa => 2,
            BaseDuration::Breve => 1,
            BaseDuration::Whole => 0,
            BaseDuration::Half => -1,
            BaseDuration::Quarter => -2,
            BaseDuration::Eighth => -3,
            BaseDuration::Sixteenth => -4,
            BaseDuration::ThirtySecond => -5,
            BaseDuration::SixtyFourth => -6,
            BaseDuration::OneHundredTwentyEighth => -7,
            BaseDuration::TwoHundredFiftySixth => -8,
            BaseDuration::FiveHundredTwelfth => -9,
            BaseDuration::OneThousandTwentyFourth => -10,
            BaseDuration::TwoThousandFortyEighth => -11,
            BaseDuration::FourThousandNinetySixth => -12,
        }
    }

    /// Length in whole notes
    pub fn value(self) -> Rational64 {
        let exponent = self.exponent();
        if exponent >= 0 {
            Rational64::from_integer(1 << exponent)
        } else {
            Rational64::new(1, 1 << (-exponent))
        }
    }

    /// MusicXML `<type>` name
    pub const fn musicxml_name(self) -> &'static str {
        match self {
            BaseDuration::Maxima => "maxima",
            BaseDuration::Longa => "long",
            BaseDuration::Breve => "breve",
            BaseDuration::Whole => "whole",
            BaseDuration::Half => "half",
            BaseDuration::Quarter => "quarter",
            BaseDuration::Eighth => "eighth",
            BaseDuration::Sixteenth => "16th",
            BaseDuration::ThirtySecond => "32nd",
            BaseDuration::SixtyFourth => "64th",
            BaseDuration::OneHundredTwentyEighth => "128th",
            BaseDuration::TwoHundredFiftySixth => "256th",
            BaseDuration::FiveHundredTwelfth => "512th",
            BaseDuration::OneThousandTwentyFourth => "1024th",
            BaseDuration::TwoThousandFortyEighth => "2048th",
            BaseDuration::FourThousandNinetySixth => "4096th",
        }
    }

    /// Parse a MusicXML `<type>` name
    pub fn from_musicxml(name: &str) -> Option<Self> {
        match name.trim() {
            "longa" => Some(BaseDuration::Longa),
            other => Self::ALL
                .iter()
                .copied()
                .find(|base| base.musicxml_name() == other),
        }
    }

    /// Glyph name used to draw a note head (and flag) of this value
    pub const fn note_glyph(self) -> &'static str {
        match self {
            BaseDuration::Maxima => "mensuralWhiteMaxima",
            BaseDuration::Longa => "mensuralWhiteLonga",
            BaseDuration::Breve => "noteDoubleWhole",
            BaseDuration::Whole => "noteWhole",
            BaseDuration::Half => "noteHalfUp",
            BaseDuration::Quarter => "noteQuarterUp",
            BaseDuration::Eighth => "note8thUp",
            BaseDuration::Sixteenth => "note16thUp",
            BaseDuration::ThirtySecond => "note32ndUp",
            BaseDuration::SixtyFourth => "note64thUp",
            BaseDuration::OneHundredTwentyEighth => "note128thUp",
            BaseDuration::TwoHundredFiftySixth => "note256thUp",
            BaseDuration::FiveHundredTwelfth => "note512thUp",
            BaseDuration::OneThousandTwentyFourth => "note1024thUp",
            BaseDuration::TwoThousandFortyEighth => "note2048thUp",
            BaseDuration::FourThousandNinetySixth => "note4096thUp",
        }
    }

    /// Glyph name used to draw a rest of this value
    pub const fn rest_glyph(self) -> &'static str {
        match self {
            BaseDuration::Maxima => "restMaxima",
            BaseDuration::Longa => "restLonga",
            BaseDuration::Breve => "restDoubleWhole",
            BaseDuration::Whole => "restWhole",
            BaseDuration::Half => "restHalf",
            BaseDuration::Quarter => "restQuarter",
            BaseDuration::Eighth => "rest8th",
            BaseDuration::Sixteenth => "rest16th",
            BaseDuration::ThirtySecond => "rest32nd",
            BaseDuration::SixtyFourth => "rest64th",
            BaseDuration::OneHundredTwentyEighth => "rest128th",
            BaseDuration::TwoHundredFiftySixth => "rest256th",
            BaseDuration::FiveHundredTwelfth => "rest512th",
            BaseDuration::OneThousandTwentyFourth => "rest1024th",
            BaseDuration::TwoThousandFortyEighth => "rest2048th",
            BaseDuration::FourThousandNinetySixth => "rest4096th",
        }
    }
}

// ============================================================================
// DOTS
// ============================================================================

/// Augmentation dots, zero to four
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dots {
    #[default]
    Zero,
    One,
    Two,
    Three,
    Four,
}

impl Dots {
    pub const ALL: [Dots; 5] = [Dots::Zero, Dots::One, Dots::Two, Dots::Three, Dots::Four];

    /// Dots from a count; more than four is rejected
    pub fn from_count(count: usize) -> Result<Self, ModelError> {
        Self::ALL
            .get(count)
            .copied()
            .ok_or(ModelError::InvalidDots(count))
    }

    pub const fn count(self) -> u32 {
        match self {
            Dots::Zero => 0,
            Dots::One => 1,
            Dots::Two => 2,
            Dots::Three => 3,
            Dots::Four => 4,
        }
    }

    /// Length multiplier, 2 − 2⁻ⁿ
    pub fn scalar(self) -> Rational64 {
        let n = self.count();
        Rational64::new((1 << (n + 1)) - 1, 1 << n)
    }
}

// ============================================================================
// TUPLET RATIO
// ============================================================================

/// Named tuplets. Declaration order is significant: the canonical lookup
/// table is filled walking this registry backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TupletName {
    Regular,
    Duplet,
    Triplet,
    Quadruplet,
    Quintuplet,
    Sextuplet,
    Septuplet,
    Octuplet,
    Nonuplet,
    Custom,
}

impl TupletName {
    /// Every registered name (Custom is not a registry entry)
    pub const REGISTRY: [TupletName; 9] = [
        TupletName::Regular,
        TupletName::Duplet,
        TupletName::Triplet,
        TupletName::Quadruplet,
        TupletName::Quintuplet,
        TupletName::Sextuplet,
        TupletName::Septuplet,
        TupletName::Octuplet,
        TupletName::Nonuplet,
    ];

    /// `(actual, normal)` for registered names
    pub const fn terms(self) -> Option<(u32, u32)> {
        match self {
            TupletName::Regular => Some((1, 1)),
            TupletName::Duplet => Some((2, 3)),
            TupletName::Triplet => Some((3, 2)),
            TupletName::Quadruplet => Some((4, 3)),
            TupletName::Quintuplet => Some((5, 4)),
            TupletName::Sextuplet => Some((6, 4)),
            TupletName::Septuplet => Some((7, 4)),
            TupletName::Octuplet => Some((8, 6)),
            TupletName::Nonuplet => Some((9, 8)),
            TupletName::Custom => None,
        }
    }

    /// The registered ratio, if any
    pub const fn ratio(self) -> Option<Ratio> {
        match self.terms() {
            Some((actual, normal)) => Some(Ratio { actual, normal }),
            None => None,
        }
    }
}

/// `actual` notes played in the time of `normal` notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ratio {
    actual: u32,
    normal: u32,
}

impl Ratio {
    pub const REGULAR: Ratio = Ratio { actual: 1, normal: 1 };

    pub fn new(actual: u32, normal: u32) -> Result<Self, ModelError> {
        if actual == 0 || normal == 0 {
            return Err(ModelError::InvalidRatio { actual, normal });
        }
        Ok(Self { actual, normal })
    }

    /// Ratio of a registered tuplet name; Custom has none
    pub fn named(name: TupletName) -> Option<Self> {
        name.ratio()
    }

    pub fn actual(self) -> u32 {
        self.actual
    }

    pub fn normal(self) -> u32 {
        self.normal
    }

    /// Length multiplier, normal / actual
    pub fn multiplier(self) -> Rational64 {
        Rational64::new(self.normal as i64, self.actual as i64)
    }

    /// True only for 1:1
    pub fn is_regular(self) -> bool {
        self.actual == 1 && self.normal == 1
    }

    /// Registry name matching both terms exactly, or Custom
    pub fn name(self) -> TupletName {
        TupletName::REGISTRY
            .iter()
            .copied()
            .find(|name| name.terms() == Some((self.actual, self.normal)))
            .unwrap_or(TupletName::Custom)
    }
}

impl Default for Ratio {
    fn default() -> Self {
        Ratio::REGULAR
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.actual, self.normal)
    }
}

// ============================================================================
// RESOLVED DURATION
// ============================================================================

/// Scalar value of a triple, in whole notes
pub fn scalar_of(base: BaseDuration, dots: Dots, ratio: Ratio) -> Rational64 {
    base.value() * dots.scalar() * ratio.multiplier()
}

/// A duration value rounded to [`KEY_PRECISION`] decimal digits.
/// Lookup table key and the basis of duration equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DurationKey(i64);

impl DurationKey {
    pub fn from_scalar(value: Rational64) -> Self {
        let scale = 10_i128.pow(KEY_PRECISION);
        let numer = *value.numer() as i128 * scale;
        let denom = *value.denom() as i128;
        // round half away from zero
        let rounded = if numer >= 0 {
            (2 * numer + denom) / (2 * denom)
        } else {
            -((-2 * numer + denom) / (2 * denom))
        };
        DurationKey(i64::try_from(rounded).unwrap_or(if rounded < 0 { i64::MIN } else { i64::MAX }))
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// Absolute difference between two keys
    pub fn distance(self, other: DurationKey) -> u64 {
        self.0.abs_diff(other.0)
    }
}

/// Canonical symbolic duration: base value, dots and tuplet ratio
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResolvedDuration {
    pub base: BaseDuration,
    pub dots: Dots,
    pub ratio: Ratio,
}

impl ResolvedDuration {
    /// Exact construction from explicit symbolic parts
    pub fn new(base: BaseDuration, dots: Dots, ratio: Ratio) -> Self {
        Self { base, dots, ratio }
    }

    /// Undotted, regular duration
    pub fn plain(base: BaseDuration) -> Self {
        Self::new(base, Dots::Zero, Ratio::REGULAR)
    }

    /// Canonical triple for a value, approximated if no exact form exists
    pub fn resolve(value: Rational64) -> Resolution {
        DurationTable::global().lookup(value)
    }

    /// Same as [`resolve`](Self::resolve) for a floating point value
    pub fn resolve_f64(value: f64) -> Result<Resolution, ModelError> {
        let rational = Rational64::approximate_float(value)
            .filter(|_| value.is_finite())
            .ok_or(ModelError::NonFiniteDuration(value))?;
        Ok(Self::resolve(rational))
    }

    /// True iff `value` has an exact symbolic form
    pub fn exists(value: Rational64) -> bool {
        DurationTable::global().contains(value)
    }

    /// Length in whole notes
    pub fn scalar(&self) -> Rational64 {
        scalar_of(self.base, self.dots, self.ratio)
    }

    /// Length on the fixed-denominator timeline, rounded for custom ratios
    pub fn ticks(&self) -> Ticks {
        ticks_of(self.scalar())
    }

    pub fn key(&self) -> DurationKey {
        DurationKey::from_scalar(self.scalar())
    }

    /// Scalar as a float, for display and debugging
    pub fn to_f64(&self) -> f64 {
        let scalar = self.scalar();
        *scalar.numer() as f64 / *scalar.denom() as f64
    }
}

/// Round a whole-note value onto the tick timeline, saturating at the
/// bounds of [`Ticks`]
pub fn ticks_of(value: Rational64) -> Ticks {
    checked_ticks(value).unwrap_or(if value < Rational64::from_integer(0) {
        Ticks::MIN
    } else {
        Ticks::MAX
    })
}

/// Round a whole-note value onto the tick timeline; None if it does not fit
pub fn checked_ticks(value: Rational64) -> Option<Ticks> {
    let numer = *value.numer() as i128 * TICKS_PER_WHOLE as i128;
    let denom = *value.denom() as i128;
    // round half away from zero
    let rounded = if numer >= 0 {
        (2 * numer + denom) / (2 * denom)
    } else {
        -((-2 * numer + denom) / (2 * denom))
    };
    Ticks::try_from(rounded).ok()
}

impl PartialEq for ResolvedDuration {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ResolvedDuration {}

impl Hash for ResolvedDuration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for ResolvedDuration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ResolvedDuration {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialEq<Rational64> for ResolvedDuration {
    fn eq(&self, other: &Rational64) -> bool {
        self.key() == DurationKey::from_scalar(*other)
    }
}

impl PartialOrd<Rational64> for ResolvedDuration {
    fn partial_cmp(&self, other: &Rational64) -> Option<Ordering> {
        Some(self.key().cmp(&DurationKey::from_scalar(*other)))
    }
}

impl Add for ResolvedDuration {
    type Output = Resolution;

    fn add(self, rhs: Self) -> Resolution {
        ResolvedDuration::resolve(self.scalar() + rhs.scalar())
    }
}

impl Add<Rational64> for ResolvedDuration {
    type Output = Resolution;

    fn add(self, rhs: Rational64) -> Resolution {
        ResolvedDuration::resolve(self.scalar() + rhs)
    }
}

impl Sub for ResolvedDuration {
    type Output = Resolution;

    fn sub(self, rhs: Self) -> Resolution {
        ResolvedDuration::resolve(self.scalar() - rhs.scalar())
    }
}

impl Sub<Rational64> for ResolvedDuration {
    type Output = Resolution;

    fn sub(self, rhs: Rational64) -> Resolution {
        ResolvedDuration::resolve(self.scalar() - rhs)
    }
}

impl Mul<Rational64> for ResolvedDuration {
    type Output = Resolution;

    fn mul(self, rhs: Rational64) -> Resolution {
        ResolvedDuration::resolve(self.scalar() * rhs)
    }
}

impl fmt::Display for ResolvedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base.musicxml_name())?;
        for _ in 0..self.dots.count() {
            write!(f, ".")?;
        }
        if !self.ratio.is_regular() {
            write!(f, " ({})", self.ratio)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_durations_halve() {
        for pair in BaseDuration::ALL.windows(2) {
            assert_eq!(pair[0].value(), pair[1].value() * Rational64::from_integer(2));
        }
        assert_eq!(BaseDuration::Whole.value(), Rational64::from_integer(1));
    }

    #[test]
    fn test_glyphs_are_distinct() {
        let mut notes: Vec<_> = BaseDuration::ALL.iter().map(|b| b.note_glyph()).collect();
        let mut rests: Vec<_> = BaseDuration::ALL.iter().map(|b| b.rest_glyph()).collect();
        notes.sort();
        notes.dedup();
        rests.sort();
        rests.dedup();
        assert_eq!(notes.len(), 16);
        assert_eq!(rests.len(), 16);
    }

    #[test]
    fn test_dot_scalars() {
        let expected = [(1, 1), (3, 2), (7, 4), (15, 8), (31, 16)];
        for (dots, (n, d)) in Dots::ALL.iter().zip(expected) {
            assert_eq!(dots.scalar(), Rational64::new(n, d));
        }
        assert!(Dots::from_count(5).is_err());
    }

    #[test]
    fn test_ratio_names() {
        assert!(Ratio::REGULAR.is_regular());
        let triplet = Ratio::new(3, 2).unwrap();
        assert!(!triplet.is_regular());
        assert_eq!(triplet.name(), TupletName::Triplet);
        assert_eq!(Ratio::new(11, 8).unwrap().name(), TupletName::Custom);
        assert!(Ratio::new(0, 2).is_err());
    }

    #[test]
    fn test_every_canonical_value_is_whole_ticks() {
        for name in TupletName::REGISTRY {
            for dots in Dots::ALL {
                for base in BaseDuration::ALL {
                    let scalar = scalar_of(base, dots, name.ratio().unwrap());
                    let ticks = scalar * Rational64::from_integer(TICKS_PER_WHOLE);
                    assert!(ticks.is_integer(), "{:?} {:?} {:?}", base, dots, name);
                }
            }
        }
    }

    #[test]
    fn test_equality_is_by_scalar() {
        let sextuplet = ResolvedDuration::new(
            BaseDuration::Eighth,
            Dots::Zero,
            Ratio::new(6, 4).unwrap(),
        );
        let triplet = ResolvedDuration::new(
            BaseDuration::Eighth,
            Dots::Zero,
            Ratio::new(3, 2).unwrap(),
        );
        assert_eq!(sextuplet, triplet);
        assert_eq!(triplet, Rational64::new(1, 12));
        assert!(triplet < ResolvedDuration::plain(BaseDuration::Eighth));
    }

    #[test]
    fn test_arithmetic_re_resolves() {
        let quarter = ResolvedDuration::plain(BaseDuration::Quarter);
        let eighth = ResolvedDuration::plain(BaseDuration::Eighth);

        let sum = (quarter + eighth).duration();
        assert_eq!(sum.base, BaseDuration::Quarter);
        assert_eq!(sum.dots, Dots::One);

        let doubled = (quarter * Rational64::from_integer(2)).duration();
        assert_eq!(doubled.base, BaseDuration::Half);

        assert!((quarter - eighth).is_exact());
    }

    #[test]
    fn test_resolve_f64_rejects_nan() {
        assert!(ResolvedDuration::resolve_f64(f64::NAN).is_err());
        assert!(ResolvedDuration::resolve_f64(f64::INFINITY).is_err());
        let half = ResolvedDuration::resolve_f64(0.5).unwrap();
        assert_eq!(half.duration().base, BaseDuration::Half);
    }

    #[test]
    fn test_key_rounding() {
        assert_eq!(DurationKey::from_scalar(Rational64::new(1, 3)).get(), 3_333_333_333);
        assert_eq!(DurationKey::from_scalar(Rational64::new(2, 3)).get(), 6_666_666_667);
        assert_eq!(DurationKey::from_scalar(Rational64::new(-1, 4)).get(), -2_500_000_000);
    }

    #[test]
    fn test_huge_values_stay_in_range() {
        let huge = Rational64::from_integer(i64::MAX / 4);
        assert_eq!(checked_ticks(huge), None);
        assert_eq!(ticks_of(huge), Ticks::MAX);
        assert_eq!(ticks_of(-huge), Ticks::MIN);
        assert_eq!(DurationKey::from_scalar(huge).get(), i64::MAX);
        assert_eq!(checked_ticks(Rational64::new(1, 4)), Some(TICKS_PER_WHOLE / 4));
    }
}
