//! Timeline-anchored annotations (dynamics, hairpins, pedal, tempo, ...)
//!
//! Offsets are ticks from the start of the measure that owns the mark. A
//! durational mark that runs past its measure keeps an end offset beyond
//! that measure's length.

use serde::{Deserialize, Serialize};

use super::duration::{ResolvedDuration, Ticks};
use super::pitch::Step;

/// Above or below the staff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placement {
    Above,
    Below,
}

impl Placement {
    pub fn from_musicxml(text: &str) -> Option<Self> {
        match text.trim() {
            "above" => Some(Placement::Above),
            "below" => Some(Placement::Below),
            _ => None,
        }
    }
}

/// Crescendo or diminuendo wedge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HairpinKind {
    Crescendo,
    Diminuendo,
}

/// What a mark says
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarkKind {
    /// Discrete dynamic such as `p`, `mf`, `sfz`
    Dynamic(String),
    /// Tempo indication; any of the parts may be absent
    Tempo {
        text: Option<String>,
        beat_unit: Option<ResolvedDuration>,
        per_minute: Option<f64>,
    },
    /// Free text (`<words>`)
    Text(String),
    /// Rehearsal mark
    Rehearsal(String),
    /// Chord symbol from `<harmony>`
    ChordSymbol { root: Step, alter: i8, kind: String },
    Hairpin(HairpinKind),
    Pedal,
    /// Octave line; `size` is 8, 15 or 22, positive when the music sounds
    /// higher than written (8va), negative below (8vb)
    OctaveLine { size: i8 },
    /// First/second ending bracket
    Volta { number: String, text: Option<String> },
}

impl MarkKind {
    /// Durational kinds carry a start and an end
    pub fn is_durational(&self) -> bool {
        matches!(
            self,
            MarkKind::Hairpin(_)
                | MarkKind::Pedal
                | MarkKind::OctaveLine { .. }
                | MarkKind::Volta { .. }
        )
    }
}

/// Where on the measure timeline a mark applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkExtent {
    Instant { offset: Ticks },
    Span { start: Ticks, end: Ticks },
}

/// A timeline-anchored annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub kind: MarkKind,
    pub extent: MarkExtent,
    pub placement: Option<Placement>,
}

impl Mark {
    pub fn instant(kind: MarkKind, offset: Ticks) -> Self {
        Self {
            kind,
            extent: MarkExtent::Instant { offset },
            placement: None,
        }
    }

    pub fn span(kind: MarkKind, start: Ticks, end: Ticks) -> Self {
        Self {
            kind,
            extent: MarkExtent::Span {
                start,
                end: end.max(start),
            },
            placement: None,
        }
    }

    pub fn with_placement(mut self, placement: Option<Placement>) -> Self {
        self.placement = placement;
        self
    }

    /// Effective offset of an instantaneous mark, start of a span
    pub fn start(&self) -> Ticks {
        match self.extent {
            MarkExtent::Instant { offset } => offset,
            MarkExtent::Span { start, .. } => start,
        }
    }

    /// End of a span; instantaneous marks end where they start
    pub fn end(&self) -> Ticks {
        match self.extent {
            MarkExtent::Instant { offset } => offset,
            MarkExtent::Span { end, .. } => end,
        }
    }

    pub fn is_durational(&self) -> bool {
        matches!(self.extent, MarkExtent::Span { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_end_never_precedes_start() {
        let mark = Mark::span(MarkKind::Pedal, 100, 50);
        assert_eq!(mark.start(), 100);
        assert_eq!(mark.end(), 100);
        assert!(mark.is_durational());
    }

    #[test]
    fn test_instant_offsets() {
        let mark = Mark::instant(MarkKind::Dynamic("mf".to_string()), 42)
            .with_placement(Some(Placement::Below));
        assert_eq!(mark.start(), 42);
        assert_eq!(mark.end(), 42);
        assert!(!mark.kind.is_durational());
        assert_eq!(mark.placement, Some(Placement::Below));
    }
}
