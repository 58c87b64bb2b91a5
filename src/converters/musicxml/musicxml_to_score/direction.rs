//! Timeline annotations: `<direction>`, `<harmony>`, `<sound>`, `<barline>`
//!
//! Instantaneous marks anchor at the measure cursor. Durational marks
//! (wedges, pedals, octave shifts, endings) are opened and closed through a
//! part-level [`SpanTracker`], since they often cross barlines.

use log::debug;
use roxmltree::Node;
use std::collections::BTreeMap;

use super::context::ConversionContext;
use super::errors::ImportError;
use super::measure::MeasureBuilder;
use super::parser::{element_children, get_child, get_child_text, get_children, get_text, parse_child};
use super::types::DiagnosticKind;
use crate::models::{
    BarlineLocation, BarlineType, Barline, BaseDuration, Dots, HairpinKind, Mark, MarkKind,
    Placement, Ratio, ResolvedDuration, Step, Ticks,
};

// ============================================================================
// SPANS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum SpanFamily {
    Hairpin,
    Pedal,
    OctaveLine,
    Volta,
}

#[derive(Debug, Clone)]
struct OpenSpan {
    kind: MarkKind,
    placement: Option<Placement>,
    staff: usize,
    measure_index: usize,
    /// Part-timeline position of the owning measure's start
    measure_start: Ticks,
    /// Offset within the owning measure
    start: Ticks,
}

/// A finished span, addressed to the measure it starts in
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedSpan {
    pub mark: Mark,
    pub staff: usize,
    pub measure_index: usize,
}

/// Spans opened but not yet stopped, keyed by family and number
#[derive(Debug, Default)]
pub struct SpanTracker {
    open: BTreeMap<(SpanFamily, String), OpenSpan>,
}

impl SpanTracker {
    fn open(
        &mut self,
        family: SpanFamily,
        number: &str,
        span: OpenSpan,
        builder: &mut MeasureBuilder,
    ) {
        let position = builder.position();
        if let Some(previous) = self.open.insert((family, number.to_string()), span) {
            debug!("{:?} {} restarted before it was stopped", family, number);
            builder.deliver(close_span(previous, position));
        }
    }

    fn close(&mut self, family: SpanFamily, number: &str, builder: &mut MeasureBuilder, at: Ticks) {
        match self.open.remove(&(family, number.to_string())) {
            Some(span) => builder.deliver(close_span(span, builder.start + at)),
            None => debug!("Stop for {:?} {} that was never started", family, number),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Close every open span at part-timeline position `end`
    pub fn drain(&mut self, end: Ticks) -> Vec<ClosedSpan> {
        std::mem::take(&mut self.open)
            .into_values()
            .map(|span| close_span(span, end))
            .collect()
    }
}

fn close_span(span: OpenSpan, absolute_end: Ticks) -> ClosedSpan {
    let end = absolute_end - span.measure_start;
    ClosedSpan {
        mark: Mark::span(span.kind, span.start, end).with_placement(span.placement),
        staff: span.staff,
        measure_index: span.measure_index,
    }
}

fn open_span(
    kind: MarkKind,
    placement: Option<Placement>,
    staff: usize,
    at: Ticks,
    builder: &MeasureBuilder,
) -> OpenSpan {
    OpenSpan {
        kind,
        placement,
        staff,
        measure_index: builder.index,
        measure_start: builder.start,
        start: at,
    }
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// 0-based staff from a `<staff>` child
fn staff_of(node: Node, context: &ConversionContext) -> Result<usize, ImportError> {
    match parse_child::<u32>(node, "staff", || context.location(node))? {
        None => Ok(0),
        Some(staff) if staff > 0 => Ok(staff as usize - 1),
        Some(staff) => Err(context.invalid_value(node, staff.to_string())),
    }
}

/// Anchor position: the cursor moved by an optional `<offset>`
fn anchor_of(node: Node, context: &ConversionContext, builder: &MeasureBuilder) -> Result<Ticks, ImportError> {
    let offset: i64 = parse_child(node, "offset", || context.location(node))?.unwrap_or(0);
    let shift = context.ticks(get_child(node, "offset").unwrap_or(node), offset)?;
    Ok(builder.cursor.saturating_add(shift).max(0))
}

fn tempo_from_sound(sound: Node, context: &mut ConversionContext) -> Option<MarkKind> {
    let text = sound.attribute("tempo")?;
    match text.trim().parse::<f64>() {
        Ok(per_minute) => Some(MarkKind::Tempo {
            text: None,
            beat_unit: Some(ResolvedDuration::plain(BaseDuration::Quarter)),
            per_minute: Some(per_minute),
        }),
        Err(_) => {
            context.add_diagnostic(
                DiagnosticKind::UnsupportedAttribute,
                sound,
                format!("Unreadable sound tempo '{}'", text),
            );
            None
        }
    }
}

// ============================================================================
// DIRECTION
// ============================================================================

/// Convert a `<direction>` into marks
pub fn convert_direction(
    node: Node,
    context: &mut ConversionContext,
    builder: &mut MeasureBuilder,
    spans: &mut SpanTracker,
) -> Result<(), ImportError> {
    let placement = node.attribute("placement").and_then(Placement::from_musicxml);
    let staff = staff_of(node, context)?;
    let at = anchor_of(node, context, builder)?;
    let mut has_tempo = false;

    for direction_type in get_children(node, "direction-type") {
        for child in element_children(direction_type) {
            let number = child.attribute("number").unwrap_or("1");
            match child.tag_name().name() {
                "words" => {
                    if let Some(text) = get_text(child) {
                        builder.add_mark(staff, Mark::instant(MarkKind::Text(text), at).with_placement(placement));
                    }
                }
                "rehearsal" => {
                    if let Some(text) = get_text(child) {
                        builder.add_mark(
                            staff,
                            Mark::instant(MarkKind::Rehearsal(text), at).with_placement(placement),
                        );
                    }
                }
                "dynamics" => {
                    for dynamic in element_children(child) {
                        let name = match dynamic.tag_name().name() {
                            "other-dynamics" => get_text(dynamic),
                            name => Some(name.to_string()),
                        };
                        if let Some(name) = name {
                            builder.add_mark(
                                staff,
                                Mark::instant(MarkKind::Dynamic(name), at).with_placement(placement),
                            );
                        }
                    }
                }
                "metronome" => {
                    let tempo = parse_metronome(child, context);
                    builder.add_mark(staff, Mark::instant(tempo, at).with_placement(placement));
                    has_tempo = true;
                }
                "wedge" => match child.attribute("type") {
                    Some("crescendo") | Some("diminuendo") => {
                        let kind = if child.attribute("type") == Some("crescendo") {
                            HairpinKind::Crescendo
                        } else {
                            HairpinKind::Diminuendo
                        };
                        let span = open_span(MarkKind::Hairpin(kind), placement, staff, at, builder);
                        spans.open(SpanFamily::Hairpin, number, span, builder);
                    }
                    Some("stop") => spans.close(SpanFamily::Hairpin, number, builder, at),
                    Some("continue") => {}
                    other => return Err(context.invalid_value(child, other.unwrap_or_default())),
                },
                "pedal" => match child.attribute("type") {
                    Some("start") | Some("sostenuto") => {
                        let span = open_span(MarkKind::Pedal, placement, staff, at, builder);
                        spans.open(SpanFamily::Pedal, number, span, builder);
                    }
                    Some("stop") => spans.close(SpanFamily::Pedal, number, builder, at),
                    Some("change") => {
                        spans.close(SpanFamily::Pedal, number, builder, at);
                        let span = open_span(MarkKind::Pedal, placement, staff, at, builder);
                        spans.open(SpanFamily::Pedal, number, span, builder);
                    }
                    Some("continue") | Some("discontinue") | Some("resume") => {}
                    other => return Err(context.invalid_value(child, other.unwrap_or_default())),
                },
                "octave-shift" => {
                    let size: i8 = child
                        .attribute("size")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(8);
                    match child.attribute("type") {
                        // "down" means the music is written lower than it sounds
                        Some("down") | Some("up") => {
                            let size = if child.attribute("type") == Some("down") { size } else { -size };
                            let span = open_span(MarkKind::OctaveLine { size }, placement, staff, at, builder);
                            spans.open(SpanFamily::OctaveLine, number, span, builder);
                        }
                        Some("stop") => spans.close(SpanFamily::OctaveLine, number, builder, at),
                        Some("continue") => {}
                        other => return Err(context.invalid_value(child, other.unwrap_or_default())),
                    }
                }
                other => context.add_diagnostic(
                    DiagnosticKind::IgnoredDirection,
                    child,
                    format!("Direction type <{}> ignored", other),
                ),
            }
        }
    }

    if !has_tempo {
        if let Some(tempo) = get_child(node, "sound").and_then(|sound| tempo_from_sound(sound, context)) {
            builder.add_mark(staff, Mark::instant(tempo, at).with_placement(placement));
        }
    }

    Ok(())
}

fn parse_metronome(node: Node, context: &mut ConversionContext) -> MarkKind {
    let beat_unit = match get_child_text(node, "beat-unit") {
        None => None,
        Some(name) => match BaseDuration::from_musicxml(&name) {
            Some(base) => {
                let dot_count = get_children(node, "beat-unit-dot").count();
                let dots = Dots::from_count(dot_count).unwrap_or(Dots::Zero);
                Some(ResolvedDuration::new(base, dots, Ratio::REGULAR))
            }
            None => {
                context.add_diagnostic(
                    DiagnosticKind::UnsupportedAttribute,
                    node,
                    format!("Unknown beat unit '{}'", name),
                );
                None
            }
        },
    };

    let raw = get_child_text(node, "per-minute");
    let per_minute = raw.as_deref().and_then(|text| text.parse::<f64>().ok());
    // keep unparsable text such as "c. 120" as display text
    let text = raw.filter(|_| per_minute.is_none());

    MarkKind::Tempo {
        text,
        beat_unit,
        per_minute,
    }
}

// ============================================================================
// HARMONY AND SOUND
// ============================================================================

/// Convert a `<harmony>` into a chord-symbol mark
pub fn convert_harmony(
    node: Node,
    context: &mut ConversionContext,
    builder: &mut MeasureBuilder,
) -> Result<(), ImportError> {
    let Some(root) = get_child(node, "root") else {
        context.add_diagnostic(
            DiagnosticKind::IgnoredDirection,
            node,
            "Harmony without a root ignored",
        );
        return Ok(());
    };

    let step_node = get_child(root, "root-step").ok_or_else(|| context.missing(root, "root-step"))?;
    let step_text = get_text(step_node).unwrap_or_default();
    let step = Step::from_musicxml(&step_text)
        .ok_or_else(|| context.invalid_value(step_node, step_text.as_str()))?;
    let alter: f64 = parse_child(root, "root-alter", || context.location(root))?.unwrap_or(0.0);

    let kind = get_child(node, "kind")
        .map(|kind| {
            get_text(kind)
                .or_else(|| kind.attribute("text").map(str::to_string))
                .unwrap_or_default()
        })
        .unwrap_or_default();

    let placement = node.attribute("placement").and_then(Placement::from_musicxml);
    let staff = staff_of(node, context)?;
    let at = anchor_of(node, context, builder)?;
    let mark = Mark::instant(
        MarkKind::ChordSymbol {
            root: step,
            alter: alter.round() as i8,
            kind,
        },
        at,
    );
    builder.add_mark(staff, mark.with_placement(placement));
    Ok(())
}

/// Measure-level `<sound>`: only tempo is kept
pub fn convert_sound(node: Node, context: &mut ConversionContext, builder: &mut MeasureBuilder) {
    if let Some(tempo) = tempo_from_sound(node, context) {
        let at = builder.cursor;
        builder.add_mark(0, Mark::instant(tempo, at));
    }
}

// ============================================================================
// BARLINE
// ============================================================================

/// Convert a `<barline>`: style, repeat and ending brackets
pub fn convert_barline(
    node: Node,
    context: &mut ConversionContext,
    builder: &mut MeasureBuilder,
    spans: &mut SpanTracker,
) -> Result<(), ImportError> {
    let location = match node.attribute("location") {
        None => BarlineLocation::Right,
        Some(text) => {
            BarlineLocation::from_musicxml(text).ok_or_else(|| context.invalid_value(node, text))?
        }
    };

    let style = match get_child(node, "bar-style") {
        None => None,
        Some(style_node) => {
            let text = get_text(style_node).unwrap_or_default();
            Some(
                BarlineType::from_bar_style(&text)
                    .ok_or_else(|| context.invalid_value(style_node, text.as_str()))?,
            )
        }
    };

    let repeat = match get_child(node, "repeat") {
        None => None,
        Some(repeat) => {
            let barline_type = match repeat.attribute("direction") {
                Some("forward") => BarlineType::RepeatStart,
                Some("backward") => BarlineType::RepeatEnd,
                other => return Err(context.invalid_value(repeat, other.unwrap_or_default())),
            };
            let times = repeat.attribute("times").and_then(|t| t.parse::<u32>().ok());
            Some((barline_type, times))
        }
    };

    if style.is_some() || repeat.is_some() {
        let mut barline = Barline::new(
            location,
            repeat
                .map(|(barline_type, _)| barline_type)
                .or(style)
                .unwrap_or_default(),
        );
        barline.repeat_times = repeat.and_then(|(_, times)| times);
        builder.push_barline(barline);
    }

    if let Some(ending) = get_child(node, "ending") {
        let number = ending.attribute("number").unwrap_or("1");
        let at = match location {
            BarlineLocation::Left => 0,
            _ => builder.cursor,
        };
        match ending.attribute("type") {
            Some("start") => {
                let kind = MarkKind::Volta {
                    number: number.to_string(),
                    text: get_text(ending),
                };
                let span = open_span(kind, Some(Placement::Above), 0, at, builder);
                spans.open(SpanFamily::Volta, number, span, builder);
            }
            Some("stop") | Some("discontinue") => {
                let at = builder.length_so_far().max(at);
                spans.close(SpanFamily::Volta, number, builder, at);
            }
            other => return Err(context.invalid_value(ending, other.unwrap_or_default())),
        }
    }

    Ok(())
}
