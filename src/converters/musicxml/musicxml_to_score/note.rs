//! `<note>` handling
//!
//! A MusicXML note is a flat bag of children (pitch or rest, duration,
//! type, dots, time-modification, voice, staff, ...). They are gathered
//! into one [`Note`]; a rest is a note without a pitch.

use roxmltree::Node;
use std::collections::HashMap;

use super::context::ConversionContext;
use super::errors::ImportError;
use super::parser::{get_child, get_children, get_text, parse_child};
use super::types::DiagnosticKind;
use crate::models::{
    Accidental, BaseDuration, Beam, BeamState, Dots, KeyService, Lyric, Note, Pitch, Ratio,
    Resolution, ResolvedDuration, StemDirection, Step, Syllabic, Ticks, TieType,
};

/// A note read from the document plus how far it moves the measure cursor
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedNote {
    pub note: Note,
    /// Cursor advance from `<duration>`; zero for chord members
    pub advance: Ticks,
}

/// Alterations in force within the current measure, per staff, step and octave
#[derive(Debug, Default)]
pub struct AccidentalState {
    in_force: HashMap<(u32, Step, i8), i8>,
}

impl AccidentalState {
    /// Decide which accidental `note` displays.
    ///
    /// An explicit accidental is always shown. Otherwise the note shows one
    /// when its alteration differs from what an earlier note on the same
    /// staff line set in this measure, or from the key signature.
    pub fn spell<K: KeyService>(&mut self, note: &mut Note, explicit: Option<Accidental>, key: &K) {
        let Some(pitch) = note.pitch else {
            return;
        };
        let slot = (note.staff, pitch.step, pitch.octave);
        let differs = match self.in_force.get(&slot) {
            Some(alter) => *alter != pitch.alter,
            None => key.has_accidental(&pitch),
        };

        note.accidental = explicit.or_else(|| differs.then(|| pitch.accidental()).flatten());
        note.show_accidental = note.accidental.is_some();
        self.in_force.insert(slot, pitch.alter);
    }
}

/// Convert one `<note>`; grace notes yield None
pub fn convert_note(
    node: Node,
    context: &mut ConversionContext,
    accidentals: &mut AccidentalState,
) -> Result<Option<ConvertedNote>, ImportError> {
    if get_child(node, "grace").is_some() {
        context.add_diagnostic(DiagnosticKind::GraceNote, node, "Grace note skipped");
        return Ok(None);
    }

    let pitch = if get_child(node, "rest").is_some() {
        None
    } else if let Some(pitch_node) = get_child(node, "pitch") {
        Some(parse_pitch(pitch_node, "step", "octave", context)?)
    } else if let Some(unpitched) = get_child(node, "unpitched") {
        Some(parse_pitch(unpitched, "display-step", "display-octave", context)?)
    } else {
        return Err(context.missing(node, "pitch"));
    };

    let chord = get_child(node, "chord").is_some();
    let divisions_amount: Option<i64> = parse_child(node, "duration", || context.location(node))?;
    let duration = parse_duration(node, pitch.is_none(), divisions_amount, context)?;

    let mut note = match pitch {
        Some(pitch) => Note::new(pitch, duration),
        None => Note::rest(duration),
    };
    note.chord = chord;

    note.voice = parse_child(node, "voice", || context.location(node))?.unwrap_or(1);
    note.staff = match parse_child::<u32>(node, "staff", || context.location(node))? {
        None => 1,
        Some(staff) if staff > 0 => staff,
        Some(staff) => return Err(context.invalid_value(node, staff.to_string())),
    };

    if let Some(stem) = get_child(node, "stem").and_then(get_text) {
        note.stem = StemDirection::from_musicxml(&stem);
        if note.stem.is_none() {
            context.add_diagnostic(
                DiagnosticKind::UnsupportedAttribute,
                node,
                format!("Unknown stem direction '{}'", stem),
            );
        }
    }

    note.beams = parse_beams(node, context);
    note.ties = get_children(node, "tie")
        .filter_map(|tie| match tie.attribute("type") {
            Some("start") => Some(TieType::Start),
            Some("stop") => Some(TieType::Stop),
            _ => None,
        })
        .collect();
    note.lyrics = parse_lyrics(node);

    let explicit = match get_child(node, "accidental").and_then(get_text) {
        None => None,
        Some(name) => {
            let accidental = Accidental::from_musicxml(&name);
            if accidental.is_none() {
                context.add_diagnostic(
                    DiagnosticKind::UnsupportedAttribute,
                    node,
                    format!("Accidental '{}' has no model equivalent", name),
                );
            }
            accidental
        }
    };
    let key = context.attributes.key;
    accidentals.spell(&mut note, explicit, &key);

    let advance = if chord {
        0
    } else {
        match divisions_amount {
            Some(amount) => context.ticks(get_child(node, "duration").unwrap_or(node), amount)?,
            None => note.ticks(),
        }
    };

    Ok(Some(ConvertedNote { note, advance }))
}

fn parse_pitch(
    node: Node,
    step_tag: &str,
    octave_tag: &str,
    context: &mut ConversionContext,
) -> Result<Pitch, ImportError> {
    let step_node = get_child(node, step_tag).ok_or_else(|| context.missing(node, step_tag))?;
    let step_text = get_text(step_node).unwrap_or_default();
    let step = Step::from_musicxml(&step_text)
        .ok_or_else(|| context.invalid_value(step_node, step_text.as_str()))?;

    let octave: i8 = parse_child(node, octave_tag, || context.location(node))?
        .ok_or_else(|| context.missing(node, octave_tag))?;

    let alter: f64 = parse_child(node, "alter", || context.location(node))?.unwrap_or(0.0);
    if alter.fract() != 0.0 {
        context.add_diagnostic(
            DiagnosticKind::UnsupportedAttribute,
            node,
            format!("Microtonal alteration {} rounded", alter),
        );
    }

    Ok(Pitch::new(step, alter.round() as i8, octave))
}

fn parse_duration(
    node: Node,
    is_rest: bool,
    divisions_amount: Option<i64>,
    context: &mut ConversionContext,
) -> Result<ResolvedDuration, ImportError> {
    let base = match get_child(node, "type") {
        None => None,
        Some(type_node) => {
            let name = get_text(type_node).unwrap_or_default();
            Some(
                BaseDuration::from_musicxml(&name)
                    .ok_or_else(|| context.invalid_value(type_node, name.as_str()))?,
            )
        }
    };

    let dots = Dots::from_count(get_children(node, "dot").count())?;

    let ratio = match get_child(node, "time-modification") {
        None => Ratio::REGULAR,
        Some(modification) => {
            let actual: u32 = parse_child(modification, "actual-notes", || context.location(modification))?
                .ok_or_else(|| context.missing(modification, "actual-notes"))?;
            let normal: u32 = parse_child(modification, "normal-notes", || context.location(modification))?
                .ok_or_else(|| context.missing(modification, "normal-notes"))?;
            Ratio::new(actual, normal)
                .map_err(|_| context.invalid_value(modification, format!("{}:{}", actual, normal)))?
        }
    };

    if let Some(base) = base {
        return Ok(ResolvedDuration::new(base, dots, ratio));
    }

    let amount = divisions_amount.ok_or_else(|| context.missing(node, "duration"))?;
    let resolution = ResolvedDuration::resolve(context.whole_notes(amount));
    if let Resolution::Approximate { requested, nearest } = resolution {
        context.add_diagnostic(
            DiagnosticKind::Approximation { requested, nearest },
            node,
            format!("Duration {} has no exact form; using {}", requested, nearest),
        );
    }
    if !is_rest {
        context.add_diagnostic(
            DiagnosticKind::InferredNoteType,
            node,
            format!("Note without <type>; inferred {}", resolution.duration()),
        );
    }
    Ok(resolution.duration())
}

fn parse_beams(node: Node, context: &mut ConversionContext) -> Vec<Beam> {
    let mut beams = Vec::new();
    for beam in get_children(node, "beam") {
        let number = beam
            .attribute("number")
            .and_then(|n| n.parse::<u8>().ok())
            .unwrap_or(1);
        let text = get_text(beam).unwrap_or_default();
        match BeamState::from_musicxml(&text) {
            Some(state) => beams.push(Beam { number, state }),
            None => context.add_diagnostic(
                DiagnosticKind::UnsupportedAttribute,
                beam,
                format!("Unknown beam value '{}'", text),
            ),
        }
    }
    beams
}

fn parse_lyrics(node: Node) -> Vec<Lyric> {
    get_children(node, "lyric")
        .enumerate()
        .filter_map(|(index, lyric)| {
            let text: Vec<String> = get_children(lyric, "text").filter_map(get_text).collect();
            if text.is_empty() {
                return None;
            }
            let syllabic = match get_children(lyric, "syllabic").next().and_then(get_text).as_deref() {
                Some("begin") => Syllabic::Begin,
                Some("middle") => Syllabic::Middle,
                Some("end") => Syllabic::End,
                _ => Syllabic::Single,
            };
            Some(Lyric {
                number: lyric
                    .attribute("number")
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(index as u32 + 1),
                syllabic,
                text: text.join(" "),
            })
        })
        .collect()
}
