//! `<measure>` walk
//!
//! Children are visited in document order with a cursor in ticks. Notes
//! advance it, `<backup>` and `<forward>` move it, and annotations anchor
//! to it. A part with several staves yields one [`Measure`] per staff.

use log::debug;
use roxmltree::Node;

use super::attributes::apply_attributes;
use super::context::{ConversionContext, PartAttributes};
use super::direction::{
    convert_barline, convert_direction, convert_harmony, convert_sound, ClosedSpan, SpanTracker,
};
use super::errors::ImportError;
use super::note::{convert_note, AccidentalState, ConvertedNote};
use super::parser::{element_children, get_child, parse_child};
use crate::models::{Barline, Mark, Measure, Packing, Ticks};

/// A measure under construction
#[derive(Debug)]
pub struct MeasureBuilder {
    /// 0-based position of the measure in its part
    pub index: usize,
    /// Part-timeline position of the measure start
    pub start: Ticks,
    pub cursor: Ticks,
    max_cursor: Ticks,
    number: String,
    implicit: bool,
    packing: Packing,
    staves: Vec<Measure>,
    accidentals: AccidentalState,
    notes_seen: bool,
    deferred: Vec<ClosedSpan>,
}

/// A finished measure: one [`Measure`] per staff plus spans that close here
/// but belong to an earlier measure
#[derive(Debug)]
pub struct BuiltMeasure {
    pub staves: Vec<Measure>,
    pub deferred: Vec<ClosedSpan>,
    /// Timeline length in ticks
    pub length: Ticks,
}

impl MeasureBuilder {
    pub fn new(index: usize, start: Ticks, number: String, implicit: bool, packing: Packing) -> Self {
        Self {
            index,
            start,
            cursor: 0,
            max_cursor: 0,
            number,
            implicit,
            packing,
            staves: Vec::new(),
            accidentals: AccidentalState::default(),
            notes_seen: false,
            deferred: Vec::new(),
        }
    }

    /// Part-timeline position of the cursor
    pub fn position(&self) -> Ticks {
        self.start.saturating_add(self.cursor)
    }

    /// Furthest point reached so far within the measure
    pub fn length_so_far(&self) -> Ticks {
        self.cursor.max(self.max_cursor)
    }

    fn blank_staff(&self, staff: usize, attributes: &PartAttributes) -> Measure {
        let mut measure = Measure::new(self.number.clone());
        measure.implicit = self.implicit;
        measure.set_packing(self.packing);
        snapshot(&mut measure, staff, attributes);
        measure
    }

    fn ensure_staves(&mut self, count: usize, attributes: &PartAttributes) {
        while self.staves.len() < count {
            let measure = self.blank_staff(self.staves.len(), attributes);
            self.staves.push(measure);
        }
    }

    /// Copy the attributes into every staff while still at the measure head
    fn sync_attributes(&mut self, attributes: &PartAttributes) {
        self.ensure_staves(attributes.staves, attributes);
        if self.notes_seen {
            debug!("Mid-measure attributes in measure {}; applied from the next measure", self.number);
            return;
        }
        for (staff, measure) in self.staves.iter_mut().enumerate() {
            snapshot(measure, staff, attributes);
        }
    }

    fn staff_mut(&mut self, staff: usize, attributes: &PartAttributes) -> &mut Measure {
        self.ensure_staves(staff + 1, attributes);
        &mut self.staves[staff]
    }

    fn advance(&mut self, ticks: Ticks) {
        self.cursor = self.cursor.saturating_add(ticks);
        self.max_cursor = self.max_cursor.max(self.cursor);
    }

    fn place_note(&mut self, converted: ConvertedNote, context: &ConversionContext) {
        let ConvertedNote { note, advance } = converted;
        let staff = note.staff.saturating_sub(1) as usize;
        let group_chords = context.settings.group_chords;
        let measure = self.staff_mut(staff, &context.attributes);

        if note.chord && group_chords {
            if let Err(err) = measure.append_chord_note(note.clone()) {
                debug!("Chord note kept flat: {}", err);
                measure.append(note);
            }
        } else {
            measure.append(note);
        }

        self.notes_seen = true;
        self.advance(advance);
    }

    /// Attach a mark to `staff`
    pub fn add_mark(&mut self, staff: usize, mark: Mark) {
        if let Some(measure) = self.staves.get_mut(staff) {
            measure.add_mark(mark);
        } else {
            // staff not seen yet: marks for unknown staves go to the first
            debug!("Mark for staff {} placed on staff 1", staff + 1);
            if let Some(measure) = self.staves.first_mut() {
                measure.add_mark(mark);
            }
        }
    }

    /// Route a closed span to this measure or defer it to its start measure
    pub fn deliver(&mut self, closed: ClosedSpan) {
        if closed.measure_index == self.index {
            self.add_mark(closed.staff, closed.mark);
        } else {
            self.deferred.push(closed);
        }
    }

    /// Barlines apply to every staff
    pub fn push_barline(&mut self, barline: Barline) {
        for measure in &mut self.staves {
            measure.barlines.push(barline);
        }
    }

    fn finish(self, attributes: &PartAttributes) -> BuiltMeasure {
        let packed = self
            .staves
            .iter()
            .map(Measure::total_ticks)
            .max()
            .unwrap_or(0);
        let reached = self.max_cursor.max(packed);
        let length = if reached > 0 {
            reached
        } else {
            attributes.time.measure_ticks()
        };
        BuiltMeasure {
            staves: self.staves,
            deferred: self.deferred,
            length,
        }
    }
}

fn snapshot(measure: &mut Measure, staff: usize, attributes: &PartAttributes) {
    measure.time = attributes.time;
    measure.key = attributes.key;
    measure.clef = attributes.clef(staff);
    measure.divisions = attributes.divisions;
    measure.transposition = attributes.transposition;
}

/// Convert one `<measure>`; `start` is its position on the part timeline
pub fn convert_measure(
    node: Node,
    index: usize,
    start: Ticks,
    context: &mut ConversionContext,
    spans: &mut SpanTracker,
) -> Result<BuiltMeasure, ImportError> {
    let number = node
        .attribute("number")
        .map(str::to_string)
        .unwrap_or_else(|| (index + 1).to_string());
    let implicit = node.attribute("implicit") == Some("yes");

    let mut builder = MeasureBuilder::new(index, start, number, implicit, context.settings.packing);
    builder.ensure_staves(context.attributes.staves, &context.attributes);

    for child in element_children(node) {
        match child.tag_name().name() {
            "attributes" => {
                apply_attributes(child, context)?;
                builder.sync_attributes(&context.attributes);
            }
            "note" => {
                if let Some(converted) = convert_note(child, context, &mut builder.accidentals)? {
                    builder.place_note(converted, context);
                }
            }
            "backup" => {
                let amount: i64 = parse_child(child, "duration", || context.location(child))?
                    .ok_or_else(|| context.missing(child, "duration"))?;
                let ticks = context.ticks(get_child(child, "duration").unwrap_or(child), amount)?;
                builder.cursor = (builder.cursor - ticks).max(0);
            }
            "forward" => {
                let amount: i64 = parse_child(child, "duration", || context.location(child))?
                    .ok_or_else(|| context.missing(child, "duration"))?;
                let ticks = context.ticks(get_child(child, "duration").unwrap_or(child), amount)?;
                builder.advance(ticks);
            }
            "barline" => convert_barline(child, context, &mut builder, spans)?,
            "direction" => convert_direction(child, context, &mut builder, spans)?,
            "harmony" => convert_harmony(child, context, &mut builder)?,
            "sound" => convert_sound(child, context, &mut builder),
            "print" | "staff-layout" | "figured-bass" | "bookmark" | "link" => {
                debug!("Ignoring <{}> in measure {}", child.tag_name().name(), builder.number);
            }
            _ => context.unrecognized(child)?,
        }
    }

    Ok(builder.finish(&context.attributes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::musicxml::musicxml_to_score::parser::parse_document;
    use crate::converters::musicxml::musicxml_to_score::types::ImportSettings;
    use crate::models::{BarlineType, Clef, MarkKind, TimeSignature, TICKS_PER_WHOLE};

    const QUARTER: Ticks = TICKS_PER_WHOLE / 4;

    fn build(xml: &str, settings: &ImportSettings) -> Result<BuiltMeasure, ImportError> {
        let doc = parse_document(xml).unwrap();
        let mut context = ConversionContext::new(settings);
        context.begin_part(0, "P1");
        let mut spans = SpanTracker::default();
        convert_measure(doc.root_element(), 0, 0, &mut context, &mut spans)
    }

    const TWO_VOICES: &str = r#"<measure number="1">
  <attributes><divisions>1</divisions></attributes>
  <note><pitch><step>C</step><octave>5</octave></pitch><duration>2</duration><voice>1</voice><type>half</type></note>
  <note><pitch><step>D</step><octave>5</octave></pitch><duration>2</duration><voice>1</voice><type>half</type></note>
  <backup><duration>4</duration></backup>
  <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration><voice>2</voice><type>whole</type></note>
</measure>"#;

    #[test]
    fn test_voices_pack_in_append_order() {
        let built = build(TWO_VOICES, &ImportSettings::default()).unwrap();

        assert_eq!(built.staves.len(), 1);
        let measure = &built.staves[0];
        let starts: Vec<_> = measure.notes().map(|n| (n.voice, n.start_offset)).collect();
        assert_eq!(starts, vec![(1, 0), (1, 2 * QUARTER), (2, 4 * QUARTER)]);
        assert_eq!(built.length, 2 * TICKS_PER_WHOLE);
    }

    #[test]
    fn test_voices_overlay_with_per_voice_packing() {
        let settings = ImportSettings {
            packing: Packing::PerVoice,
            ..ImportSettings::default()
        };
        let built = build(TWO_VOICES, &settings).unwrap();

        let measure = &built.staves[0];
        assert_eq!(measure.packing(), Packing::PerVoice);
        let starts: Vec<_> = measure.notes().map(|n| (n.voice, n.start_offset)).collect();
        assert_eq!(starts, vec![(1, 0), (1, 2 * QUARTER), (2, 0)]);
        assert_eq!(built.length, TICKS_PER_WHOLE);
    }

    #[test]
    fn test_two_staves() {
        let settings = ImportSettings::default();
        let built = build(
            r#"<measure number="1">
  <attributes>
    <divisions>1</divisions>
    <staves>2</staves>
    <clef number="1"><sign>G</sign><line>2</line></clef>
    <clef number="2"><sign>F</sign><line>4</line></clef>
  </attributes>
  <note><pitch><step>E</step><octave>5</octave></pitch><duration>4</duration><staff>1</staff><type>whole</type></note>
  <backup><duration>4</duration></backup>
  <note><pitch><step>C</step><octave>3</octave></pitch><duration>4</duration><staff>2</staff><type>whole</type></note>
  <barline location="right"><bar-style>light-heavy</bar-style></barline>
</measure>"#,
            &settings,
        )
        .unwrap();

        assert_eq!(built.staves.len(), 2);
        assert_eq!(built.staves[0].clef, Clef::treble());
        assert_eq!(built.staves[1].clef, Clef::bass());
        assert_eq!(built.staves[1].len(), 1);
        for staff in &built.staves {
            assert_eq!(staff.barlines.right_type(), BarlineType::Final);
        }
    }

    #[test]
    fn test_mid_measure_attributes_do_not_rewrite_the_measure() {
        let settings = ImportSettings::default();
        let built = build(
            r#"<measure number="1">
  <attributes><divisions>1</divisions><time><beats>4</beats><beat-type>4</beat-type></time></attributes>
  <note><rest/><duration>4</duration></note>
  <attributes><time><beats>3</beats><beat-type>4</beat-type></time></attributes>
</measure>"#,
            &settings,
        )
        .unwrap();
        assert_eq!(built.staves[0].time, TimeSignature::new(4, 4));
    }

    #[test]
    fn test_empty_measure_has_nominal_length() {
        let settings = ImportSettings::default();
        let built = build(
            r#"<measure number="1"><attributes><time><beats>3</beats><beat-type>4</beat-type></time></attributes></measure>"#,
            &settings,
        )
        .unwrap();
        assert_eq!(built.length, 3 * QUARTER);
    }

    #[test]
    fn test_chords_grouped_on_request() {
        let xml = r#"<measure number="1">
  <attributes><divisions>1</divisions></attributes>
  <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration><type>whole</type></note>
  <note><chord/><pitch><step>E</step><octave>4</octave></pitch><duration>4</duration><type>whole</type></note>
  <note><chord/><pitch><step>G</step><octave>4</octave></pitch><duration>4</duration><type>whole</type></note>
</measure>"#;

        let flat = build(xml, &ImportSettings::default()).unwrap();
        assert_eq!(flat.staves[0].len(), 3);
        assert!(flat.staves[0].notes().all(|n| n.start_offset == 0));
        assert_eq!(flat.length, TICKS_PER_WHOLE);

        let settings = ImportSettings {
            group_chords: true,
            ..ImportSettings::default()
        };
        let grouped = build(xml, &settings).unwrap();
        assert_eq!(grouped.staves[0].len(), 1);
        assert_eq!(grouped.staves[0].notes().count(), 3);
    }

    #[test]
    fn test_direction_anchors_at_cursor() {
        let settings = ImportSettings::default();
        let built = build(
            r#"<measure number="1">
  <attributes><divisions>1</divisions></attributes>
  <note><rest/><duration>1</duration></note>
  <direction placement="below">
    <direction-type><dynamics><mf/></dynamics></direction-type>
  </direction>
  <note><rest/><duration>3</duration></note>
</measure>"#,
            &settings,
        )
        .unwrap();
        let marks = built.staves[0].marks();
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0].kind, MarkKind::Dynamic("mf".into()));
        assert_eq!(marks[0].start(), QUARTER);
    }

    #[test]
    fn test_unknown_measure_child_fails_by_default() {
        let settings = ImportSettings::default();
        let result = build(r#"<measure number="1"><mystery/></measure>"#, &settings);
        assert!(matches!(result, Err(ImportError::UnrecognizedElement { .. })));
    }
}
