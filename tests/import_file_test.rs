// End-to-end import from files on disk

use musicxml_score::converters::musicxml::{
    load_score, parse_score, DiagnosticKind, DurationBasis, ImportError, ImportSettings,
    UnrecognizedElementPolicy,
};
use musicxml_score::models::{BarlineType, BaseDuration, GroupSymbol, ResolvedDuration};
use std::io::Write;

const QUARTET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 4.0 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="4.0">
  <movement-title>Chorale</movement-title>
  <identification>
    <creator type="composer">J. Doe</creator>
    <encoding><software>Hand</software></encoding>
  </identification>
  <defaults><scaling><millimeters>7</millimeters><tenths>40</tenths></scaling></defaults>
  <part-list>
    <part-group type="start" number="1"><group-symbol>bracket</group-symbol><group-name>Strings</group-name></part-group>
    <score-part id="P1"><part-name>Violin</part-name><part-abbreviation>Vln.</part-abbreviation></score-part>
    <score-part id="P2"><part-name>Cello</part-name></score-part>
    <part-group type="stop" number="1"/>
  </part-list>
  <part id="P1">
    <measure number="1">
      <attributes>
        <divisions>4</divisions>
        <key><fifths>-1</fifths></key>
        <time><beats>2</beats><beat-type>4</beat-type></time>
        <clef><sign>G</sign><line>2</line></clef>
      </attributes>
      <note>
        <pitch><step>B</step><alter>-1</alter><octave>4</octave></pitch>
        <duration>4</duration><voice>1</voice><type>quarter</type><stem>up</stem>
        <lyric number="1"><syllabic>begin</syllabic><text>Al</text></lyric>
      </note>
      <note>
        <pitch><step>A</step><octave>4</octave></pitch>
        <duration>4</duration><voice>1</voice><type>quarter</type><stem>up</stem>
        <lyric number="1"><syllabic>end</syllabic><text>le</text></lyric>
      </note>
    </measure>
    <measure number="2">
      <print new-system="yes"/>
      <note><rest/><duration>8</duration><voice>1</voice><type>half</type></note>
    </measure>
  </part>
  <part id="P2">
    <measure number="1">
      <attributes>
        <divisions>4</divisions>
        <key><fifths>-1</fifths></key>
        <time><beats>2</beats><beat-type>4</beat-type></time>
        <clef><sign>F</sign><line>4</line></clef>
      </attributes>
      <note><pitch><step>F</step><octave>3</octave></pitch><duration>8</duration><voice>1</voice><type>half</type></note>
    </measure>
    <measure number="2">
      <note><pitch><step>B</step><octave>2</octave></pitch><duration>8</duration><voice>1</voice><type>half</type></note>
    </measure>
  </part>
</score-partwise>
"#;

#[test]
fn test_load_score_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(QUARTET.as_bytes()).unwrap();

    let result = load_score(file.path(), &ImportSettings::default()).unwrap();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);

    let score = &result.score;
    assert_eq!(score.metadata.title.as_deref(), Some("Chorale"));
    assert_eq!(score.metadata.composer.as_deref(), Some("J. Doe"));

    let systems = score.part_systems();
    assert_eq!(systems.len(), 1);
    assert_eq!(systems[0].symbol, GroupSymbol::Bracket);
    assert_eq!(systems[0].name.as_deref(), Some("Strings"));

    let violin = score.part_by_id("P1").unwrap();
    assert_eq!(violin.abbreviation.as_deref(), Some("Vln."));
    let first = violin.note_at_index(0, 0).unwrap();
    // B flat is in the key of F
    assert!(!first.show_accidental);
    assert_eq!(first.lyrics[0].text, "Al");

    let cello = score.part_by_id("P2").unwrap();
    assert_eq!(
        cello.measures()[1].notes().next().unwrap().duration,
        ResolvedDuration::plain(BaseDuration::Half)
    );
    // B natural against the key signature
    assert!(cello.measures()[1].notes().next().unwrap().show_accidental);
    assert_eq!(cello.measures()[1].barlines.right_type(), BarlineType::Final);
}

#[test]
fn test_settings_from_json() {
    let settings = ImportSettings::from_json(
        r#"{"unrecognized_elements": "skip", "duration_basis": "beat_type", "group_chords": true}"#,
    )
    .unwrap();
    assert_eq!(settings.unrecognized_elements, UnrecognizedElementPolicy::Skip);
    assert_eq!(settings.duration_basis, DurationBasis::BeatType);
    assert!(settings.group_chords);
    assert!(settings.auto_final_barline);

    assert!(matches!(
        ImportSettings::from_json(r#"{"duration_basis": "eons"}"#),
        Err(ImportError::Settings(_))
    ));
}

#[test]
fn test_import_result_serializes() {
    let result = parse_score(QUARTET, &ImportSettings::default()).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["score"]["metadata"]["title"], "Chorale");
    assert!(json["diagnostics"].as_array().unwrap().is_empty());
}

#[test]
fn test_inexact_divisions_produce_approximation_diagnostics() {
    let xml = r#"<score-partwise>
  <part-list><score-part id="P1"><part-name>Drum</part-name></score-part></part-list>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>11</divisions></attributes>
      <note><rest/><duration>1</duration></note>
      <note><rest/><duration>43</duration></note>
    </measure>
  </part>
</score-partwise>"#;
    let result = parse_score(xml, &ImportSettings::default()).unwrap();
    let approximations = result
        .diagnostics
        .iter()
        .filter(|d| matches!(d.kind, DiagnosticKind::Approximation { .. }))
        .count();
    assert_eq!(approximations, 2);
}
