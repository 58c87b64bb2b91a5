//! `<attributes>` handling: divisions, key, time, clef, staves, transpose

use log::debug;
use roxmltree::Node;

use super::context::ConversionContext;
use super::errors::ImportError;
use super::parser::{
    element_children, get_child, get_child_text, get_children, get_text, parse_child,
};
use super::types::DiagnosticKind;
use crate::models::{Clef, ClefSign, Key, Mode, TimeSignature, TimeSymbol, Transposition};

/// Children of `<attributes>` that carry nothing the model keeps
const DECORATIVE: &[&str] = &[
    "part-symbol",
    "instruments",
    "staff-details",
    "measure-style",
    "directive",
    "footnote",
    "level",
    "for-part",
];

/// Update the carried attributes from one `<attributes>` block
pub fn apply_attributes(node: Node, context: &mut ConversionContext) -> Result<(), ImportError> {
    for child in element_children(node) {
        match child.tag_name().name() {
            "divisions" => {
                let text = get_text(child).unwrap_or_default();
                match text.parse::<u32>() {
                    Ok(divisions) if divisions > 0 => context.attributes.divisions = divisions,
                    _ => return Err(context.invalid_value(child, text)),
                }
            }
            "key" => apply_key(child, context)?,
            "time" => apply_time(child, context)?,
            "clef" => apply_clef(child, context)?,
            "staves" => {
                let text = get_text(child).unwrap_or_default();
                match text.parse::<usize>() {
                    Ok(staves) if staves > 0 => context.attributes.set_staves(staves),
                    _ => return Err(context.invalid_value(child, text)),
                }
            }
            "transpose" => {
                let transposition = parse_transpose(child, context)?;
                context.attributes.transposition = Some(transposition);
            }
            name if DECORATIVE.contains(&name) => {
                debug!("Ignoring <{}> in attributes", name);
            }
            _ => context.unrecognized(child)?,
        }
    }
    Ok(())
}

fn apply_key(node: Node, context: &mut ConversionContext) -> Result<(), ImportError> {
    let Some(fifths_node) = get_child(node, "fifths") else {
        context.add_diagnostic(
            DiagnosticKind::UnsupportedAttribute,
            node,
            "Non-traditional key signature; keeping the previous key",
        );
        return Ok(());
    };

    let text = get_text(fifths_node).unwrap_or_default();
    let fifths: i32 = text
        .parse()
        .map_err(|_| context.invalid_value(fifths_node, text.as_str()))?;

    let mode = match get_child_text(node, "mode") {
        None => Mode::Major,
        Some(name) => match Mode::from_musicxml(&name) {
            Some(mode) => mode,
            None => {
                context.add_diagnostic(
                    DiagnosticKind::UnsupportedAttribute,
                    node,
                    format!("Unknown mode '{}'; using major", name),
                );
                Mode::Major
            }
        },
    };

    context.attributes.key =
        Key::new(fifths, mode).map_err(|_| context.invalid_value(fifths_node, text.as_str()))?;
    Ok(())
}

fn apply_time(node: Node, context: &mut ConversionContext) -> Result<(), ImportError> {
    if get_child(node, "senza-misura").is_some() {
        context.add_diagnostic(
            DiagnosticKind::UnsupportedAttribute,
            node,
            "Senza-misura time; keeping the previous time signature",
        );
        return Ok(());
    }

    let beats_node = get_child(node, "beats").ok_or_else(|| context.missing(node, "beats"))?;
    let beat_type_node =
        get_child(node, "beat-type").ok_or_else(|| context.missing(node, "beat-type"))?;

    // additive meters such as 3+2
    let beats_text = get_text(beats_node).unwrap_or_default();
    let beats = beats_text
        .split('+')
        .map(|part| part.trim().parse::<u32>())
        .sum::<Result<u32, _>>()
        .ok()
        .filter(|beats| *beats > 0)
        .ok_or_else(|| context.invalid_value(beats_node, beats_text.as_str()))?;

    let beat_type_text = get_text(beat_type_node).unwrap_or_default();
    let beat_type = beat_type_text
        .parse::<u32>()
        .ok()
        .filter(|beat_type| *beat_type > 0)
        .ok_or_else(|| context.invalid_value(beat_type_node, beat_type_text.as_str()))?;

    let mut time = TimeSignature::new(beats, beat_type);
    time.symbol = match node.attribute("symbol") {
        Some("common") => TimeSymbol::Common,
        Some("cut") => TimeSymbol::Cut,
        _ => TimeSymbol::Normal,
    };

    if get_children(node, "beats").count() > 1 {
        context.add_diagnostic(
            DiagnosticKind::UnsupportedAttribute,
            node,
            "Composite time signature; only the first component is kept",
        );
    }

    context.attributes.time = time;
    Ok(())
}

fn apply_clef(node: Node, context: &mut ConversionContext) -> Result<(), ImportError> {
    let staff = match node.attribute("number") {
        None => 0,
        Some(number) => match number.parse::<usize>() {
            Ok(n) if n > 0 => n - 1,
            _ => return Err(context.invalid_value(node, number)),
        },
    };

    let sign_node = get_child(node, "sign").ok_or_else(|| context.missing(node, "sign"))?;
    let sign_text = get_text(sign_node).unwrap_or_default();
    let sign = ClefSign::from_musicxml(&sign_text)
        .ok_or_else(|| context.invalid_value(sign_node, sign_text.as_str()))?;

    let line: Option<u8> = parse_child(node, "line", || context.location(node))?;
    let octave_change: Option<i8> = parse_child(node, "clef-octave-change", || context.location(node))?;

    let clef = Clef::new(
        sign,
        line.unwrap_or_else(|| sign.default_line()),
        octave_change.unwrap_or(0),
    );
    context.attributes.set_clef(staff, clef);
    Ok(())
}

fn parse_transpose(node: Node, context: &ConversionContext) -> Result<Transposition, ImportError> {
    let chromatic: i32 = parse_child(node, "chromatic", || context.location(node))?
        .ok_or_else(|| context.missing(node, "chromatic"))?;
    let diatonic: Option<i32> = parse_child(node, "diatonic", || context.location(node))?;
    let octave_change: Option<i32> = parse_child(node, "octave-change", || context.location(node))?;

    Ok(Transposition {
        diatonic: diatonic.unwrap_or(0),
        chromatic,
        octave_change: octave_change.unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::musicxml::musicxml_to_score::parser::parse_document;
    use crate::converters::musicxml::musicxml_to_score::types::{
        ImportSettings, UnrecognizedElementPolicy,
    };

    fn apply<'s>(
        xml: &str,
        settings: &'s ImportSettings,
    ) -> (Result<(), ImportError>, ConversionContext<'s>) {
        let doc = parse_document(xml).unwrap();
        let mut context = ConversionContext::new(settings);
        let result = apply_attributes(doc.root_element(), &mut context);
        (result, context)
    }

    #[test]
    fn test_full_attributes_block() {
        let settings = ImportSettings::default();
        let (result, context) = apply(
            r#"<attributes>
  <divisions>8</divisions>
  <key><fifths>-2</fifths><mode>minor</mode></key>
  <time symbol="common"><beats>4</beats><beat-type>4</beat-type></time>
  <staves>2</staves>
  <clef number="1"><sign>G</sign><line>2</line></clef>
  <clef number="2"><sign>F</sign><line>4</line></clef>
  <transpose><diatonic>-1</diatonic><chromatic>-2</chromatic></transpose>
</attributes>"#,
            &settings,
        );
        result.unwrap();
        let attributes = &context.attributes;
        assert_eq!(attributes.divisions, 8);
        assert_eq!(attributes.key.fifths(), -2);
        assert_eq!(attributes.key.mode(), Mode::Minor);
        assert_eq!(attributes.time.symbol, TimeSymbol::Common);
        assert_eq!(attributes.staves, 2);
        assert_eq!(attributes.clef(1), Clef::bass());
        assert_eq!(
            attributes.transposition,
            Some(Transposition {
                diatonic: -1,
                chromatic: -2,
                octave_change: 0
            })
        );
    }

    #[test]
    fn test_additive_meter() {
        let settings = ImportSettings::default();
        let (result, context) = apply(
            "<attributes><time><beats>3+2</beats><beat-type>8</beat-type></time></attributes>",
            &settings,
        );
        result.unwrap();
        assert_eq!(context.attributes.time, TimeSignature::new(5, 8));
    }

    #[test]
    fn test_octave_clef() {
        let settings = ImportSettings::default();
        let (result, context) = apply(
            "<attributes><clef><sign>G</sign><clef-octave-change>-1</clef-octave-change></clef></attributes>",
            &settings,
        );
        result.unwrap();
        assert_eq!(context.attributes.clef(0).glyph(), "gClef8vb");
        assert_eq!(context.attributes.clef(0).line, 2);
    }

    #[test]
    fn test_invalid_values_fail() {
        let settings = ImportSettings::default();
        let (result, _) = apply("<attributes><divisions>zero</divisions></attributes>", &settings);
        assert!(matches!(result, Err(ImportError::InvalidAttributeValue { .. })));

        let (result, _) = apply("<attributes><key><fifths>9</fifths></key></attributes>", &settings);
        assert!(matches!(result, Err(ImportError::InvalidAttributeValue { .. })));

        let (result, _) = apply("<attributes><clef><sign>Q</sign></clef></attributes>", &settings);
        assert!(matches!(result, Err(ImportError::InvalidAttributeValue { .. })));
    }

    #[test]
    fn test_non_traditional_key_keeps_previous() {
        let settings = ImportSettings::default();
        let (result, context) = apply(
            "<attributes><key><key-step>C</key-step><key-alter>1</key-alter></key></attributes>",
            &settings,
        );
        result.unwrap();
        assert_eq!(context.attributes.key, Key::default());
        assert_eq!(context.diagnostics.len(), 1);
    }

    #[test]
    fn test_unrecognized_child_follows_policy() {
        let strict = ImportSettings::default();
        let (result, _) = apply("<attributes><bogus/></attributes>", &strict);
        assert!(matches!(result, Err(ImportError::UnrecognizedElement { .. })));

        let lenient = ImportSettings {
            unrecognized_elements: UnrecognizedElementPolicy::Skip,
            ..ImportSettings::default()
        };
        let (result, context) = apply("<attributes><bogus/><staff-details/></attributes>", &lenient);
        result.unwrap();
        assert_eq!(context.diagnostics.len(), 1);
        assert_eq!(context.diagnostics[0].kind, DiagnosticKind::SkippedElement);
    }
}
