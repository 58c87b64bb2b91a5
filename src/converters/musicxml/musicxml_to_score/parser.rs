//! XML parsing layer for MusicXML documents
//!
//! Thin helpers over roxmltree plus the score-level pieces that need no
//! carried context: document metadata and the part list.

use roxmltree::{Document, Node, ParsingOptions};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::errors::{ImportError, Location};
use crate::models::{Creator, GroupSymbol, ScoreMetadata};

// ============================================================================
// DOCUMENT
// ============================================================================

/// Parse the document text. DOCTYPE declarations are accepted.
pub fn parse_document(xml: &str) -> Result<Document<'_>, ImportError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(xml, options)
        .map_err(|e| ImportError::InvalidXml(format!("XML parse error: {}", e)))
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Get first child element with given tag name
pub fn get_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == tag)
}

/// All child elements with given tag name
pub fn get_children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == tag)
}

/// Child elements in document order
pub fn element_children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(|n| n.is_element())
}

/// Trimmed text content of a node; None when empty
pub fn get_text(node: Node) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Text content of first child with given tag
pub fn get_child_text(node: Node, tag: &str) -> Option<String> {
    get_child(node, tag).and_then(get_text)
}

/// Element path with 1-based indices among same-named siblings,
/// e.g. `/score-partwise/part[1]/measure[2]/note[3]`
pub fn element_path(node: Node) -> String {
    let mut segments = Vec::new();
    let mut current = Some(node).filter(|n| n.is_element());

    while let Some(element) = current {
        let tag = element.tag_name().name();
        let segment = match element.parent_element() {
            Some(parent) => {
                let index = get_children(parent, tag)
                    .position(|sibling| sibling == element)
                    .unwrap_or(0);
                format!("{}[{}]", tag, index + 1)
            }
            None => tag.to_string(),
        };
        segments.push(segment);
        current = element.parent_element();
    }

    segments.reverse();
    format!("/{}", segments.join("/"))
}

/// Parse the text of child `tag`; Ok(None) when the child is absent
pub fn parse_child<T: FromStr>(
    node: Node,
    tag: &str,
    location: impl FnOnce() -> Location,
) -> Result<Option<T>, ImportError> {
    let Some(child) = get_child(node, tag) else {
        return Ok(None);
    };
    let text = get_text(child).unwrap_or_default();
    text.parse::<T>()
        .map(Some)
        .map_err(|_| ImportError::InvalidAttributeValue {
            element: tag.to_string(),
            value: text,
            location: location(),
        })
}

// ============================================================================
// METADATA
// ============================================================================

/// Title, creators and rights from the score header
pub fn extract_metadata(score: Node) -> ScoreMetadata {
    let mut metadata = ScoreMetadata {
        movement_title: get_child_text(score, "movement-title"),
        movement_number: get_child_text(score, "movement-number"),
        ..ScoreMetadata::default()
    };

    if let Some(work) = get_child(score, "work") {
        metadata.title = get_child_text(work, "work-title");
        metadata.work_number = get_child_text(work, "work-number");
    }
    if metadata.title.is_none() {
        metadata.title = metadata.movement_title.clone();
    }

    if let Some(identification) = get_child(score, "identification") {
        for creator in get_children(identification, "creator") {
            if let Some(name) = get_text(creator) {
                metadata.creators.push(Creator {
                    kind: creator.attribute("type").map(str::to_string),
                    name,
                });
            }
        }
        metadata.rights = get_children(identification, "rights")
            .filter_map(get_text)
            .collect();
    }

    metadata.composer = metadata
        .creators
        .iter()
        .find(|c| c.kind.as_deref() == Some("composer"))
        .map(|c| c.name.clone());

    metadata
}

// ============================================================================
// PART LIST
// ============================================================================

/// One `<score-part>` entry
#[derive(Debug, Clone, PartialEq)]
pub struct ScorePartInfo {
    pub id: String,
    pub name: String,
    pub abbreviation: Option<String>,
}

/// Parts sharing one system, in part-list order
#[derive(Debug, Clone, PartialEq)]
pub struct SystemLayout {
    pub symbol: GroupSymbol,
    pub name: Option<String>,
    pub parts: Vec<ScorePartInfo>,
}

struct OpenGroup {
    order: usize,
    symbol: GroupSymbol,
    name: Option<String>,
}

/// Group the part list into systems.
///
/// Each part belongs to the outermost part-group open when it is listed; a
/// run of parts under the same outermost group forms one system. A run of
/// ungrouped parts forms a system with no symbol.
pub fn extract_systems(score: Node) -> Vec<SystemLayout> {
    let Some(part_list) = get_child(score, "part-list") else {
        return Vec::new();
    };

    let mut systems: Vec<SystemLayout> = Vec::new();
    // group number -> open group; `order` tracks which group opened first
    let mut open: BTreeMap<String, OpenGroup> = BTreeMap::new();
    let mut opened = 0usize;
    // `order` of the group owning the last system, None for an ungrouped system
    let mut last_owner: Option<Option<usize>> = None;

    for child in element_children(part_list) {
        match child.tag_name().name() {
            "part-group" => {
                let number = child.attribute("number").unwrap_or("1").to_string();
                match child.attribute("type") {
                    Some("start") => {
                        let symbol = get_child_text(child, "group-symbol")
                            .and_then(|s| GroupSymbol::from_musicxml(&s))
                            .unwrap_or_default();
                        let name = get_child_text(child, "group-name");
                        open.insert(
                            number,
                            OpenGroup {
                                order: opened,
                                symbol,
                                name,
                            },
                        );
                        opened += 1;
                    }
                    Some("stop") => {
                        open.remove(&number);
                    }
                    _ => {}
                }
            }
            "score-part" => {
                let info = ScorePartInfo {
                    id: child.attribute("id").unwrap_or_default().to_string(),
                    name: get_child_text(child, "part-name").unwrap_or_default(),
                    abbreviation: get_child_text(child, "part-abbreviation"),
                };

                let outermost = open.values().min_by_key(|g| g.order);
                let owner = outermost.map(|g| g.order);

                if last_owner != Some(owner) {
                    systems.push(SystemLayout {
                        symbol: outermost.map(|g| g.symbol).unwrap_or_default(),
                        name: outermost.and_then(|g| g.name.clone()),
                        parts: Vec::new(),
                    });
                    last_owner = Some(owner);
                }
                if let Some(system) = systems.last_mut() {
                    system.parts.push(info);
                }
            }
            _ => {}
        }
    }

    systems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_path() {
        let xml = r#"<score-partwise><part id="P1"><measure/><measure><note/><note/></measure></part></score-partwise>"#;
        let doc = parse_document(xml).unwrap();
        let note = doc
            .descendants()
            .filter(|n| n.has_tag_name("note"))
            .nth(1)
            .unwrap();
        assert_eq!(
            element_path(note),
            "/score-partwise/part[1]/measure[2]/note[2]"
        );
    }

    #[test]
    fn test_doctype_is_accepted() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 3.1 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="3.1"/>"#;
        let doc = parse_document(xml).unwrap();
        assert_eq!(doc.root_element().tag_name().name(), "score-partwise");
    }

    #[test]
    fn test_malformed_xml() {
        assert!(matches!(
            parse_document("<score-partwise><part>"),
            Err(ImportError::InvalidXml(_))
        ));
    }

    #[test]
    fn test_parse_child_reports_bad_values() {
        let doc = parse_document("<time><beats>x</beats><beat-type>4</beat-type></time>").unwrap();
        let time = doc.root_element();
        let beat_type: Option<u32> = parse_child(time, "beat-type", Location::default).unwrap();
        assert_eq!(beat_type, Some(4));
        let missing: Option<u32> = parse_child(time, "senza-misura", Location::default).unwrap();
        assert_eq!(missing, None);
        assert!(parse_child::<u32>(time, "beats", Location::default).is_err());
    }

    #[test]
    fn test_metadata() {
        let xml = r#"<score-partwise>
  <work><work-number>Op. 1</work-number><work-title>Sonata</work-title></work>
  <movement-number>2</movement-number>
  <movement-title>Adagio</movement-title>
  <identification>
    <creator type="lyricist">Someone Else</creator>
    <creator type="composer">A. Composer</creator>
    <rights>Public domain</rights>
  </identification>
</score-partwise>"#;
        let doc = parse_document(xml).unwrap();
        let metadata = extract_metadata(doc.root_element());
        assert_eq!(metadata.title.as_deref(), Some("Sonata"));
        assert_eq!(metadata.movement_title.as_deref(), Some("Adagio"));
        assert_eq!(metadata.work_number.as_deref(), Some("Op. 1"));
        assert_eq!(metadata.movement_number.as_deref(), Some("2"));
        assert_eq!(metadata.composer.as_deref(), Some("A. Composer"));
        assert_eq!(metadata.creators.len(), 2);
        assert_eq!(metadata.rights, vec!["Public domain".to_string()]);
    }

    #[test]
    fn test_title_falls_back_to_movement_title() {
        let xml = r#"<score-partwise><movement-title>Prelude</movement-title></score-partwise>"#;
        let doc = parse_document(xml).unwrap();
        let metadata = extract_metadata(doc.root_element());
        assert_eq!(metadata.title.as_deref(), Some("Prelude"));
        assert_eq!(metadata.composer, None);
    }

    #[test]
    fn test_systems_from_part_groups() {
        let xml = r#"<score-partwise><part-list>
  <score-part id="P1"><part-name>Flute</part-name></score-part>
  <score-part id="P2"><part-name>Oboe</part-name></score-part>
  <part-group type="start" number="1">
    <group-name>Piano</group-name>
    <group-symbol>brace</group-symbol>
  </part-group>
  <score-part id="P3"><part-name>Right</part-name></score-part>
  <part-group type="start" number="2"><group-symbol>line</group-symbol></part-group>
  <score-part id="P4"><part-name>Left</part-name><part-abbreviation>L.</part-abbreviation></score-part>
  <part-group type="stop" number="2"/>
  <part-group type="stop" number="1"/>
  <score-part id="P5"><part-name>Cello</part-name></score-part>
</part-list></score-partwise>"#;
        let doc = parse_document(xml).unwrap();
        let systems = extract_systems(doc.root_element());

        assert_eq!(systems.len(), 3);
        assert_eq!(systems[0].symbol, GroupSymbol::None);
        assert_eq!(systems[0].parts.len(), 2);
        assert_eq!(systems[1].symbol, GroupSymbol::Brace);
        assert_eq!(systems[1].name.as_deref(), Some("Piano"));
        let ids: Vec<_> = systems[1].parts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["P3", "P4"]);
        assert_eq!(systems[1].parts[1].abbreviation.as_deref(), Some("L."));
        assert_eq!(systems[2].parts[0].name, "Cello");
    }
}
