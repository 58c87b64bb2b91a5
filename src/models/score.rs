//! Score, part systems and document metadata

use log::warn;
use serde::{Deserialize, Serialize};

use super::errors::ModelError;
use super::part::Part;

/// Bracketing drawn at the left of a part system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GroupSymbol {
    Brace,
    Bracket,
    Line,
    Square,
    #[default]
    None,
}

impl GroupSymbol {
    pub fn from_musicxml(text: &str) -> Option<Self> {
        match text.trim() {
            "brace" => Some(GroupSymbol::Brace),
            "bracket" => Some(GroupSymbol::Bracket),
            "line" => Some(GroupSymbol::Line),
            "square" => Some(GroupSymbol::Square),
            "none" => Some(GroupSymbol::None),
            _ => None,
        }
    }
}

/// Parts sharing one system layout
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PartSystem {
    pub symbol: GroupSymbol,
    pub name: Option<String>,
    parts: Vec<Part>,
}

impl PartSystem {
    pub fn new(symbol: GroupSymbol) -> Self {
        Self {
            symbol,
            name: None,
            parts: Vec::new(),
        }
    }

    pub fn append(&mut self, part: Part) {
        self.parts.push(part);
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn parts_mut(&mut self) -> &mut [Part] {
        &mut self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// `<creator>` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    /// Creator type such as `composer`, `lyricist`, `arranger`
    pub kind: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreMetadata {
    pub title: Option<String>,
    pub movement_title: Option<String>,
    pub work_number: Option<String>,
    pub movement_number: Option<String>,
    pub composer: Option<String>,
    pub creators: Vec<Creator>,
    pub rights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Score {
    pub metadata: ScoreMetadata,
    systems: Vec<PartSystem>,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, system: PartSystem) {
        self.systems.push(system);
    }

    /// Add `part` to the most recently appended part system
    pub fn append_to_latest_part_system(&mut self, part: Part) -> Result<(), ModelError> {
        match self.systems.last_mut() {
            Some(system) => {
                system.append(part);
                Ok(())
            }
            None => {
                warn!("No part system to receive part '{}'", part.id);
                Err(ModelError::NoPartSystem { part_id: part.id })
            }
        }
    }

    pub fn part_systems(&self) -> &[PartSystem] {
        &self.systems
    }

    /// All parts in document order
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.systems.iter().flat_map(|s| s.parts().iter())
    }

    pub fn part(&self, index: usize) -> Option<&Part> {
        self.parts().nth(index)
    }

    pub fn part_by_id(&self, id: &str) -> Option<&Part> {
        self.parts().find(|p| p.id == id)
    }

    pub fn part_count(&self) -> usize {
        self.systems.iter().map(PartSystem::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_without_system_reports() {
        let mut score = Score::new();
        let err = score
            .append_to_latest_part_system(Part::new("P1", "Flute"))
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::NoPartSystem {
                part_id: "P1".to_string()
            }
        );
        assert_eq!(score.part_count(), 0);
    }

    #[test]
    fn test_parts_in_document_order() {
        let mut score = Score::new();
        score.append(PartSystem::new(GroupSymbol::None));
        score.append_to_latest_part_system(Part::new("P1", "Flute")).unwrap();
        score.append(PartSystem::new(GroupSymbol::Brace));
        score.append_to_latest_part_system(Part::new("P2", "Piano")).unwrap();
        score.append_to_latest_part_system(Part::new("P3", "Organ")).unwrap();

        let ids: Vec<_> = score.parts().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P2", "P3"]);
        assert_eq!(score.part(1).unwrap().name, "Piano");
        assert_eq!(score.part_by_id("P3").unwrap().name, "Organ");
        assert_eq!(score.part_systems()[1].symbol, GroupSymbol::Brace);
    }
}
