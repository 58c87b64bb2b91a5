//! Part: one instrument's measure sequences
//!
//! The primary staff is staff 0; secondary staves (the lower staff of a
//! piano part, for instance) are numbered from 1.

use serde::{Deserialize, Serialize};

use super::duration::Ticks;
use super::measure::Measure;
use super::note::Note;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: String,
    pub name: String,
    pub abbreviation: Option<String>,
    /// Keep the last measure of each staff FINAL as measures are appended
    pub auto_final_barline: bool,
    measures: Vec<Measure>,
    secondary_staves: Vec<Vec<Measure>>,
}

impl Part {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            abbreviation: None,
            auto_final_barline: true,
            measures: Vec::new(),
            secondary_staves: Vec::new(),
        }
    }

    /// Append to the primary staff
    pub fn append(&mut self, measure: Measure) {
        self.append_to_staff(measure, 0);
    }

    /// Append to `staff`, creating empty secondary staves up to it if needed
    pub fn append_to_staff(&mut self, measure: Measure, staff: usize) {
        if staff > self.secondary_staves.len() {
            self.secondary_staves.resize_with(staff, Vec::new);
        }

        let auto_final = self.auto_final_barline;
        let sequence = if staff == 0 {
            &mut self.measures
        } else {
            &mut self.secondary_staves[staff - 1]
        };

        sequence.push(measure);

        if auto_final {
            let count = sequence.len();
            if count >= 2 {
                sequence[count - 2].barlines.clear_final();
            }
            sequence[count - 1].barlines.mark_final();
        }
    }

    /// Primary staff measures
    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    /// Measures of staff `index` (0 = primary)
    pub fn staff(&self, index: usize) -> Option<&[Measure]> {
        if index == 0 {
            Some(&self.measures)
        } else {
            self.secondary_staves.get(index - 1).map(Vec::as_slice)
        }
    }

    pub fn secondary_staves(&self) -> &[Vec<Measure>] {
        &self.secondary_staves
    }

    pub fn staff_count(&self) -> usize {
        1 + self.secondary_staves.len()
    }

    pub fn measure_count(&self) -> usize {
        self.measures.len()
    }

    pub fn measure(&self, staff: usize, index: usize) -> Option<&Measure> {
        self.staff(staff).and_then(|measures| measures.get(index))
    }

    pub fn measure_mut(&mut self, staff: usize, index: usize) -> Option<&mut Measure> {
        let sequence = if staff == 0 {
            Some(&mut self.measures)
        } else {
            self.secondary_staves.get_mut(staff - 1)
        };
        sequence.and_then(|measures| measures.get_mut(index))
    }

    /// First primary-staff note at or after `offset` in measure `measure_index`
    pub fn note_at_location(&self, offset: Ticks, measure_index: usize) -> Option<&Note> {
        self.measures
            .get(measure_index)
            .and_then(|m| m.note_at_location(offset))
    }

    pub fn note_at_index(&self, index: usize, measure_index: usize) -> Option<&Note> {
        self.measures
            .get(measure_index)
            .and_then(|m| m.note_at_index(index))
    }
}
