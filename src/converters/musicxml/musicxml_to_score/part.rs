//! `<part>` walk: measures in order, attributes carried forward

use log::{debug, info};
use roxmltree::Node;

use super::context::ConversionContext;
use super::direction::{ClosedSpan, SpanTracker};
use super::errors::ImportError;
use super::measure::convert_measure;
use super::parser::{element_children, ScorePartInfo};
use super::types::DiagnosticKind;
use crate::models::{Part, Ticks};

/// Convert one `<part>`. `index` is its position in the document and
/// `info` its part-list entry, if any.
pub fn convert_part(
    node: Node,
    index: usize,
    info: Option<&ScorePartInfo>,
    context: &mut ConversionContext,
) -> Result<Part, ImportError> {
    let id = node
        .attribute("id")
        .ok_or_else(|| context.missing(node, "id"))?;
    context.begin_part(index, id);

    let mut part = match info {
        Some(info) => {
            let mut part = Part::new(id, info.name.clone());
            part.abbreviation = info.abbreviation.clone();
            part
        }
        None => Part::new(id, id),
    };
    part.auto_final_barline = context.settings.auto_final_barline;

    let mut spans = SpanTracker::default();
    let mut timeline: Ticks = 0;
    let mut measure_index = 0usize;

    for child in element_children(node) {
        if child.tag_name().name() != "measure" {
            context.unrecognized(child)?;
            continue;
        }

        context.measure_index = Some(measure_index);
        let built = convert_measure(child, measure_index, timeline, context, &mut spans)?;
        timeline = timeline.saturating_add(built.length);

        for (staff, measure) in built.staves.into_iter().enumerate() {
            part.append_to_staff(measure, staff);
        }
        for closed in built.deferred {
            attach_span(&mut part, closed);
        }
        measure_index += 1;
    }
    context.measure_index = None;

    if !spans.is_empty() {
        for closed in spans.drain(timeline) {
            context.add_diagnostic(
                DiagnosticKind::UnclosedSpan,
                node,
                format!(
                    "{:?} starting in measure {} never stopped; closed at the end of the part",
                    closed.mark.kind,
                    closed.measure_index + 1
                ),
            );
            attach_span(&mut part, closed);
        }
    }

    info!(
        "Converted part {} with {} measures on {} staves",
        part.id,
        part.measure_count(),
        part.staff_count()
    );
    Ok(part)
}

fn attach_span(part: &mut Part, closed: ClosedSpan) {
    let staff = if part.measure(closed.staff, closed.measure_index).is_some() {
        closed.staff
    } else {
        0
    };
    match part.measure_mut(staff, closed.measure_index) {
        Some(measure) => measure.add_mark(closed.mark),
        None => debug!("Dropping span for missing measure {}", closed.measure_index + 1),
    }
}
