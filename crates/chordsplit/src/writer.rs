//! Apply a [`SplitPlan`] to the chunks it was computed from.

use crate::redistribute::SplitPlan;
use crate::track::{TimedEvent, TrackChunk};
use serde::{Deserialize, Serialize};

/// What the writer changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedEdits {
    pub notes_removed: usize,
    pub notes_inserted: usize,
    pub program_changes_inserted: usize,
}

/// Remove the original chord notes, then insert program changes and the
/// redistributed notes in tick order.
///
/// All removals happen before any insertion, so a note put back on its own
/// channel is never mistaken for an original.
pub fn apply_plan(chunks: &mut [TrackChunk<'_>], plan: &SplitPlan) -> AppliedEdits {
    let mut edits = AppliedEdits::default();

    for chunk in chunks.iter_mut() {
        if let Some(notes) = plan.removals.get(&chunk.index()) {
            edits.notes_removed += chunk.remove_notes(notes);
        }
    }

    for request in &plan.program_changes {
        let Some(chunk) = chunk_mut(chunks, request.chunk) else {
            continue;
        };
        chunk.insert(TimedEvent::program_change(
            request.tick,
            request.channel,
            request.program,
        ));
        edits.program_changes_inserted += 1;
        tracing::debug!(
            chunk = request.chunk,
            tick = request.tick,
            channel = request.channel,
            program = request.program,
            "inserted program change"
        );
    }

    let mut placements: Vec<_> = plan.placements.iter().collect();
    placements.sort_by_key(|p| p.tick);
    for placement in placements {
        let Some(chunk) = chunk_mut(chunks, placement.chunk) else {
            continue;
        };
        chunk.insert_note(&placement.placed_note());
        edits.notes_inserted += 1;
    }

    edits
}

fn chunk_mut<'c, 'a>(chunks: &'c mut [TrackChunk<'a>], index: usize) -> Option<&'c mut TrackChunk<'a>> {
    chunks.iter_mut().find(|c| c.index() == index)
}
