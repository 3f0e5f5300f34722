use crate::note::{Chord, ChordSettings, Note};
use std::collections::BTreeMap;

/// Group notes of one chunk into chords.
///
/// Notes are scanned by start then pitch. On each channel a chord opens at a
/// note and takes every following note on that channel starting within
/// `tolerance_ticks` of that first note. Groups smaller than `min_notes` are
/// discarded; the rest come back ordered by start tick, then channel.
pub fn detect_chords(notes: &[Note], settings: &ChordSettings) -> Vec<Chord> {
    let mut sorted = notes.to_vec();
    sorted.sort_by(|a, b| a.start_tick.cmp(&b.start_tick).then(a.pitch.cmp(&b.pitch)));

    let mut open: BTreeMap<u8, Vec<Note>> = BTreeMap::new();
    let mut groups: Vec<Vec<Note>> = Vec::new();

    for note in sorted {
        let group = open.entry(note.channel).or_default();
        let fits = group
            .first()
            .is_some_and(|first| note.start_tick - first.start_tick <= settings.tolerance_ticks);
        if !fits && !group.is_empty() {
            groups.push(std::mem::take(group));
        }
        group.push(note);
    }
    groups.extend(open.into_values().filter(|g| !g.is_empty()));

    let mut chords: Vec<Chord> = groups
        .into_iter()
        .filter(|g| g.len() >= settings.min_notes)
        .map(Chord::new)
        .collect();
    chords.sort_by_key(|c| (c.time(), c.lowest().map(|n| n.channel)));
    chords
}
