//! Chord redistribution: one channel per chord note.
//!
//! For each chord the instrument is taken from the lowest note's channel at
//! its start tick. Every note then gets a channel that is free for the note's
//! whole duration and not already taken by an earlier note of the same chord.
//! A channel that switches to another program at the note's start tick is
//! passed over, since that change could win over the one inserted for the
//! chord.
//! Channels that already carried the instrument are searched first, in the
//! order they were registered; after that all sixteen channels are scanned in
//! ascending order. A channel won by the second search is registered for the
//! instrument so later chords prefer it too. Notes that find no channel are
//! dropped and reported.

use crate::note::{Chord, Note, CHANNEL_COUNT};
use crate::occupancy::OccupancyTracker;
use crate::program::ProgramTimeline;
use crate::registry::InstrumentRegistry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A chord note assigned to a channel for reinsertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// The note as it was found, on its original channel.
    pub note: Note,
    pub channel: u8,
    pub tick: u64,
    pub chunk: usize,
    pub program: u8,
}

impl Placement {
    /// The note as it will be written.
    pub fn placed_note(&self) -> Note {
        self.note.on_channel(self.channel)
    }
}

/// A program change to insert. Ordered by tick first so a set of requests
/// iterates in time order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgramChangeRequest {
    pub tick: u64,
    pub chunk: usize,
    pub channel: u8,
    pub program: u8,
}

/// A chord note that could not be placed on any channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("not enough channels to split chord at tick {chord_tick}; discarding note {pitch}")]
pub struct ChannelExhaustion {
    pub chunk: usize,
    pub chord_tick: u64,
    pub pitch: u8,
    pub channel: u8,
}

/// Everything decided for a piece, ready for the timeline writer.
#[derive(Debug, Clone, Default)]
pub struct SplitPlan {
    /// Original chord notes to remove, per chunk index.
    pub removals: BTreeMap<usize, Vec<Note>>,
    pub placements: Vec<Placement>,
    pub program_changes: BTreeSet<ProgramChangeRequest>,
    pub dropped: Vec<ChannelExhaustion>,
    pub chords_found: usize,
    pub chords_split: usize,
}

/// Allocates channels for chords against piece-wide state.
pub struct ChordRedistributor<'s> {
    occupancy: &'s mut OccupancyTracker,
    programs: &'s ProgramTimeline,
    registry: &'s mut InstrumentRegistry,
}

impl<'s> ChordRedistributor<'s> {
    pub fn new(
        occupancy: &'s mut OccupancyTracker,
        programs: &'s ProgramTimeline,
        registry: &'s mut InstrumentRegistry,
    ) -> Self {
        Self {
            occupancy,
            programs,
            registry,
        }
    }

    /// Assign channels to the notes of `chord`, found in chunk `chunk`.
    ///
    /// Returns false when the chord has fewer than two notes, in which case
    /// nothing is added to `plan`.
    pub fn redistribute(&mut self, chunk: usize, chord: &Chord, plan: &mut SplitPlan) -> bool {
        if chord.len() < 2 {
            return false;
        }
        let Some(lowest) = chord.lowest() else {
            return false;
        };
        let program = self.programs.program_at(lowest.channel, lowest.start_tick);

        // The originals leave their chunk, so their time on the old channel is free again.
        plan.removals
            .entry(chunk)
            .or_default()
            .extend_from_slice(chord.notes());
        for note in chord.notes() {
            self.occupancy
                .release(note.channel, note.start_tick, note.end_tick());
        }

        let mut used: BTreeSet<u8> = BTreeSet::new();
        for note in chord.notes() {
            let allocated =
                match self.preferred_channel(program, note, &used, &plan.program_changes) {
                    Some(channel) => Some(channel),
                    None => self.fallback_channel(program, note, &used, &plan.program_changes),
                };

            let Some(channel) = allocated else {
                let dropped = ChannelExhaustion {
                    chunk,
                    chord_tick: chord.time(),
                    pitch: note.pitch,
                    channel: note.channel,
                };
                tracing::warn!(
                    chunk,
                    chord_tick = dropped.chord_tick,
                    pitch = note.pitch,
                    channel = note.channel,
                    "{}",
                    dropped
                );
                plan.dropped.push(dropped);
                continue;
            };

            plan.program_changes.insert(ProgramChangeRequest {
                tick: note.start_tick,
                chunk,
                channel,
                program,
            });
            plan.placements.push(Placement {
                note: *note,
                channel,
                tick: note.start_tick,
                chunk,
                program,
            });
            self.occupancy
                .record(channel, note.start_tick, note.end_tick());
            used.insert(channel);

            tracing::debug!(
                chunk,
                pitch = note.pitch,
                tick = note.start_tick,
                from = note.channel,
                to = channel,
                program,
                "placed chord note"
            );
        }

        plan.chords_split += 1;
        true
    }

    /// No overlapping note and no competing program change at the note's start.
    fn is_free(
        &self,
        channel: u8,
        note: &Note,
        program: u8,
        requested: &BTreeSet<ProgramChangeRequest>,
    ) -> bool {
        let tick = note.start_tick;
        !self.occupancy.overlaps(channel, tick, note.end_tick())
            && !self.programs.changes_away_at(channel, tick, program)
            && !requested
                .iter()
                .any(|r| r.channel == channel && r.tick == tick && r.program != program)
    }

    fn preferred_channel(
        &self,
        program: u8,
        note: &Note,
        used: &BTreeSet<u8>,
        requested: &BTreeSet<ProgramChangeRequest>,
    ) -> Option<u8> {
        self.registry
            .channels_for(program)
            .iter()
            .copied()
            .find(|ch| !used.contains(ch) && self.is_free(*ch, note, program, requested))
    }

    fn fallback_channel(
        &mut self,
        program: u8,
        note: &Note,
        used: &BTreeSet<u8>,
        requested: &BTreeSet<ProgramChangeRequest>,
    ) -> Option<u8> {
        let preferred = self.registry.channels_for(program);
        let channel = (0..CHANNEL_COUNT).find(|ch| {
            !used.contains(ch)
                && !preferred.contains(ch)
                && self.is_free(*ch, note, program, requested)
        })?;
        self.registry.register(program, channel);
        Some(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct State {
        occupancy: OccupancyTracker,
        programs: ProgramTimeline,
        registry: InstrumentRegistry,
    }

    impl State {
        /// Occupancy seeded with `notes`; programs and registry from `changes`.
        fn new(notes: &[Note], changes: &[(u8, u64, u8)]) -> Self {
            let mut programs = ProgramTimeline::new();
            let mut registry = InstrumentRegistry::new();
            for &(channel, tick, program) in changes {
                programs.record(channel, tick, program);
                registry.register(program, channel);
            }
            Self {
                occupancy: OccupancyTracker::from_notes(notes),
                programs,
                registry,
            }
        }

        fn run(&mut self, chords: &[Chord]) -> SplitPlan {
            let mut plan = SplitPlan::default();
            let mut engine =
                ChordRedistributor::new(&mut self.occupancy, &self.programs, &mut self.registry);
            for chord in chords {
                engine.redistribute(0, chord, &mut plan);
            }
            plan
        }
    }

    fn note(pitch: u8, start_tick: u64, duration_ticks: u64, channel: u8) -> Note {
        Note {
            pitch,
            velocity: 100,
            start_tick,
            duration_ticks,
            channel,
        }
    }

    fn channels(plan: &SplitPlan) -> Vec<(u8, u8)> {
        plan.placements
            .iter()
            .map(|p| (p.note.pitch, p.channel))
            .collect()
    }

    #[test]
    fn single_note_chord_is_left_alone() {
        let lone = note(60, 0, 480, 0);
        let mut state = State::new(&[lone], &[]);
        let plan = state.run(&[Chord::new(vec![lone])]);

        assert!(plan.placements.is_empty());
        assert!(plan.removals.is_empty());
        assert!(plan.program_changes.is_empty());
        assert_eq!(plan.chords_split, 0);
    }

    #[test]
    fn piano_chord_reuses_its_channel_then_falls_back() {
        let chord_notes = vec![note(60, 0, 480, 2), note(64, 0, 480, 2)];
        // channels 0 and 1 are busy with other parts
        let mut existing = chord_notes.clone();
        existing.push(note(36, 0, 960, 0));
        existing.push(note(40, 0, 960, 1));
        let mut state = State::new(&existing, &[(2, 0, 0)]);

        let plan = state.run(&[Chord::new(chord_notes.clone())]);

        assert_eq!(channels(&plan), vec![(60, 2), (64, 3)]);
        assert_eq!(plan.removals.get(&0), Some(&chord_notes));
        let requests: Vec<ProgramChangeRequest> = plan.program_changes.iter().copied().collect();
        assert_eq!(
            requests,
            vec![
                ProgramChangeRequest { tick: 0, chunk: 0, channel: 2, program: 0 },
                ProgramChangeRequest { tick: 0, chunk: 0, channel: 3, program: 0 },
            ]
        );
        assert_eq!(state.occupancy.intervals(2).len(), 1);
        assert_eq!(state.occupancy.intervals(3).len(), 1);
        assert_eq!(state.occupancy.intervals(3)[0].end, 480);
        // fallback channel now preferred for piano
        assert_eq!(state.registry.channels_for(0), &[2, 3]);
    }

    #[test]
    fn lowest_note_defines_instrument() {
        let chord = Chord::new(vec![note(72, 0, 240, 5), note(48, 0, 240, 5)]);
        let mut state = State::new(chord.notes(), &[(5, 0, 33), (7, 0, 33)]);

        let plan = state.run(&[chord]);

        assert!(plan.placements.iter().all(|p| p.program == 33));
        assert_eq!(channels(&plan), vec![(48, 5), (72, 7)]);
    }

    #[test]
    fn busy_preferred_channel_is_skipped() {
        let chord = Chord::new(vec![note(60, 480, 480, 0), note(67, 480, 480, 0)]);
        let mut notes = chord.notes().to_vec();
        notes.push(note(50, 0, 600, 4));
        let mut state = State::new(&notes, &[(0, 0, 19), (4, 0, 19)]);

        let plan = state.run(&[chord]);

        // 4 is still sounding at 480; 1 is the first free fallback
        assert_eq!(channels(&plan), vec![(60, 0), (67, 1)]);
        assert_eq!(state.registry.channels_for(19), &[0, 4, 1]);
    }

    #[test]
    fn later_chords_see_earlier_allocations() {
        let first = Chord::new(vec![note(60, 0, 960, 0), note(64, 0, 960, 0)]);
        let second = Chord::new(vec![note(67, 480, 480, 0), note(71, 480, 480, 0)]);
        let mut all = first.notes().to_vec();
        all.extend_from_slice(second.notes());
        let mut state = State::new(&all, &[]);

        let plan = state.run(&[first, second]);

        // channel 0 is still held by the second chord while the first is placed
        assert_eq!(channels(&plan), vec![(60, 1), (64, 2), (67, 0), (71, 3)]);
        assert_eq!(state.registry.channels_for(0), &[1, 2, 0, 3]);
        for ch in 0..CHANNEL_COUNT {
            assert!(state.occupancy.conflicts(ch).is_empty(), "channel {ch}");
        }
    }

    #[test]
    fn seventeenth_note_is_dropped() {
        let notes: Vec<Note> = (0..17).map(|i| note(40 + i, 0, 480, 0)).collect();
        let chord = Chord::new(notes.clone());
        let mut state = State::new(&notes, &[]);

        let plan = state.run(&[chord]);

        assert_eq!(plan.placements.len(), 16);
        let used: BTreeSet<u8> = plan.placements.iter().map(|p| p.channel).collect();
        assert_eq!(used.len(), 16);
        assert_eq!(
            plan.dropped,
            vec![ChannelExhaustion { chunk: 0, chord_tick: 0, pitch: 56, channel: 0 }]
        );
        assert_eq!(
            plan.dropped[0].to_string(),
            "not enough channels to split chord at tick 0; discarding note 56"
        );
        // dropped notes still leave their chunk
        assert_eq!(plan.removals.get(&0).map(Vec::len), Some(17));
    }

    #[test]
    fn channel_switching_program_at_note_start_is_skipped() {
        let chord = Chord::new(vec![note(60, 0, 480, 0), note(64, 0, 480, 0)]);
        let mut notes = chord.notes().to_vec();
        notes.push(note(50, 960, 480, 1));
        // channel 1 is silent at tick 0 but becomes an organ right then
        let mut state = State::new(&notes, &[(0, 0, 0), (1, 0, 19)]);

        let plan = state.run(&[chord]);

        assert_eq!(channels(&plan), vec![(60, 0), (64, 2)]);
        assert_eq!(state.registry.channels_for(0), &[0, 2]);
    }

    #[test]
    fn same_program_at_note_start_does_not_block() {
        let chord = Chord::new(vec![note(60, 0, 480, 0), note(64, 0, 480, 0)]);
        let mut state = State::new(chord.notes(), &[(0, 0, 0), (1, 0, 0)]);

        let plan = state.run(&[chord]);

        assert_eq!(channels(&plan), vec![(60, 0), (64, 1)]);
    }

    #[test]
    fn earlier_request_for_other_program_blocks_channel() {
        // zero-length notes leave their channel free at the same tick
        let piano = Chord::new(vec![note(60, 0, 0, 0), note(64, 0, 0, 0)]);
        let organ = Chord::new(vec![note(48, 0, 0, 5), note(55, 0, 0, 5)]);
        let mut notes = piano.notes().to_vec();
        notes.extend_from_slice(organ.notes());
        let mut state = State::new(&notes, &[(0, 0, 0), (5, 0, 19)]);

        let plan = state.run(&[piano, organ]);

        assert_eq!(channels(&plan), vec![(60, 0), (64, 1), (48, 5), (55, 2)]);
    }

    #[test]
    fn duplicate_program_requests_collapse() {
        let mut plan = SplitPlan::default();
        let request = ProgramChangeRequest { tick: 0, chunk: 0, channel: 3, program: 0 };
        plan.program_changes.insert(request);
        plan.program_changes.insert(request);
        assert_eq!(plan.program_changes.len(), 1);
    }
}
