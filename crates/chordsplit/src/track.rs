//! Owned, absolute-tick view of a single MIDI track.

use crate::chord::detect_chords;
use crate::note::{Chord, ChordSettings, Note, NoteKey};
use midly::num::u28;
use midly::{MetaMessage, MidiMessage, Track, TrackEvent, TrackEventKind};
use std::collections::{BTreeMap, HashSet};

/// Largest delta time a track event can carry.
const MAX_DELTA: u64 = (1 << 28) - 1;

/// A track event positioned at an absolute tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedEvent<'a> {
    pub tick: u64,
    pub kind: TrackEventKind<'a>,
}

impl<'a> TimedEvent<'a> {
    pub fn note_on(note: &Note) -> Self {
        Self {
            tick: note.start_tick,
            kind: TrackEventKind::Midi {
                channel: note.channel.into(),
                message: MidiMessage::NoteOn {
                    key: note.pitch.into(),
                    vel: note.velocity.into(),
                },
            },
        }
    }

    pub fn note_off(note: &Note) -> Self {
        Self {
            tick: note.end_tick(),
            kind: TrackEventKind::Midi {
                channel: note.channel.into(),
                message: MidiMessage::NoteOff {
                    key: note.pitch.into(),
                    vel: 0.into(),
                },
            },
        }
    }

    pub fn program_change(tick: u64, channel: u8, program: u8) -> Self {
        Self {
            tick,
            kind: TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::ProgramChange {
                    program: program.into(),
                },
            },
        }
    }

    /// NoteOff, or NoteOn with zero velocity.
    pub fn is_note_off(&self) -> bool {
        matches!(
            self.kind,
            TrackEventKind::Midi {
                message: MidiMessage::NoteOff { .. },
                ..
            }
        ) || matches!(
            self.kind,
            TrackEventKind::Midi {
                message: MidiMessage::NoteOn { vel, .. },
                ..
            } if vel.as_int() == 0
        )
    }

    fn is_end_of_track(&self) -> bool {
        matches!(self.kind, TrackEventKind::Meta(MetaMessage::EndOfTrack))
    }
}

/// A note together with the positions of its on/off events in the chunk.
struct PairedNote {
    note: Note,
    on: usize,
    off: Option<usize>,
}

/// One track chunk of a MIDI file, events kept sorted by tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackChunk<'a> {
    index: usize,
    events: Vec<TimedEvent<'a>>,
}

impl<'a> TrackChunk<'a> {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            events: Vec::new(),
        }
    }

    pub fn from_track(index: usize, track: &Track<'a>) -> Self {
        let mut tick = 0u64;
        let events = track
            .iter()
            .map(|event| {
                tick += event.delta.as_int() as u64;
                TimedEvent {
                    tick,
                    kind: event.kind,
                }
            })
            .collect();
        Self { index, events }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn events(&self) -> &[TimedEvent<'a>] {
        &self.events
    }

    pub fn last_tick(&self) -> u64 {
        self.events.last().map(|e| e.tick).unwrap_or(0)
    }

    /// Notes in this chunk, sorted by start then pitch.
    pub fn notes(&self) -> Vec<Note> {
        self.paired_notes().into_iter().map(|p| p.note).collect()
    }

    /// Program changes as `(tick, channel, program)` in event order.
    pub fn program_changes(&self) -> impl Iterator<Item = (u64, u8, u8)> + '_ {
        self.events.iter().filter_map(|event| match event.kind {
            TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange { program },
            } => Some((event.tick, channel.as_int(), program.as_int())),
            _ => None,
        })
    }

    pub fn chords(&self, settings: &ChordSettings) -> Vec<Chord> {
        detect_chords(&self.notes(), settings)
    }

    /// Remove the on/off events of every note matching one of `notes` by
    /// pitch, channel and start tick. Returns how many notes were removed.
    pub fn remove_notes(&mut self, notes: &[Note]) -> usize {
        if notes.is_empty() {
            return 0;
        }
        let keys: HashSet<NoteKey> = notes.iter().map(Note::key).collect();

        let mut doomed = HashSet::new();
        let mut removed = 0;
        for paired in self.paired_notes() {
            if keys.contains(&paired.note.key()) {
                doomed.insert(paired.on);
                if let Some(off) = paired.off {
                    doomed.insert(off);
                }
                removed += 1;
            }
        }

        let mut idx = 0;
        self.events.retain(|_| {
            let keep = !doomed.contains(&idx);
            idx += 1;
            keep
        });
        removed
    }

    /// Insert keeping tick order. Note-offs land before other events at the
    /// same tick, everything else after them.
    pub fn insert(&mut self, event: TimedEvent<'a>) {
        let idx = if event.is_note_off() {
            self.events.partition_point(|e| e.tick < event.tick)
        } else {
            self.events.partition_point(|e| e.tick <= event.tick)
        };
        self.events.insert(idx, event);
    }

    /// Insert the on/off pair of `note`. A zero-length note keeps its
    /// note-off after its own note-on.
    pub fn insert_note(&mut self, note: &Note) {
        self.insert(TimedEvent::note_on(note));

        let off = TimedEvent::note_off(note);
        if note.duration_ticks == 0 {
            let idx = self.events.partition_point(|e| e.tick <= off.tick);
            self.events.insert(idx, off);
        } else {
            self.insert(off);
        }
    }

    /// Back to delta-timed `midly` events with a single trailing EndOfTrack.
    ///
    /// Fails if two consecutive events are further apart than a delta can
    /// encode.
    pub fn to_track(&self) -> crate::Result<Track<'a>> {
        let mut track = Vec::with_capacity(self.events.len() + 1);
        let mut last_tick = 0u64;

        for event in self.events.iter().filter(|e| !e.is_end_of_track()) {
            track.push(TrackEvent {
                delta: delta_between(last_tick, event.tick)?,
                kind: event.kind,
            });
            last_tick = event.tick;
        }

        track.push(TrackEvent {
            delta: delta_between(last_tick, self.last_tick())?,
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        Ok(track)
    }

    fn paired_notes(&self) -> Vec<PairedNote> {
        // (channel, pitch) → stack of (event index, onset tick, velocity)
        let mut pending: BTreeMap<(u8, u8), Vec<(usize, u64, u8)>> = BTreeMap::new();
        let mut paired = Vec::new();

        for (idx, event) in self.events.iter().enumerate() {
            let TrackEventKind::Midi { channel, message } = event.kind else {
                continue;
            };
            let ch = channel.as_int();
            match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                    pending
                        .entry((ch, key.as_int()))
                        .or_default()
                        .push((idx, event.tick, vel.as_int()));
                }
                MidiMessage::NoteOff { key, .. } | MidiMessage::NoteOn { key, .. } => {
                    let pitch = key.as_int();
                    if let Some((on, start_tick, velocity)) =
                        pending.get_mut(&(ch, pitch)).and_then(Vec::pop)
                    {
                        paired.push(PairedNote {
                            note: Note {
                                pitch,
                                velocity,
                                start_tick,
                                duration_ticks: event.tick - start_tick,
                                channel: ch,
                            },
                            on,
                            off: Some(idx),
                        });
                    }
                }
                _ => {}
            }
        }

        // Close any unclosed notes at the chunk's final tick
        let last_tick = self.last_tick();
        for ((ch, pitch), stack) in pending {
            for (on, start_tick, velocity) in stack {
                paired.push(PairedNote {
                    note: Note {
                        pitch,
                        velocity,
                        start_tick,
                        duration_ticks: last_tick.saturating_sub(start_tick),
                        channel: ch,
                    },
                    on,
                    off: None,
                });
            }
        }

        paired.sort_by(|a, b| {
            a.note
                .start_tick
                .cmp(&b.note.start_tick)
                .then(a.note.pitch.cmp(&b.note.pitch))
                .then(a.on.cmp(&b.on))
        });
        paired
    }
}

fn delta_between(from: u64, to: u64) -> crate::Result<u28> {
    let gap = to - from;
    if gap > MAX_DELTA {
        return Err(crate::Error::Write(format!(
            "{gap} ticks between events at tick {from} do not fit in a delta time"
        )));
    }
    Ok((gap as u32).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn note(pitch: u8, start_tick: u64, duration_ticks: u64, channel: u8) -> Note {
        Note {
            pitch,
            velocity: 100,
            start_tick,
            duration_ticks,
            channel,
        }
    }

    fn chunk_with(notes: &[Note]) -> TrackChunk<'static> {
        let mut chunk = TrackChunk::new(0);
        for n in notes {
            chunk.insert_note(n);
        }
        chunk
    }

    #[test]
    fn pairs_note_on_and_off() {
        let chunk = chunk_with(&[note(64, 0, 480, 2), note(60, 0, 240, 2)]);
        assert_eq!(
            chunk.notes(),
            vec![note(60, 0, 240, 2), note(64, 0, 480, 2)]
        );
    }

    #[test]
    fn zero_velocity_note_on_closes_note() {
        let track: Track = vec![
            TrackEvent {
                delta: 0.into(),
                kind: TrackEventKind::Midi {
                    channel: 1.into(),
                    message: MidiMessage::NoteOn {
                        key: 60.into(),
                        vel: 90.into(),
                    },
                },
            },
            TrackEvent {
                delta: 120.into(),
                kind: TrackEventKind::Midi {
                    channel: 1.into(),
                    message: MidiMessage::NoteOn {
                        key: 60.into(),
                        vel: 0.into(),
                    },
                },
            },
        ];
        let chunk = TrackChunk::from_track(3, &track);
        assert_eq!(chunk.index(), 3);
        let notes = chunk.notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].velocity, 90);
        assert_eq!(notes[0].duration_ticks, 120);
    }

    #[test]
    fn unclosed_note_ends_at_last_tick() {
        let mut chunk = TrackChunk::new(0);
        chunk.insert(TimedEvent::note_on(&note(60, 0, 0, 0)));
        chunk.insert(TimedEvent::program_change(960, 1, 5));

        let notes = chunk.notes();
        assert_eq!(notes, vec![note(60, 0, 960, 0)]);
    }

    #[test]
    fn remove_notes_matches_pitch_channel_and_start() {
        let mut chunk = chunk_with(&[
            note(60, 0, 480, 2),
            note(64, 0, 480, 2),
            note(60, 0, 480, 3),
            note(60, 480, 480, 2),
        ]);

        let removed = chunk.remove_notes(&[note(60, 0, 480, 2), note(64, 0, 999, 2)]);
        assert_eq!(removed, 2);
        assert_eq!(
            chunk.notes(),
            vec![note(60, 0, 480, 3), note(60, 480, 480, 2)]
        );
        assert_eq!(chunk.events().len(), 4);
    }

    #[test]
    fn note_off_sorts_before_note_on_at_same_tick() {
        let chunk = chunk_with(&[note(60, 480, 480, 0), note(60, 0, 480, 0)]);
        let kinds: Vec<(u64, bool)> = chunk
            .events()
            .iter()
            .map(|e| (e.tick, e.is_note_off()))
            .collect();
        assert_eq!(
            kinds,
            vec![(0, false), (480, true), (480, false), (960, true)]
        );
    }

    #[test]
    fn zero_length_note_off_follows_its_note_on() {
        let chunk = chunk_with(&[note(64, 0, 0, 0), note(60, 0, 0, 0), note(67, 0, 480, 0)]);
        let kinds: Vec<(u64, bool)> = chunk
            .events()
            .iter()
            .map(|e| (e.tick, e.is_note_off()))
            .collect();
        assert_eq!(
            kinds,
            vec![(0, false), (0, true), (0, false), (0, true), (0, false), (480, true)]
        );
        assert_eq!(
            chunk.notes(),
            vec![note(60, 0, 0, 0), note(64, 0, 0, 0), note(67, 0, 480, 0)]
        );
    }

    #[test]
    fn oversized_gap_is_a_write_error() {
        let mut chunk = TrackChunk::new(0);
        chunk.insert(TimedEvent::program_change(0, 0, 1));
        chunk.insert(TimedEvent::program_change(1 << 28, 0, 2));
        assert!(matches!(chunk.to_track(), Err(crate::Error::Write(_))));

        let mut chunk = TrackChunk::new(0);
        chunk.insert(TimedEvent::program_change(MAX_DELTA, 0, 2));
        let track = chunk.to_track().unwrap();
        assert_eq!(track[0].delta.as_int() as u64, MAX_DELTA);
    }

    #[test]
    fn program_change_inserted_after_existing_events_at_tick() {
        let mut chunk = TrackChunk::new(0);
        chunk.insert(TimedEvent::program_change(0, 3, 40));
        chunk.insert(TimedEvent::program_change(0, 3, 0));

        let programs: Vec<(u64, u8, u8)> = chunk.program_changes().collect();
        assert_eq!(programs, vec![(0, 3, 40), (0, 3, 0)]);
    }

    #[test]
    fn to_track_moves_end_of_track_last() {
        let mut chunk = TrackChunk::new(0);
        chunk.insert(TimedEvent {
            tick: 100,
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        chunk.insert_note(&note(60, 0, 480, 0));

        let track = chunk.to_track().unwrap();
        let deltas: Vec<u32> = track.iter().map(|e| e.delta.as_int()).collect();
        assert_eq!(deltas, vec![0, 480, 0]);
        assert!(matches!(
            track.last().map(|e| e.kind),
            Some(TrackEventKind::Meta(MetaMessage::EndOfTrack))
        ));
        assert_eq!(track.len(), 3);
    }
}
