//! MIDI fixtures built through the library's own writer.

#![allow(dead_code)]

use chordsplit::{MidiFile, Note, TimedEvent};

pub fn note(pitch: u8, start_tick: u64, duration_ticks: u64, channel: u8) -> Note {
    Note {
        pitch,
        velocity: 100,
        start_tick,
        duration_ticks,
        channel,
    }
}

/// One track: program changes as `(tick, channel, program)` plus notes.
pub struct TrackSpec {
    pub programs: Vec<(u64, u8, u8)>,
    pub notes: Vec<Note>,
}

impl TrackSpec {
    pub fn new(programs: &[(u64, u8, u8)], notes: &[Note]) -> Self {
        Self {
            programs: programs.to_vec(),
            notes: notes.to_vec(),
        }
    }
}

/// Serialize a format-1 file at 480 PPQ.
pub fn build_midi(tracks: &[TrackSpec]) -> Vec<u8> {
    let mut file = MidiFile::new(480);
    for spec in tracks {
        file.push_chunk(|chunk| {
            for &(tick, channel, program) in &spec.programs {
                chunk.insert(TimedEvent::program_change(tick, channel, program));
            }
            for n in &spec.notes {
                chunk.insert_note(n);
            }
        });
    }
    file.to_bytes().expect("fixture should serialize")
}

/// Notes per chunk of a serialized file.
pub fn notes_by_chunk(midi: &[u8]) -> Vec<Vec<Note>> {
    let file = MidiFile::parse(midi).expect("output should parse");
    file.chunks().iter().map(|c| c.notes()).collect()
}

/// Program changes per chunk of a serialized file.
pub fn programs_by_chunk(midi: &[u8]) -> Vec<Vec<(u64, u8, u8)>> {
    let file = MidiFile::parse(midi).expect("output should parse");
    file.chunks()
        .iter()
        .map(|c| c.program_changes().collect())
        .collect()
}

/// Three-part piece: piano chords, a string pad, and a bass line.
pub fn ensemble() -> Vec<u8> {
    build_midi(&[
        TrackSpec::new(
            &[(0, 0, 0)],
            &[
                note(60, 0, 480, 0),
                note(64, 1, 480, 0),
                note(67, 2, 478, 0),
                note(62, 480, 480, 0),
                note(65, 480, 480, 0),
                note(69, 480, 480, 0),
                note(72, 960, 240, 0),
            ],
        ),
        TrackSpec::new(
            &[(0, 1, 48)],
            &[note(48, 0, 960, 1), note(55, 0, 960, 1)],
        ),
        TrackSpec::new(
            &[(0, 9, 32)],
            &[note(36, 0, 240, 9), note(36, 240, 240, 9), note(43, 480, 480, 9)],
        ),
    ])
}

/// Drum hits written as zero-length notes, plus a held note ending at 970.
pub fn zero_length_hits() -> Vec<u8> {
    build_midi(&[TrackSpec::new(
        &[],
        &[note(60, 0, 0, 0), note(64, 0, 0, 0), note(67, 10, 960, 0)],
    )])
}

/// Piano chord on channel 0 while another track switches channel 3 to
/// strings at the same tick; channels 1 and 2 are busy.
pub fn program_tie_across_tracks() -> Vec<u8> {
    build_midi(&[
        TrackSpec::new(&[(0, 0, 0)], &[note(60, 0, 480, 0), note(64, 0, 480, 0)]),
        TrackSpec::new(
            &[(0, 3, 48)],
            &[note(36, 0, 960, 1), note(43, 0, 960, 2), note(50, 960, 480, 3)],
        ),
    ])
}

/// The same two-note chord twice, the second starting as the first ends.
pub fn repeated_chord() -> Vec<u8> {
    build_midi(&[TrackSpec::new(
        &[],
        &[
            note(60, 0, 480, 0),
            note(64, 0, 480, 0),
            note(60, 480, 480, 0),
            note(64, 480, 480, 0),
        ],
    )])
}

/// Every multi-track fixture, named for assertion messages.
pub fn fixtures() -> Vec<(&'static str, Vec<u8>)> {
    vec![
        ("ensemble", ensemble()),
        ("zero_length_hits", zero_length_hits()),
        ("program_tie_across_tracks", program_tie_across_tracks()),
        ("repeated_chord", repeated_chord()),
    ]
}
