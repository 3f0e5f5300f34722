use serde::{Deserialize, Serialize};

/// Number of addressable MIDI channels.
pub const CHANNEL_COUNT: u8 = 16;

/// A single MIDI note with absolute tick timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    pub pitch: u8,
    pub velocity: u8,
    pub start_tick: u64,
    pub duration_ticks: u64,
    pub channel: u8,
}

impl Note {
    pub fn end_tick(&self) -> u64 {
        self.start_tick + self.duration_ticks
    }

    /// Identity used to match a note against its events in a chunk.
    pub fn key(&self) -> NoteKey {
        NoteKey {
            pitch: self.pitch,
            channel: self.channel,
            start_tick: self.start_tick,
        }
    }

    /// Same note moved to another channel.
    pub fn on_channel(&self, channel: u8) -> Self {
        Self { channel, ..*self }
    }
}

/// (pitch, channel, start) identity of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteKey {
    pub pitch: u8,
    pub channel: u8,
    pub start_tick: u64,
}

/// Notes considered simultaneous, ordered by ascending pitch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chord {
    notes: Vec<Note>,
}

impl Chord {
    pub fn new(mut notes: Vec<Note>) -> Self {
        notes.sort_by_key(|n| n.pitch);
        Self { notes }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Earliest start among the chord's notes.
    pub fn time(&self) -> u64 {
        self.notes.iter().map(|n| n.start_tick).min().unwrap_or(0)
    }

    /// Lowest note, which defines the chord's instrument.
    pub fn lowest(&self) -> Option<&Note> {
        self.notes.first()
    }
}

/// Parameters controlling chord detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordSettings {
    /// Maximum distance (ticks) from the chord's first note. Default: 3.
    pub tolerance_ticks: u64,
    /// Minimum notes for a group to be reported. Default: 2.
    pub min_notes: usize,
}

impl Default for ChordSettings {
    fn default() -> Self {
        Self {
            tolerance_ticks: 3,
            min_notes: 2,
        }
    }
}
