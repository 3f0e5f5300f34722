//! Split MIDI chords across channels.
//!
//! Chords that pile several notes onto one channel are rewritten so each note
//! sounds on its own channel, keeping the chord's instrument. Per-channel
//! effects such as pitch bend or mono legato then apply to each note alone.
//!
//! # Example
//!
//! ```no_run
//! use chordsplit::{split_midi, ChordSettings};
//!
//! let input = std::fs::read("input.mid").unwrap();
//! let output = split_midi(&input, &ChordSettings::default()).unwrap();
//! println!("{}", output.report.summary());
//! std::fs::write("input.mid.split.mid", &output.midi).unwrap();
//! ```

pub mod chord;
pub mod midi_file;
pub mod note;
pub mod occupancy;
pub mod program;
pub mod redistribute;
pub mod registry;
pub mod report;
pub mod splitter;
pub mod track;
pub mod writer;

pub use chord::detect_chords;
pub use midi_file::MidiFile;
pub use note::{Chord, ChordSettings, Note, NoteKey, CHANNEL_COUNT};
pub use occupancy::{Interval, OccupancyTracker};
pub use program::{ProgramAssignment, ProgramTimeline, DEFAULT_PROGRAM};
pub use redistribute::{
    ChannelExhaustion, ChordRedistributor, Placement, ProgramChangeRequest, SplitPlan,
};
pub use registry::InstrumentRegistry;
pub use report::SplitReport;
pub use splitter::Splitter;
pub use track::{TimedEvent, TrackChunk};
pub use writer::{apply_plan, AppliedEdits};

/// Errors from chord splitting.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed MIDI input: {0}")]
    MalformedInput(String),

    #[error("failed to write MIDI: {0}")]
    Write(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Result of [`split_midi`].
#[derive(Debug, Clone)]
pub struct SplitOutput {
    /// Rewritten Standard MIDI File bytes.
    pub midi: Vec<u8>,
    pub report: SplitReport,
    pub plan: SplitPlan,
    /// Occupancy after every placement.
    pub occupancy: OccupancyTracker,
}

/// Full pipeline: parse → plan → rewrite → serialize.
pub fn split_midi(midi_bytes: &[u8], settings: &ChordSettings) -> Result<SplitOutput> {
    let mut file = MidiFile::parse(midi_bytes)?;

    let mut splitter = Splitter::new(file.chunks(), *settings);
    let plan = splitter.plan(file.chunks());
    let edits = apply_plan(file.chunks_mut(), &plan);
    let midi = file.to_bytes()?;

    let report = SplitReport::new(file.chunks().len(), &plan, &edits, splitter.occupancy());
    Ok(SplitOutput {
        midi,
        report,
        plan,
        occupancy: splitter.occupancy().clone(),
    })
}
