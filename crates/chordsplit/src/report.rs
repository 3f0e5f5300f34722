use crate::note::CHANNEL_COUNT;
use crate::occupancy::OccupancyTracker;
use crate::redistribute::{ChannelExhaustion, SplitPlan};
use crate::writer::AppliedEdits;
use serde::{Deserialize, Serialize};

/// Summary of one chord splitting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitReport {
    pub chunks: usize,
    pub chords_found: usize,
    pub chords_split: usize,
    pub notes_placed: usize,
    pub notes_removed: usize,
    pub program_changes_inserted: usize,
    /// Channels that received at least one redistributed note.
    pub channels_used: Vec<u8>,
    pub dropped: Vec<ChannelExhaustion>,
    /// Channels where notes still sound on top of each other after the
    /// split, such as overlapping notes that never formed a chord.
    pub overlapping_channels: Vec<u8>,
}

impl SplitReport {
    pub fn new(
        chunks: usize,
        plan: &SplitPlan,
        edits: &AppliedEdits,
        occupancy: &OccupancyTracker,
    ) -> Self {
        let mut channels_used: Vec<u8> = plan.placements.iter().map(|p| p.channel).collect();
        channels_used.sort_unstable();
        channels_used.dedup();
        let overlapping_channels = (0..CHANNEL_COUNT)
            .filter(|&ch| !occupancy.conflicts(ch).is_empty())
            .collect();

        Self {
            chunks,
            chords_found: plan.chords_found,
            chords_split: plan.chords_split,
            notes_placed: edits.notes_inserted,
            notes_removed: edits.notes_removed,
            program_changes_inserted: edits.program_changes_inserted,
            channels_used,
            dropped: plan.dropped.clone(),
            overlapping_channels,
        }
    }

    pub fn is_lossless(&self) -> bool {
        self.dropped.is_empty()
    }

    /// Every channel carries at most one sounding note at a time.
    pub fn is_monophonic(&self) -> bool {
        self.overlapping_channels.is_empty()
    }

    /// One line for humans.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} chunks, {} chords found, {} split, {} notes placed on {} channels, {} program changes",
            self.chunks,
            self.chords_found,
            self.chords_split,
            self.notes_placed,
            self.channels_used.len(),
            self.program_changes_inserted,
        );
        if !self.dropped.is_empty() {
            summary.push_str(&format!(". {} notes dropped for lack of channels", self.dropped.len()));
        }
        if !self.overlapping_channels.is_empty() {
            summary.push_str(&format!(
                ". overlapping notes remain on channels {:?}",
                self.overlapping_channels
            ));
        }
        summary
    }
}
