//! Per-channel record of the tick intervals already sounding a note.

use crate::note::Note;
use std::collections::BTreeMap;

/// Half-open `[start, end)` tick interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: u64,
    pub end: u64,
}

impl Interval {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        start < self.end && end > self.start
    }
}

/// Append-only interval lists keyed by channel.
#[derive(Debug, Clone, Default)]
pub struct OccupancyTracker {
    channels: BTreeMap<u8, Vec<Interval>>,
}

impl OccupancyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from every note of the piece, in the given order.
    pub fn from_notes<'a>(notes: impl IntoIterator<Item = &'a Note>) -> Self {
        let mut tracker = Self::new();
        for note in notes {
            tracker.record(note.channel, note.start_tick, note.end_tick());
        }
        tracker
    }

    /// True if any interval on `channel` strictly overlaps `[start, end)`.
    pub fn overlaps(&self, channel: u8, start: u64, end: u64) -> bool {
        self.channels
            .get(&channel)
            .is_some_and(|intervals| intervals.iter().any(|i| i.overlaps(start, end)))
    }

    pub fn record(&mut self, channel: u8, start: u64, end: u64) {
        self.channels
            .entry(channel)
            .or_default()
            .push(Interval::new(start, end));
    }

    /// Forget one interval equal to `[start, end)`. Returns false if none was recorded.
    pub fn release(&mut self, channel: u8, start: u64, end: u64) -> bool {
        let Some(intervals) = self.channels.get_mut(&channel) else {
            return false;
        };
        match intervals.iter().position(|i| i.start == start && i.end == end) {
            Some(idx) => {
                intervals.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn intervals(&self, channel: u8) -> &[Interval] {
        self.channels.get(&channel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Pairs of recorded intervals on `channel` that overlap each other.
    pub fn conflicts(&self, channel: u8) -> Vec<(Interval, Interval)> {
        let intervals = self.intervals(channel);
        let mut found = Vec::new();
        for (i, a) in intervals.iter().enumerate() {
            for b in &intervals[i + 1..] {
                if a.overlaps(b.start, b.end) {
                    found.push((*a, *b));
                }
            }
        }
        found
    }
}
