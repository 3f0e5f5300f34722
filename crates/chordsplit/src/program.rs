//! Which instrument each channel plays over time.

use std::collections::BTreeMap;

/// Program assumed for a channel that never receives a program change.
pub const DEFAULT_PROGRAM: u8 = 0;

/// A program change seen on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramAssignment {
    pub tick: u64,
    pub program: u8,
}

/// Per-channel program changes merged across all chunks of a piece.
#[derive(Debug, Clone, Default)]
pub struct ProgramTimeline {
    channels: BTreeMap<u8, Vec<ProgramAssignment>>,
}

impl ProgramTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, channel: u8, tick: u64, program: u8) {
        self.channels
            .entry(channel)
            .or_default()
            .push(ProgramAssignment { tick, program });
    }

    pub fn assignments(&self, channel: u8) -> &[ProgramAssignment] {
        self.channels.get(&channel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Program in effect on `channel` at `tick`.
    ///
    /// The assignment with the latest tick not after `tick` wins; among
    /// assignments at the same tick the one recorded last wins. Before the
    /// first change the earliest assignment applies retroactively, and a
    /// channel without any assignment plays [`DEFAULT_PROGRAM`].
    pub fn program_at(&self, channel: u8, tick: u64) -> u8 {
        let assignments = self.assignments(channel);

        let prior = assignments
            .iter()
            .enumerate()
            .filter(|(_, a)| a.tick <= tick)
            .max_by_key(|(idx, a)| (a.tick, *idx))
            .map(|(_, a)| a.program);
        if let Some(program) = prior {
            return program;
        }

        assignments
            .iter()
            .enumerate()
            .min_by_key(|(idx, a)| (a.tick, *idx))
            .map(|(_, a)| a.program)
            .unwrap_or(DEFAULT_PROGRAM)
    }

    /// True if `channel` has a change to a program other than `program`
    /// exactly at `tick`.
    pub fn changes_away_at(&self, channel: u8, tick: u64, program: u8) -> bool {
        self.assignments(channel)
            .iter()
            .any(|a| a.tick == tick && a.program != program)
    }
}
