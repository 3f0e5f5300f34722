use std::collections::BTreeMap;

/// Channels that have carried each program, in the order they were first seen.
///
/// Only a search hint: a channel may appear under several programs.
#[derive(Debug, Clone, Default)]
pub struct InstrumentRegistry {
    programs: BTreeMap<u8, Vec<u8>>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channels_for(&self, program: u8) -> &[u8] {
        self.programs.get(&program).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append `channel` under `program` unless already present.
    pub fn register(&mut self, program: u8, channel: u8) -> bool {
        let channels = self.programs.entry(program).or_default();
        if channels.contains(&channel) {
            return false;
        }
        channels.push(channel);
        true
    }
}
