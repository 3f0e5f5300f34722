//! Standard MIDI File container: parse into chunks, serialize back.

use crate::track::TrackChunk;
use midly::{Format, Header, Smf, Timing};

/// A parsed MIDI file whose tracks can be edited in place.
#[derive(Debug, Clone)]
pub struct MidiFile<'a> {
    header: Header,
    chunks: Vec<TrackChunk<'a>>,
}

impl<'a> MidiFile<'a> {
    pub fn parse(bytes: &'a [u8]) -> crate::Result<Self> {
        let smf = Smf::parse(bytes).map_err(|e| crate::Error::MalformedInput(e.to_string()))?;
        let chunks = smf
            .tracks
            .iter()
            .enumerate()
            .map(|(index, track)| TrackChunk::from_track(index, track))
            .collect();
        Ok(Self {
            header: smf.header,
            chunks,
        })
    }

    /// An empty format-1 file with metrical timing.
    pub fn new(ppq: u16) -> Self {
        Self {
            header: Header::new(Format::Parallel, Timing::Metrical(ppq.into())),
            chunks: Vec::new(),
        }
    }

    pub fn chunks(&self) -> &[TrackChunk<'a>] {
        &self.chunks
    }

    pub fn chunks_mut(&mut self) -> &mut [TrackChunk<'a>] {
        &mut self.chunks
    }

    pub fn push_chunk(&mut self, mut build: impl FnMut(&mut TrackChunk<'a>)) {
        let mut chunk = TrackChunk::new(self.chunks.len());
        build(&mut chunk);
        self.chunks.push(chunk);
    }

    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        let format = match (self.header.format, self.chunks.len()) {
            (Format::SingleTrack, n) if n > 1 => Format::Parallel,
            (format, _) => format,
        };
        let smf = Smf {
            header: Header::new(format, self.header.timing),
            tracks: self
                .chunks
                .iter()
                .map(TrackChunk::to_track)
                .collect::<crate::Result<_>>()?,
        };

        let mut buffer = Vec::new();
        smf.write(&mut buffer)
            .map_err(|e| crate::Error::Write(e.to_string()))?;
        Ok(buffer)
    }
}
