use crate::note::ChordSettings;
use crate::occupancy::OccupancyTracker;
use crate::program::ProgramTimeline;
use crate::redistribute::{ChordRedistributor, SplitPlan};
use crate::registry::InstrumentRegistry;
use crate::track::TrackChunk;

/// Piece-wide state for one chord splitting run.
///
/// Built once from every chunk before any chord is touched; channels are a
/// resource of the whole piece, not of a single track.
#[derive(Debug, Clone)]
pub struct Splitter {
    settings: ChordSettings,
    occupancy: OccupancyTracker,
    programs: ProgramTimeline,
    registry: InstrumentRegistry,
}

impl Splitter {
    pub fn new(chunks: &[TrackChunk<'_>], settings: ChordSettings) -> Self {
        let mut programs = ProgramTimeline::new();
        let mut registry = InstrumentRegistry::new();
        for chunk in chunks {
            for (tick, channel, program) in chunk.program_changes() {
                programs.record(channel, tick, program);
                registry.register(program, channel);
            }
        }

        let notes: Vec<_> = chunks.iter().flat_map(|c| c.notes()).collect();
        let occupancy = OccupancyTracker::from_notes(&notes);

        Self {
            settings,
            occupancy,
            programs,
            registry,
        }
    }

    /// Detect and redistribute chords in document order.
    ///
    /// Each chord sees the occupancy left by every chord before it, so a
    /// splitter plans a piece once; build a new one for another run.
    pub fn plan(&mut self, chunks: &[TrackChunk<'_>]) -> SplitPlan {
        let settings = self.settings;
        let mut plan = SplitPlan::default();
        let mut engine =
            ChordRedistributor::new(&mut self.occupancy, &self.programs, &mut self.registry);

        for chunk in chunks {
            let chords = chunk.chords(&settings);
            plan.chords_found += chords.len();
            for chord in &chords {
                engine.redistribute(chunk.index(), chord, &mut plan);
            }
        }

        tracing::info!(
            chords_found = plan.chords_found,
            chords_split = plan.chords_split,
            placed = plan.placements.len(),
            dropped = plan.dropped.len(),
            "planned chord split"
        );
        plan
    }

    pub fn occupancy(&self) -> &OccupancyTracker {
        &self.occupancy
    }

    pub fn programs(&self) -> &ProgramTimeline {
        &self.programs
    }

    pub fn registry(&self) -> &InstrumentRegistry {
        &self.registry
    }
}
