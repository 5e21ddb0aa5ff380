//! Match finding results shared by the reporting and output stages

use rayon::prelude::*;

use super::metadata::TileMetadata;
use crate::core::statistics::MatchFinderTileStats;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoundMatchesMetadata {
    pub tiles: Vec<TileMetadata>,
    /// Indexed by tile index
    pub tile_stats: Vec<MatchFinderTileStats>,
}

impl FoundMatchesMetadata {
    pub fn new(tiles: Vec<TileMetadata>) -> Self {
        let tile_stats = vec![MatchFinderTileStats::default(); tiles.len()];
        Self { tiles, tile_stats }
    }

    pub fn tile_stats_mut(&mut self, tile_index: usize) -> Option<&mut MatchFinderTileStats> {
        self.tile_stats.get_mut(tile_index)
    }

    /// Counters summed over all tiles
    pub fn total_stats(&self) -> MatchFinderTileStats {
        self.tile_stats
            .par_iter()
            .copied()
            .reduce(MatchFinderTileStats::default, |a, b| a + b)
    }
}
