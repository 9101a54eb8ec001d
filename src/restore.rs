use crate::error::{ChunkReadError, RestoreError};
use crate::position::{ChunkPosition, RegionPosition};
use crate::world::World;
use log::info;
use std::path::Path;

/// Copies chunks from a backup world into a target world.
///
/// Chunks are grouped by region; each target region is written back once.
#[derive(Debug)]
pub struct ChunkRestorer {
    target: World,
    backup: World,
    actions: Vec<ChunkPosition>,
}

/// Outcome of a completed restoration.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct RestoreSummary {
    /// Target regions flushed, in processing order.
    pub regions: Vec<RegionPosition>,
    pub chunks_copied: usize,
}

impl ChunkRestorer {
    pub fn new<T: AsRef<Path>, B: AsRef<Path>>(target_path: T, backup_path: B) -> Self {
        ChunkRestorer {
            target: World::open(target_path),
            backup: World::open(backup_path),
            actions: Vec::new(),
        }
    }

    /// Queues a chunk. Duplicates are copied again.
    pub fn add_chunk<C: Into<ChunkPosition>>(&mut self, chunk: C) {
        self.actions.push(chunk.into());
    }

    pub fn chunks(&self) -> &[ChunkPosition] {
        &self.actions
    }

    /// Queued chunks grouped by region, regions in first-seen order.
    pub fn regions(&self) -> Vec<(RegionPosition, Vec<ChunkPosition>)> {
        let mut regions: Vec<(RegionPosition, Vec<ChunkPosition>)> = Vec::new();

        for &chunk in &self.actions {
            let position = chunk.region_position();

            match regions.iter_mut().find(|(region, _)| *region == position) {
                Some((_, chunks)) => chunks.push(chunk),
                None => regions.push((position, vec![chunk])),
            }
        }

        regions
    }

    /// Restores every queued chunk. Stops at the first failing region.
    pub fn perform(self) -> Result<RestoreSummary, RestoreError> {
        let mut summary = RestoreSummary::default();

        for (region, chunks) in self.regions() {
            summary.chunks_copied += self.perform_region(region, &chunks)?;
            summary.regions.push(region);
        }

        info!(
            target: "anvil-worldtools",
            "Restored {} chunks in {} regions",
            summary.chunks_copied,
            summary.regions.len()
        );

        Ok(summary)
    }

    /// Copies the raw payloads of `chunks` from the backup region into the
    /// target region and flushes the target once.
    ///
    /// Every chunk must belong to `region`. On error nothing of this region
    /// is written to disk.
    pub fn perform_region(
        &self,
        region: RegionPosition,
        chunks: &[ChunkPosition],
    ) -> Result<usize, RestoreError> {
        let read_error = |chunk_read_error| RestoreError::ReadError {
            region,
            chunk_read_error,
        };

        if let Some(&chunk) = chunks
            .iter()
            .find(|chunk| chunk.region_position() != region)
        {
            return Err(read_error(ChunkReadError::ChunkOutsideRegion {
                position: chunk,
                region,
            }));
        }

        let mut target_region = self.target.open_region(region).map_err(read_error)?;
        let backup_region = self.backup.open_region(region).map_err(read_error)?;

        for &chunk in chunks {
            let raw = backup_region.get_raw_chunk(chunk).map_err(read_error)?;

            target_region
                .set_chunk(chunk, raw)
                .map_err(|chunk_write_error| RestoreError::WriteError {
                    region,
                    chunk_write_error,
                })?;
        }

        target_region
            .flush()
            .map_err(|io_error| RestoreError::FlushError { region, io_error })?;

        info!(
            target: "anvil-worldtools",
            "Restored {} chunks of region {}",
            chunks.len(),
            region
        );

        Ok(chunks.len())
    }
}
