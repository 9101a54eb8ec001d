//! Reading chunks out of Anvil region files and restoring chunks from world backups.
//!
//! ```no_run
//! use anvil_worldtools::{BlockPosition, ChunkRestorer, World};
//!
//! let mut world = World::open("world");
//! let block = world.get_block(BlockPosition::new(10, 64, -3)).unwrap();
//! println!("{:?}", block);
//!
//! let mut restorer = ChunkRestorer::new("world", "backups/world");
//! restorer.add_chunk((0, 0));
//! restorer.add_chunk((-1, 4));
//! restorer.perform().unwrap();
//! ```

pub mod chunk;
pub mod error;
pub mod heightmap;
pub mod nbt;
pub mod packed;
pub mod position;
pub mod region;
pub mod restore;
pub mod world;

#[cfg(test)]
mod test_support;

pub use crate::chunk::{ChunkView, Section};
pub use crate::error::{ChunkReadError, ChunkWriteError, RestoreError};
pub use crate::heightmap::{Heightmap, HeightmapKind};
pub use crate::nbt::{CompoundTag, CompoundTagError, Tag, TagDecodeError};
pub use crate::position::{
    BlockPosition, ChunkPosition, RegionChunkPosition, RegionPosition, SectionPosition,
};
pub use crate::region::{ChunkLocation, Region};
pub use crate::restore::{ChunkRestorer, RestoreSummary};
pub use crate::world::{RegionCachePolicy, World};
