use crate::chunk::ChunkView;
use crate::error::ChunkReadError;
use crate::nbt::Tag;
use crate::position::{BlockPosition, ChunkPosition, RegionPosition};
use crate::region::Region;
use log::debug;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Folder inside the world directory that holds the region files.
const REGION_FOLDER: &str = "region";

/// Whether chunk reads go through the region cache.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegionCachePolicy {
    /// Every read opens the region file again.
    Disabled,
    /// Regions stay in memory until evicted. Cached regions see in-memory edits.
    KeepOpen,
}

impl Default for RegionCachePolicy {
    fn default() -> Self {
        RegionCachePolicy::Disabled
    }
}

/// World directory with a `region` folder of `r.<x>.<z>.mca` files.
#[derive(Debug)]
pub struct World {
    path: PathBuf,
    cache_policy: RegionCachePolicy,
    cache: HashMap<RegionPosition, Region>,
}

fn region_file_path(world_path: &Path, position: RegionPosition) -> PathBuf {
    world_path.join(REGION_FOLDER).join(position.file_name())
}

fn open_region_file(world_path: &Path, position: RegionPosition) -> Result<Region, ChunkReadError> {
    let path = region_file_path(world_path, position);

    Region::open(position, path).map_err(|io_error| match io_error.kind() {
        io::ErrorKind::NotFound => ChunkReadError::RegionFileMissing { position },
        _ => ChunkReadError::IOError { io_error },
    })
}

impl World {
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        World::with_cache_policy(path, RegionCachePolicy::default())
    }

    pub fn with_cache_policy<P: AsRef<Path>>(path: P, cache_policy: RegionCachePolicy) -> Self {
        World {
            path: path.as_ref().to_path_buf(),
            cache_policy,
            cache: HashMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cache_policy(&self) -> RegionCachePolicy {
        self.cache_policy
    }

    pub fn region_position(chunk: ChunkPosition) -> RegionPosition {
        chunk.region_position()
    }

    /// Path of the region file, `None` if the file does not exist.
    pub fn region_path(&self, region: RegionPosition) -> Option<PathBuf> {
        let path = region_file_path(&self.path, region);

        if path.is_file() {
            Some(path)
        } else {
            None
        }
    }

    /// Regions with a file in the world, sorted by position.
    pub fn region_positions(&self) -> Result<Vec<RegionPosition>, io::Error> {
        let mut positions = Vec::new();

        for entry in fs::read_dir(self.path.join(REGION_FOLDER))? {
            let entry = entry?;

            if !entry.file_type()?.is_file() {
                continue;
            }

            let file_name = entry.file_name();

            if let Some(position) = file_name.to_str().and_then(RegionPosition::from_file_name) {
                positions.push(position);
            }
        }

        positions.sort();

        Ok(positions)
    }

    /// Opens the region from disk, bypassing the cache.
    pub fn open_region(&self, region: RegionPosition) -> Result<Region, ChunkReadError> {
        open_region_file(&self.path, region)
    }

    /// Region holding the chunk, opened once and kept in the cache.
    pub fn get_region(&mut self, chunk: ChunkPosition) -> Result<&mut Region, ChunkReadError> {
        let position = chunk.region_position();

        match self.cache.entry(position) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                debug!(target: "anvil-worldtools", "Caching region {}", position);
                let region = open_region_file(&self.path, position)?;

                Ok(entry.insert(region))
            }
        }
    }

    pub fn is_cached(&self, region: RegionPosition) -> bool {
        self.cache.contains_key(&region)
    }

    /// Drops a region from the cache without flushing it.
    pub fn evict(&mut self, region: RegionPosition) -> Option<Region> {
        self.cache.remove(&region)
    }

    /// Flushes every cached region. Regions stay cached.
    pub fn flush_cached(&self) -> Result<(), io::Error> {
        for region in self.cache.values() {
            region.flush()?;
        }

        Ok(())
    }

    pub fn get_chunk(&mut self, chunk: ChunkPosition) -> Result<ChunkView, ChunkReadError> {
        match self.cache_policy {
            RegionCachePolicy::Disabled => {
                let region = self.open_region(chunk.region_position())?;
                region.get_chunk(chunk)
            }
            RegionCachePolicy::KeepOpen => self.get_region(chunk)?.get_chunk(chunk),
        }
    }

    pub fn get_chunk_for_block(
        &mut self,
        block: BlockPosition,
    ) -> Result<ChunkView, ChunkReadError> {
        self.get_chunk(block.chunk_position())
    }

    /// Block state compound at a world position.
    pub fn get_block(&mut self, block: BlockPosition) -> Result<Tag, ChunkReadError> {
        let chunk = self.get_chunk_for_block(block)?;
        let section = chunk.get_section(block.section_position().y)?;
        let (x, y, z) = block.section_local();
        let block_state = section.get_block(x, y, z)?;

        Ok(block_state.clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ChunkReadError;
    use crate::nbt::Tag;
    use crate::position::{BlockPosition, ChunkPosition, RegionPosition};
    use crate::region::ZLIB_COMPRESSION_TYPE;
    use crate::test_support::{chunk_record, chunk_tag, section_tag, write_region, RegionBuilder};
    use crate::world::{RegionCachePolicy, World};
    use std::fs;
    use tempfile::TempDir;

    /// Region -1, -1 with chunk -1, -1 whose section -1 is stone with one gold block.
    fn test_world() -> TempDir {
        let dir = TempDir::new().unwrap();

        let mut states = vec![0u16; 4096];
        // Local x = 15, y = 15, z = 0 of the section.
        states[15 * 256 + 15] = 1;

        let sections = vec![section_tag(-1, &["stone", "gold_block"], &states, 4)];
        let record = chunk_record(&chunk_tag(-1, -1, sections, vec![]), ZLIB_COMPRESSION_TYPE);
        let data = RegionBuilder::new().chunk(31, 31, &record).build();

        write_region(dir.path(), RegionPosition::new(-1, -1), &data);
        write_region(dir.path(), RegionPosition::new(2, 0), &RegionBuilder::new().build());
        fs::write(dir.path().join("region").join("r.0.0.mcc"), b"").unwrap();

        dir
    }

    fn block_name(tag: &Tag) -> String {
        tag.as_compound_tag()
            .unwrap()
            .get_str("Name")
            .unwrap()
            .to_owned()
    }

    #[test]
    fn test_region_path() {
        let dir = test_world();
        let world = World::open(dir.path());

        assert_eq!(
            world.region_path(RegionPosition::new(-1, -1)),
            Some(dir.path().join("region").join("r.-1.-1.mca"))
        );
        assert_eq!(world.region_path(RegionPosition::new(0, 0)), None);
    }

    #[test]
    fn test_region_positions() {
        let dir = test_world();
        let world = World::open(dir.path());

        assert_eq!(
            world.region_positions().unwrap(),
            vec![RegionPosition::new(-1, -1), RegionPosition::new(2, 0)]
        );
    }

    #[test]
    fn test_get_block_negative_coordinates() {
        let dir = test_world();
        let mut world = World::open(dir.path());

        let gold = world.get_block(BlockPosition::new(-1, -1, -16)).unwrap();
        let stone = world.get_block(BlockPosition::new(-2, -1, -16)).unwrap();

        assert_eq!(block_name(&gold), "minecraft:gold_block");
        assert_eq!(block_name(&stone), "minecraft:stone");
        assert!(!world.is_cached(RegionPosition::new(-1, -1)));
    }

    #[test]
    fn test_get_chunk_for_block() {
        let dir = test_world();
        let mut world = World::open(dir.path());

        let chunk = world.get_chunk_for_block(BlockPosition::new(-5, 70, -9)).unwrap();

        assert_eq!(chunk.position(), ChunkPosition::new(-1, -1));
        assert_eq!(chunk.level().unwrap().get_i32("zPos").unwrap(), -1);
    }

    #[test]
    fn test_region_file_missing() {
        let dir = test_world();
        let mut world = World::open(dir.path());

        match world.get_chunk(ChunkPosition::new(0, 0)) {
            Err(ChunkReadError::RegionFileMissing { position }) => {
                assert_eq!(position, RegionPosition::new(0, 0))
            }
            result => panic!("Expected `RegionFileMissing` but got `{:?}`", result),
        }
    }

    #[test]
    fn test_cached_region_sees_edits() {
        let dir = test_world();
        let mut world = World::with_cache_policy(dir.path(), RegionCachePolicy::KeepOpen);
        let chunk = ChunkPosition::new(-1, -1);

        let replacement = chunk_record(&chunk_tag(-1, -1, vec![], vec![]), ZLIB_COMPRESSION_TYPE);
        world.get_region(chunk).unwrap().set_chunk(chunk, &replacement).unwrap();

        assert!(world.is_cached(RegionPosition::new(-1, -1)));

        match world.get_chunk_for_block(BlockPosition::new(-1, -1, -16)) {
            Ok(view) => assert!(view.section_indices().unwrap().is_empty()),
            Err(error) => panic!("Expected chunk but got `{:?}`", error),
        }

        // The file on disk is unchanged until flushed.
        let fresh = world.open_region(RegionPosition::new(-1, -1)).unwrap();
        assert_eq!(fresh.get_chunk(chunk).unwrap().section_indices().unwrap(), vec![-1]);

        world.flush_cached().unwrap();
        let evicted = world.evict(RegionPosition::new(-1, -1));

        assert!(evicted.is_some());
        assert!(!world.is_cached(RegionPosition::new(-1, -1)));

        let chunk_view = world.get_chunk(chunk).unwrap();
        assert!(chunk_view.section_indices().unwrap().is_empty());
    }
}
