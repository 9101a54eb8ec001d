use std::fmt::{self, Display};

/// Chunk column coordinates in chunk-grid units.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Copy, Clone)]
pub struct ChunkPosition {
    pub x: i32,
    pub z: i32,
}

impl ChunkPosition {
    pub fn new(x: i32, z: i32) -> ChunkPosition {
        ChunkPosition { x, z }
    }

    pub fn region_position(&self) -> RegionPosition {
        RegionPosition::from_chunk_position(self.x, self.z)
    }

    pub fn region_chunk_position(&self) -> RegionChunkPosition {
        RegionChunkPosition::from_chunk_position(self.x, self.z)
    }
}

impl From<(i32, i32)> for ChunkPosition {
    fn from((x, z): (i32, i32)) -> Self {
        ChunkPosition::new(x, z)
    }
}

impl Display for ChunkPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.x, self.z)
    }
}

#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Copy, Clone)]
pub struct RegionPosition {
    pub x: i32,
    pub z: i32,
}

impl RegionPosition {
    pub fn new(x: i32, z: i32) -> RegionPosition {
        RegionPosition { x, z }
    }

    /// Arithmetic shift, so negative chunks floor into negative regions.
    pub fn from_chunk_position(chunk_x: i32, chunk_z: i32) -> RegionPosition {
        let x = chunk_x >> 5;
        let z = chunk_z >> 5;

        RegionPosition::new(x, z)
    }

    /// Name of the region file, `r.<x>.<z>.mca`.
    pub fn file_name(&self) -> String {
        format!("r.{}.{}.mca", self.x, self.z)
    }

    /// Inverse of [`RegionPosition::file_name`].
    pub fn from_file_name(file_name: &str) -> Option<RegionPosition> {
        let parts: Vec<_> = file_name.split('.').collect();

        let incorrect_format = parts.len() != 4 || parts[0] != "r" || parts[3] != "mca";

        if incorrect_format {
            return None;
        }

        let x = parts[1].parse().ok()?;
        let z = parts[2].parse().ok()?;

        Some(RegionPosition::new(x, z))
    }
}

impl Display for RegionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.x, self.z)
    }
}

/// Chunk slot inside a region's 32x32 grid.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Copy, Clone)]
pub struct RegionChunkPosition {
    pub x: u8,
    pub z: u8,
}

impl RegionChunkPosition {
    pub fn new(x: u8, z: u8) -> RegionChunkPosition {
        debug_assert!(32 > x, "Region chunk x coordinate out of bounds");
        debug_assert!(32 > z, "Region chunk z coordinate out of bounds");

        RegionChunkPosition { x, z }
    }

    pub fn from_chunk_position(chunk_x: i32, chunk_z: i32) -> RegionChunkPosition {
        let x = (chunk_x & 31) as u8;
        let z = (chunk_z & 31) as u8;

        RegionChunkPosition::new(x, z)
    }

    /// Index of the slot in the header tables.
    pub(crate) fn metadata_index(&self) -> usize {
        self.x as usize + self.z as usize * 32
    }

    pub(crate) fn from_metadata_index(index: usize) -> RegionChunkPosition {
        RegionChunkPosition::new((index % 32) as u8, (index / 32) as u8)
    }

    /// World chunk position of this slot inside `region`.
    pub fn chunk_position(&self, region: RegionPosition) -> ChunkPosition {
        ChunkPosition::new(region.x * 32 + self.x as i32, region.z * 32 + self.z as i32)
    }
}

/// Absolute block coordinates.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Copy, Clone)]
pub struct BlockPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPosition {
    pub fn new(x: i32, y: i32, z: i32) -> BlockPosition {
        BlockPosition { x, y, z }
    }

    pub fn chunk_position(&self) -> ChunkPosition {
        ChunkPosition::new(self.x.div_euclid(16), self.z.div_euclid(16))
    }

    pub fn section_position(&self) -> SectionPosition {
        SectionPosition::new(
            self.x.div_euclid(16),
            self.y.div_euclid(16),
            self.z.div_euclid(16),
        )
    }

    /// Coordinates inside the 16x16x16 section, each in `0..16`.
    pub fn section_local(&self) -> (u8, u8, u8) {
        (
            self.x.rem_euclid(16) as u8,
            self.y.rem_euclid(16) as u8,
            self.z.rem_euclid(16) as u8,
        )
    }
}

/// Section coordinates: chunk x, section y index, chunk z.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Copy, Clone)]
pub struct SectionPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl SectionPosition {
    pub fn new(x: i32, y: i32, z: i32) -> SectionPosition {
        SectionPosition { x, y, z }
    }

    pub fn chunk_position(&self) -> ChunkPosition {
        ChunkPosition::new(self.x, self.z)
    }
}

impl Display for SectionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use crate::position::{
        BlockPosition, ChunkPosition, RegionChunkPosition, RegionPosition, SectionPosition,
    };

    #[test]
    fn test_region_position_floors_negative_chunks() {
        assert_eq!(
            ChunkPosition::new(-1, -1).region_position(),
            RegionPosition::new(-1, -1)
        );
        assert_eq!(
            ChunkPosition::new(31, 31).region_position(),
            RegionPosition::new(0, 0)
        );
        assert_eq!(
            ChunkPosition::new(32, 0).region_position(),
            RegionPosition::new(1, 0)
        );
        assert_eq!(
            ChunkPosition::new(-32, -33).region_position(),
            RegionPosition::new(-1, -2)
        );
    }

    #[test]
    fn test_region_chunk_position_wraps_negative_chunks() {
        let position = ChunkPosition::new(-1, -32).region_chunk_position();

        assert_eq!(position, RegionChunkPosition::new(31, 0));
        assert_eq!(position.metadata_index(), 31);
        assert_eq!(
            RegionChunkPosition::new(15, 3).metadata_index(),
            15 + 3 * 32
        );
    }

    #[test]
    fn test_metadata_index_round_trip() {
        for index in 0..1024 {
            assert_eq!(
                RegionChunkPosition::from_metadata_index(index).metadata_index(),
                index
            );
        }
    }

    #[test]
    fn test_chunk_position_inside_region() {
        let region = RegionPosition::new(-1, 2);
        let chunk = RegionChunkPosition::new(31, 0).chunk_position(region);

        assert_eq!(chunk, ChunkPosition::new(-1, 64));
        assert_eq!(chunk.region_position(), region);
    }

    #[test]
    fn test_file_name_parse() {
        assert_eq!(
            RegionPosition::from_file_name("r.-1.1.mca"),
            Some(RegionPosition::new(-1, 1))
        );
        assert_eq!(RegionPosition::new(3, -7).file_name(), "r.3.-7.mca");
    }

    #[test]
    fn test_file_name_parse_invalid_format() {
        assert_eq!(RegionPosition::from_file_name("this is not a valid region.filename"), None);
        assert_eq!(RegionPosition::from_file_name("r.a.1.mca"), None);
        assert_eq!(RegionPosition::from_file_name("r.0.0.mcr"), None);
    }

    #[test]
    fn test_block_position_negative_flooring() {
        let block = BlockPosition::new(-1, -17, 18);

        assert_eq!(block.chunk_position(), ChunkPosition::new(-1, 1));
        assert_eq!(block.section_position(), SectionPosition::new(-1, -2, 1));
        assert_eq!(block.section_local(), (15, 15, 2));
    }
}
