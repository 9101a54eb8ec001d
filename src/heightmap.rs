use crate::chunk::{ChunkView, Section};
use crate::error::ChunkReadError;
use crate::nbt::Tag;
use crate::packed::{self, PackedArrayError};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::{self, Display};

/// Amount of columns in a chunk.
const HEIGHTMAP_VALUES: usize = 256;
/// Bits per stored height.
const HEIGHTMAP_BITS_PER_VALUE: usize = 9;
/// Word count of a densely packed heightmap.
const DENSE_WORDS_LENGTH: usize = 36;
/// Word count of a heightmap packed 7 values per word.
const PADDED_WORDS_LENGTH: usize = 37;
const PADDED_VALUES_PER_WORD: usize = 64 / HEIGHTMAP_BITS_PER_VALUE;

/// Heightmaps stored by the game in `Level.Heightmaps`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum HeightmapKind {
    MotionBlocking,
    MotionBlockingNoLeaves,
    OceanFloor,
    WorldSurface,
}

impl HeightmapKind {
    /// Highest block that blocks motion or is a fluid, excluding leaves.
    pub const HIGHEST_SOLID: HeightmapKind = HeightmapKind::OceanFloor;
    /// Highest block that is not air.
    pub const HIGHEST_NON_AIR: HeightmapKind = HeightmapKind::WorldSurface;

    pub const ALL: [HeightmapKind; 4] = [
        HeightmapKind::MotionBlocking,
        HeightmapKind::MotionBlockingNoLeaves,
        HeightmapKind::OceanFloor,
        HeightmapKind::WorldSurface,
    ];

    /// Key of the heightmap inside `Level.Heightmaps`.
    pub fn as_str(&self) -> &'static str {
        match self {
            HeightmapKind::MotionBlocking => "MOTION_BLOCKING",
            HeightmapKind::MotionBlockingNoLeaves => "MOTION_BLOCKING_NO_LEAVES",
            HeightmapKind::OceanFloor => "OCEAN_FLOOR",
            HeightmapKind::WorldSurface => "WORLD_SURFACE",
        }
    }

    /// Accepts the NBT keys and the `HIGHEST_SOLID` / `HIGHEST_NONAIR` aliases.
    pub fn from_name(name: &str) -> Option<HeightmapKind> {
        match name {
            "MOTION_BLOCKING" => Some(HeightmapKind::MotionBlocking),
            "MOTION_BLOCKING_NO_LEAVES" => Some(HeightmapKind::MotionBlockingNoLeaves),
            "OCEAN_FLOOR" | "HIGHEST_SOLID" => Some(HeightmapKind::OceanFloor),
            "WORLD_SURFACE" | "HIGHEST_NONAIR" => Some(HeightmapKind::WorldSurface),
            _ => None,
        }
    }
}

impl Display for HeightmapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column heights of one chunk, indexed `[x][z]`.
///
/// A column with nothing recorded has height -1.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Heightmap {
    kind: HeightmapKind,
    heights: [[i32; 16]; 16],
}

impl Heightmap {
    pub fn from_chunk(chunk: &ChunkView, kind: HeightmapKind) -> Result<Self, ChunkReadError> {
        let words = chunk.heightmap_words(kind)?;
        let values = decode_heightmap(words)?;
        let mut heights = [[0; 16]; 16];

        for (index, value) in values.into_iter().enumerate() {
            heights[index % 16][index / 16] = value as i32 - 1;
        }

        Ok(Heightmap { kind, heights })
    }

    pub fn kind(&self) -> HeightmapKind {
        self.kind
    }

    /// Height of column `x`, `z`, `None` outside of `0..16`.
    pub fn height(&self, x: u8, z: u8) -> Option<i32> {
        self.heights
            .get(x as usize)
            .and_then(|column| column.get(z as usize))
            .copied()
    }

    pub fn heights(&self) -> &[[i32; 16]; 16] {
        &self.heights
    }

    /// Palette entry of the block at the recorded height of every column.
    ///
    /// Columns without a recorded height are `None`. Sections are decoded once per sweep.
    pub fn get_blocks<'a>(
        &self,
        chunk: &'a ChunkView,
    ) -> Result<Vec<Vec<Option<&'a Tag>>>, ChunkReadError> {
        let mut sections: HashMap<i32, Section<'a>> = HashMap::new();
        let mut blocks = Vec::with_capacity(16);

        for x in 0..16u8 {
            let mut column = Vec::with_capacity(16);

            for z in 0..16u8 {
                let height = self.heights[x as usize][z as usize];

                if height < 0 {
                    column.push(None);
                    continue;
                }

                let section_y = height.div_euclid(16);

                let section = match sections.entry(section_y) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => entry.insert(chunk.get_section(section_y)?),
                };

                let local_y = height.rem_euclid(16) as u8;
                column.push(Some(section.get_block(x, local_y, z)?));
            }

            blocks.push(column);
        }

        Ok(blocks)
    }
}

/// Decodes the 256 stored (unbiased) column values.
///
/// 36 words hold the values densely, spanning word boundaries. 37 words hold
/// 7 values per word with the top bit of each word unused.
pub fn decode_heightmap(words: &[i64]) -> Result<Vec<u16>, PackedArrayError> {
    match words.len() {
        DENSE_WORDS_LENGTH => packed::decode_longs(words, HEIGHTMAP_VALUES),
        PADDED_WORDS_LENGTH => {
            let mask = (1u64 << HEIGHTMAP_BITS_PER_VALUE) - 1;

            let values = (0..HEIGHTMAP_VALUES)
                .map(|index| {
                    let word = words[index / PADDED_VALUES_PER_WORD] as u64;
                    let shift = (index % PADDED_VALUES_PER_WORD) * HEIGHTMAP_BITS_PER_VALUE;

                    ((word >> shift) & mask) as u16
                })
                .collect();

            Ok(values)
        }
        word_count => Err(PackedArrayError::UnsupportedBitsPerValue {
            word_count,
            total_values: HEIGHTMAP_VALUES,
        }),
    }
}
