use crate::error::ChunkReadError;
use crate::heightmap::{Heightmap, HeightmapKind};
use crate::nbt::{CompoundTag, CompoundTagError, Tag};
use crate::packed::{self, BLOCK_STATES_LEN};
use crate::position::{ChunkPosition, SectionPosition};

/// Decoded chunk compound with section and heightmap lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkView {
    position: ChunkPosition,
    root: CompoundTag,
}

impl ChunkView {
    pub fn new(position: ChunkPosition, root: CompoundTag) -> Self {
        ChunkView { position, root }
    }

    pub fn position(&self) -> ChunkPosition {
        self.position
    }

    pub fn root(&self) -> &CompoundTag {
        &self.root
    }

    pub fn into_root(self) -> CompoundTag {
        self.root
    }

    pub fn level(&self) -> Result<&CompoundTag, ChunkReadError> {
        Ok(self.root.get_compound_tag("Level")?)
    }

    /// Section compounds in storage order. A chunk without `Sections` has none.
    fn section_tags(&self) -> Result<Vec<&CompoundTag>, ChunkReadError> {
        match self.level()?.get_compound_tag_vec("Sections") {
            Ok(sections) => Ok(sections),
            Err(CompoundTagError::TagNotFound { .. }) => Ok(Vec::new()),
            Err(error) => Err(error.into()),
        }
    }

    /// Looks up the section with index `y`.
    pub fn get_section(&self, y: i32) -> Result<Section<'_>, ChunkReadError> {
        let position = SectionPosition::new(self.position.x, y, self.position.z);

        for section_tag in self.section_tags()? {
            if section_tag.get_i8("Y")? as i32 != y {
                continue;
            }

            if !section_tag.contains_key("Palette") {
                break;
            }

            return Section::new(position, section_tag);
        }

        Err(ChunkReadError::SectionNotPresent { position })
    }

    /// Indices of the sections that carry block data.
    pub fn section_indices(&self) -> Result<Vec<i32>, ChunkReadError> {
        let mut indices = Vec::new();

        for section_tag in self.section_tags()? {
            if section_tag.contains_key("Palette") {
                indices.push(section_tag.get_i8("Y")? as i32);
            }
        }

        Ok(indices)
    }

    pub fn heightmap(&self, kind: HeightmapKind) -> Result<Heightmap, ChunkReadError> {
        Heightmap::from_chunk(self, kind)
    }

    /// Raw packed words of a heightmap.
    pub(crate) fn heightmap_words(&self, kind: HeightmapKind) -> Result<&[i64], ChunkReadError> {
        let not_found = || ChunkReadError::HeightmapNotFound {
            kind,
            position: self.position,
        };

        let heightmaps = match self.level()?.get_compound_tag("Heightmaps") {
            Ok(heightmaps) => heightmaps,
            Err(CompoundTagError::TagNotFound { .. }) => return Err(not_found()),
            Err(error) => return Err(error.into()),
        };

        match heightmaps.get_i64_vec(kind.as_str()) {
            Ok(words) => Ok(words),
            Err(CompoundTagError::TagNotFound { .. }) => Err(not_found()),
            Err(error) => Err(error.into()),
        }
    }
}

/// One 16x16x16 slice of a chunk with its decoded block states.
#[derive(Debug, Clone)]
pub struct Section<'a> {
    position: SectionPosition,
    palette: &'a [Tag],
    block_states: Vec<u16>,
}

impl<'a> Section<'a> {
    fn new(position: SectionPosition, section_tag: &'a CompoundTag) -> Result<Self, ChunkReadError> {
        let palette = section_tag.get_list("Palette")?;
        let words = section_tag.get_i64_vec("BlockStates")?;
        let block_states = packed::decode_longs(words, BLOCK_STATES_LEN)?;

        Ok(Section {
            position,
            palette,
            block_states,
        })
    }

    pub fn position(&self) -> SectionPosition {
        self.position
    }

    pub fn palette(&self) -> &'a [Tag] {
        self.palette
    }

    /// Palette index of the block at local coordinates.
    pub fn palette_index(&self, x: u8, y: u8, z: u8) -> Result<u16, ChunkReadError> {
        if x >= 16 || y >= 16 || z >= 16 {
            return Err(ChunkReadError::BlockOutOfBounds { x, y, z });
        }

        let index = y as usize * 256 + z as usize * 16 + x as usize;
        Ok(self.block_states[index])
    }

    /// Palette entry (block state compound) of the block at local coordinates.
    pub fn get_block(&self, x: u8, y: u8, z: u8) -> Result<&'a Tag, ChunkReadError> {
        let index = self.palette_index(x, y, z)?;

        self.palette
            .get(index as usize)
            .ok_or(ChunkReadError::PaletteIndexOutOfRange {
                index,
                palette_length: self.palette.len(),
            })
    }
}
