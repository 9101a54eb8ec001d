use crate::heightmap::HeightmapKind;
use crate::nbt::{CompoundTagError, TagDecodeError};
use crate::packed::PackedArrayError;
use crate::position::{ChunkPosition, RegionPosition, SectionPosition};
use std::{error::Error, fmt::Display, io};

/// Possible errors while loading a chunk or looking into it.
#[derive(Debug)]
pub enum ChunkReadError {
    /// Chunk slot inside the region is empty.
    ChunkNotFound { position: ChunkPosition },
    /// World has no file for this region at all.
    RegionFileMissing { position: RegionPosition },
    /// Chunk was looked up in a region it does not belong to.
    ChunkOutsideRegion {
        position: ChunkPosition,
        region: RegionPosition,
    },
    /// Header points past the end of the region file.
    ///
    /// Region file are corrupted or truncated.
    SectorsOutOfBounds {
        position: ChunkPosition,
        /// Byte offset where the chunk sectors end.
        sectors_end: usize,
        /// Byte length of the region file.
        region_length: usize,
    },
    /// Chunk length overlaps declared maximum.
    ///
    /// This should not occur under normal conditions.
    ///
    /// Region file are corrupted.
    LengthExceedsMaximum {
        /// Chunk length.
        length: u32,
        /// Chunk maximum expected length.
        maximum_length: u32,
    },
    /// Only Gzip (1) and Zlib (2) are supported.
    UnsupportedCompressionScheme {
        /// Compression scheme type id.
        compression_scheme: u8,
    },
    /// Section has no palette or is not stored at all.
    SectionNotPresent { position: SectionPosition },
    /// Chunk does not store a heightmap of this kind.
    HeightmapNotFound {
        kind: HeightmapKind,
        position: ChunkPosition,
    },
    /// Local block coordinates must be in `0..16`.
    BlockOutOfBounds { x: u8, y: u8, z: u8 },
    /// Block state points past the end of the section palette.
    PaletteIndexOutOfRange { index: u16, palette_length: usize },
    /// Chunk tag lacks a field or stores it with an unexpected type.
    MalformedChunk { compound_tag_error: CompoundTagError },
    /// Packed block states or heightmap have an unsupported size.
    PackedArrayError { packed_array_error: PackedArrayError },
    /// I/O Error which happened while were reading chunk data from region file.
    IOError { io_error: io::Error },
    /// Error while decoding binary data to NBT tag.
    ///
    /// This should not occur under normal conditions.
    ///
    /// Region file are corrupted.
    TagDecodeError { tag_decode_error: TagDecodeError },
}

impl From<io::Error> for ChunkReadError {
    fn from(io_error: io::Error) -> Self {
        ChunkReadError::IOError { io_error }
    }
}

impl From<TagDecodeError> for ChunkReadError {
    fn from(tag_decode_error: TagDecodeError) -> Self {
        ChunkReadError::TagDecodeError { tag_decode_error }
    }
}

impl From<CompoundTagError> for ChunkReadError {
    fn from(compound_tag_error: CompoundTagError) -> Self {
        ChunkReadError::MalformedChunk { compound_tag_error }
    }
}

impl From<PackedArrayError> for ChunkReadError {
    fn from(packed_array_error: PackedArrayError) -> Self {
        ChunkReadError::PackedArrayError { packed_array_error }
    }
}

impl Error for ChunkReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        use ChunkReadError::*;
        match self {
            IOError { io_error } => Some(io_error),
            TagDecodeError { tag_decode_error } => Some(tag_decode_error),
            MalformedChunk { compound_tag_error } => Some(compound_tag_error),
            PackedArrayError { packed_array_error } => Some(packed_array_error),
            _ => None,
        }
    }
}

impl Display for ChunkReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ChunkReadError::*;
        match self {
            ChunkNotFound { position } => write!(f, "Chunk {} not found", position),
            RegionFileMissing { position } => write!(f, "Region {} has no file", position),
            ChunkOutsideRegion { position, region } => {
                write!(f, "Chunk {} is not part of region {}", position, region)
            }
            SectorsOutOfBounds {
                position,
                sectors_end,
                region_length,
            } => write!(
                f,
                "Chunk {} sectors end at {} past region length {}",
                position, sectors_end, region_length
            ),
            LengthExceedsMaximum {
                length,
                maximum_length,
            } => write!(
                f,
                "Chunk length of {} exceeds maximum ({})",
                length, maximum_length
            ),
            UnsupportedCompressionScheme { compression_scheme } => {
                write!(f, "Unsupported compression scheme: {}", compression_scheme)
            }
            SectionNotPresent { position } => write!(f, "Section {} not present", position),
            HeightmapNotFound { kind, position } => {
                write!(f, "Heightmap {} not found in chunk {}", kind, position)
            }
            BlockOutOfBounds { x, y, z } => {
                write!(f, "Block {}, {}, {} is outside of the section", x, y, z)
            }
            PaletteIndexOutOfRange {
                index,
                palette_length,
            } => write!(
                f,
                "Palette index {} out of range for palette of {}",
                index, palette_length
            ),
            MalformedChunk { .. } => write!(f, "Malformed chunk data"),
            PackedArrayError { .. } => write!(f, "Failed to unpack packed array"),
            IOError { .. } => write!(f, "IO Error"),
            TagDecodeError { .. } => write!(f, "Failed to decode nbt"),
        }
    }
}

/// Possible errors while replacing chunk data inside a region.
#[derive(Debug)]
pub enum ChunkWriteError {
    /// Region has no slot for this chunk; new slots are never allocated.
    ChunkNotFound { position: ChunkPosition },
    /// Chunk payload is empty.
    EmptyPayload { position: ChunkPosition },
    /// Chunk needs more than 255 sectors (about 1 MB).
    LengthExceedsMaximum {
        /// Payload length.
        length: usize,
    },
    /// Relocated chunk would start past the 24-bit sector offset range.
    SectorOffsetOverflow { sector: usize },
}

impl Error for ChunkWriteError {}

impl Display for ChunkWriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ChunkWriteError::*;
        match self {
            ChunkNotFound { position } => write!(f, "Chunk {} has no slot in region", position),
            EmptyPayload { position } => write!(f, "Chunk {} payload is empty", position),
            LengthExceedsMaximum { length } => {
                write!(f, "Chunk length of {} exceeds maximum (1mb)", length)
            }
            SectorOffsetOverflow { sector } => {
                write!(f, "Sector offset {} does not fit the header", sector)
            }
        }
    }
}

/// Restoration failure of one region. Regions restored before it stay flushed.
#[derive(Debug)]
pub enum RestoreError {
    /// Region could not be opened or a chunk could not be read.
    ReadError {
        region: RegionPosition,
        chunk_read_error: ChunkReadError,
    },
    /// A chunk could not be written into the target region.
    WriteError {
        region: RegionPosition,
        chunk_write_error: ChunkWriteError,
    },
    /// Target region could not be written back to disk.
    FlushError {
        region: RegionPosition,
        io_error: io::Error,
    },
}

impl RestoreError {
    pub fn region(&self) -> RegionPosition {
        use RestoreError::*;
        match self {
            ReadError { region, .. } | WriteError { region, .. } | FlushError { region, .. } => {
                *region
            }
        }
    }
}

impl Error for RestoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        use RestoreError::*;
        match self {
            ReadError {
                chunk_read_error, ..
            } => Some(chunk_read_error),
            WriteError {
                chunk_write_error, ..
            } => Some(chunk_write_error),
            FlushError { io_error, .. } => Some(io_error),
        }
    }
}

impl Display for RestoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use RestoreError::*;
        match self {
            ReadError {
                region,
                chunk_read_error,
            } => write!(f, "Failed to read region {}: {}", region, chunk_read_error),
            WriteError {
                region,
                chunk_write_error,
            } => write!(f, "Failed to write region {}: {}", region, chunk_write_error),
            FlushError { region, .. } => write!(f, "Failed to flush region {}", region),
        }
    }
}
