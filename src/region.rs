use crate::chunk::ChunkView;
use crate::error::{ChunkReadError, ChunkWriteError};
use crate::nbt::{read_gzip_compound_tag, read_zlib_compound_tag};
use crate::position::{ChunkPosition, RegionChunkPosition, RegionPosition};
use bitvec::prelude::*;
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use log::debug;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Amount of chunks in region.
pub const REGION_CHUNKS: usize = 1024;
/// Region sector length in bytes.
pub(crate) const REGION_SECTOR_BYTES_LENGTH: usize = 4096;
/// Region header length in bytes: sector descriptors followed by timestamps.
pub(crate) const REGION_HEADER_BYTES_LENGTH: usize = 2 * REGION_SECTOR_BYTES_LENGTH;
/// Offset of the timestamps table inside the header.
const REGION_TIMESTAMPS_OFFSET: usize = REGION_SECTOR_BYTES_LENGTH;
/// Sector count is stored in one byte.
const CHUNK_MAXIMUM_SECTORS: usize = 255;
/// Sector offset is stored in three bytes.
const MAXIMUM_SECTOR_INDEX: usize = 0xFF_FFFF;

/// Gzip compression type value.
pub(crate) const GZIP_COMPRESSION_TYPE: u8 = 1;
/// Zlib compression type value.
pub(crate) const ZLIB_COMPRESSION_TYPE: u8 = 2;

/// Region represents a 32x32 group of chunks, held in memory as raw file bytes.
///
/// Mutations only touch the buffer until [`Region::flush`] writes it back.
#[derive(Debug)]
pub struct Region {
    position: RegionPosition,
    /// File the region was read from and is flushed to.
    path: PathBuf,
    /// Whole file contents, at least header long.
    data: Vec<u8>,
    /// Used sectors for header and chunks data.
    used_sectors: BitVec,
}

/// Chunk location as stored in the header.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChunkLocation {
    /// Sector index from which starts chunk data.
    pub start_sector_index: u32,
    /// Amount of sectors used to store chunk.
    pub sectors: u8,
}

impl ChunkLocation {
    fn new(start_sector_index: u32, sectors: u8) -> Self {
        ChunkLocation {
            start_sector_index,
            sectors,
        }
    }

    /// Empty slots have a zero offset or a zero sector count.
    fn from_descriptor(descriptor: u32) -> Option<Self> {
        let start_sector_index = descriptor >> 8;
        let sectors = (descriptor & 0xFF) as u8;

        if start_sector_index == 0 || sectors == 0 {
            return None;
        }

        Some(ChunkLocation::new(start_sector_index, sectors))
    }

    fn descriptor(&self) -> u32 {
        (self.start_sector_index << 8) | self.sectors as u32
    }

    /// Byte offset of the chunk record.
    pub fn offset(&self) -> usize {
        self.start_sector_index as usize * REGION_SECTOR_BYTES_LENGTH
    }

    /// Byte length of the sectors allocated to the chunk.
    pub fn length(&self) -> usize {
        self.sectors as usize * REGION_SECTOR_BYTES_LENGTH
    }
}

fn read_location(data: &[u8], metadata_index: usize) -> Option<ChunkLocation> {
    let descriptor = BigEndian::read_u32(&data[metadata_index * 4..]);
    ChunkLocation::from_descriptor(descriptor)
}

/// Calculates used sectors. Sectors past the end of the file are ignored.
fn used_sectors(total_sectors: usize, locations: &[ChunkLocation]) -> BitVec {
    // First two sectors are used to store header.
    let mut used_sectors = bitvec![0; total_sectors.max(2)];

    used_sectors.set(0, true);
    used_sectors.set(1, true);

    for location in locations {
        let start_index = location.start_sector_index as usize;
        let end_index = (start_index + location.sectors as usize).min(used_sectors.len());

        for index in start_index..end_index {
            used_sectors.set(index, true);
        }
    }

    used_sectors
}

impl Region {
    /// Reads the region file at `path`. A missing file is `io::ErrorKind::NotFound`.
    pub fn open<P: AsRef<Path>>(position: RegionPosition, path: P) -> Result<Self, io::Error> {
        let path = path.as_ref().to_path_buf();
        let mut data = fs::read(&path)?;

        // A file shorter than the header is treated as empty slots.
        if REGION_HEADER_BYTES_LENGTH > data.len() {
            debug!(
                target: "anvil-worldtools",
                "Region {} is {} bytes long, extending to header length",
                position,
                data.len()
            );
            data.resize(REGION_HEADER_BYTES_LENGTH, 0);
        }

        let total_sectors =
            (data.len() + (REGION_SECTOR_BYTES_LENGTH - 1)) / REGION_SECTOR_BYTES_LENGTH;
        let locations: Vec<ChunkLocation> = (0..REGION_CHUNKS)
            .filter_map(|metadata_index| read_location(&data, metadata_index))
            .collect();

        let used_sectors = used_sectors(total_sectors, &locations);

        debug!(
            target: "anvil-worldtools",
            "Opened region {} with {} chunks in {} sectors",
            position,
            locations.len(),
            total_sectors
        );

        Ok(Region {
            position,
            path,
            data,
            used_sectors,
        })
    }

    pub fn position(&self) -> RegionPosition {
        self.position
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sector location of a chunk, `None` for an empty slot.
    pub fn locate(&self, chunk: ChunkPosition) -> Option<ChunkLocation> {
        read_location(&self.data, chunk.region_chunk_position().metadata_index())
    }

    /// Last modification time of a chunk slot in seconds since the Unix epoch.
    pub fn timestamp(&self, chunk: ChunkPosition) -> u32 {
        let metadata_index = chunk.region_chunk_position().metadata_index();
        BigEndian::read_u32(&self.data[REGION_TIMESTAMPS_OFFSET + metadata_index * 4..])
    }

    /// Positions of every chunk present in the region.
    pub fn chunk_positions(&self) -> Vec<ChunkPosition> {
        (0..REGION_CHUNKS)
            .filter(|&metadata_index| read_location(&self.data, metadata_index).is_some())
            .map(|metadata_index| {
                RegionChunkPosition::from_metadata_index(metadata_index)
                    .chunk_position(self.position)
            })
            .collect()
    }

    /// Raw bytes of the sectors holding the chunk, including trailing padding.
    pub fn get_raw_chunk(&self, chunk: ChunkPosition) -> Result<&[u8], ChunkReadError> {
        let location = self
            .locate(chunk)
            .ok_or(ChunkReadError::ChunkNotFound { position: chunk })?;

        let sectors_start = location.offset();
        let sectors_end = sectors_start + location.length();

        if sectors_end > self.data.len() {
            return Err(ChunkReadError::SectorsOutOfBounds {
                position: chunk,
                sectors_end,
                region_length: self.data.len(),
            });
        }

        Ok(&self.data[sectors_start..sectors_end])
    }

    pub fn get_chunk(&self, chunk: ChunkPosition) -> Result<ChunkView, ChunkReadError> {
        let raw = self.get_raw_chunk(chunk)?;
        let maximum_length = (raw.len() - 4) as u32;

        let mut reader = raw;
        let length = reader.read_u32::<BigEndian>()?;

        // Length counts the compression scheme byte.
        if length == 0 || length > maximum_length {
            return Err(ChunkReadError::LengthExceedsMaximum {
                length,
                maximum_length,
            });
        }

        let compression_scheme = reader.read_u8()?;
        let mut compressed = &reader[..(length - 1) as usize];

        let root = match compression_scheme {
            GZIP_COMPRESSION_TYPE => read_gzip_compound_tag(&mut compressed)?,
            ZLIB_COMPRESSION_TYPE => read_zlib_compound_tag(&mut compressed)?,
            _ => return Err(ChunkReadError::UnsupportedCompressionScheme { compression_scheme }),
        };

        Ok(ChunkView::new(chunk, root))
    }

    /// Replaces the payload of an existing chunk slot with `raw`.
    ///
    /// A payload that no longer fits its sectors is moved to the first free gap
    /// or appended to the end of the region. Other chunks are never overwritten.
    pub fn set_chunk(&mut self, chunk: ChunkPosition, raw: &[u8]) -> Result<(), ChunkWriteError> {
        let location = self
            .locate(chunk)
            .ok_or(ChunkWriteError::ChunkNotFound { position: chunk })?;

        if raw.is_empty() {
            return Err(ChunkWriteError::EmptyPayload { position: chunk });
        }

        let sectors_required =
            (raw.len() + REGION_SECTOR_BYTES_LENGTH - 1) / REGION_SECTOR_BYTES_LENGTH;

        if sectors_required > CHUNK_MAXIMUM_SECTORS {
            return Err(ChunkWriteError::LengthExceedsMaximum { length: raw.len() });
        }

        let new_location = self.find_place(chunk, location, sectors_required)?;
        let sectors_start = new_location.offset();
        let sectors_end = sectors_start + new_location.length();

        if sectors_end > self.data.len() {
            self.data.resize(sectors_end, 0);
        }

        let payload_end = sectors_start + raw.len();
        self.data[sectors_start..payload_end].copy_from_slice(raw);

        // Padding to align sector.
        for byte in &mut self.data[payload_end..sectors_end] {
            *byte = 0;
        }

        self.update_header(chunk.region_chunk_position(), new_location);

        Ok(())
    }

    /// Finds sectors for a payload and updates the used sectors map.
    ///
    /// The chunk's own sectors count as free while searching.
    fn find_place(
        &mut self,
        chunk: ChunkPosition,
        location: ChunkLocation,
        sectors_required: usize,
    ) -> Result<ChunkLocation, ChunkWriteError> {
        let old_start = location.start_sector_index as usize;
        let old_end = old_start + location.sectors as usize;

        // Chunk still fits in the old place.
        if sectors_required <= location.sectors as usize {
            debug!(
                target: "anvil-worldtools",
                "Region {} chunk {} with {} sectors still fits in the old place",
                self.position, chunk, sectors_required
            );

            self.mark_sectors(old_start, old_start + sectors_required, true);
            self.mark_sectors(old_start + sectors_required, old_end, false);

            return Ok(ChunkLocation::new(
                location.start_sector_index,
                sectors_required as u8,
            ));
        }

        let is_free = |sector_index: usize| {
            (old_start..old_end).contains(&sector_index) || !self.used_sectors[sector_index]
        };

        // Trying to find enough big gap between sectors to put chunk.
        let mut sectors_free = 0;
        let mut put_sector_index = None;

        for sector_index in 0..self.used_sectors.len() {
            if !is_free(sector_index) {
                sectors_free = 0;
                continue;
            }

            sectors_free += 1;

            if sectors_free == sectors_required {
                put_sector_index = Some(sector_index + 1 - sectors_free);
                break;
            }
        }

        // Otherwise the free sectors at the end are extended.
        let put_sector_index =
            put_sector_index.unwrap_or_else(|| self.used_sectors.len() - sectors_free);

        if put_sector_index > MAXIMUM_SECTOR_INDEX {
            return Err(ChunkWriteError::SectorOffsetOverflow {
                sector: put_sector_index,
            });
        }

        debug!(
            target: "anvil-worldtools",
            "Region {} chunk {} with {} required sectors moves from sector {} to {}",
            self.position, chunk, sectors_required, old_start, put_sector_index
        );

        self.mark_sectors(old_start, old_end, false);
        self.mark_sectors(put_sector_index, put_sector_index + sectors_required, true);

        Ok(ChunkLocation::new(
            put_sector_index as u32,
            sectors_required as u8,
        ))
    }

    fn mark_sectors(&mut self, start_index: usize, end_index: usize, used: bool) {
        if used && end_index > self.used_sectors.len() {
            self.used_sectors.resize(end_index, false);
        }

        let end_index = end_index.min(self.used_sectors.len());

        for index in start_index..end_index {
            self.used_sectors.set(index, used);
        }
    }

    /// Writes the sector descriptor and the current time into the header.
    fn update_header(&mut self, region_chunk: RegionChunkPosition, location: ChunkLocation) {
        let metadata_index = region_chunk.metadata_index();
        let last_modified_timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_secs() as u32)
            .unwrap_or(0);

        let offset = metadata_index * 4;
        BigEndian::write_u32(&mut self.data[offset..offset + 4], location.descriptor());

        let offset = REGION_TIMESTAMPS_OFFSET + metadata_index * 4;
        BigEndian::write_u32(&mut self.data[offset..offset + 4], last_modified_timestamp);
    }

    /// Writes the buffer to a sibling temporary file and renames it over the region file.
    pub fn flush(&self) -> Result<(), io::Error> {
        let mut temp_path = self.path.clone().into_os_string();
        temp_path.push(".tmp");
        let temp_path = PathBuf::from(temp_path);

        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&self.data)?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.path)?;

        debug!(
            target: "anvil-worldtools",
            "Flushed region {} ({} bytes) to {}",
            self.position,
            self.data.len(),
            self.path.display()
        );

        Ok(())
    }
}
