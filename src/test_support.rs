//! Fixture builders shared by the unit tests.

use crate::nbt::{CompoundTag, Tag};
use crate::position::RegionPosition;
use crate::region::{GZIP_COMPRESSION_TYPE, REGION_HEADER_BYTES_LENGTH, REGION_SECTOR_BYTES_LENGTH};
use bitvec::prelude::*;
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Timestamp written by [`RegionBuilder`] for every slot.
pub const FIXTURE_TIMESTAMP: u32 = 1_570_215_508;

/// Encodes a root compound with `named_binary_tag`, the crate itself never writes NBT.
pub fn encode_compound_tag(name: &str, compound_tag: &CompoundTag) -> Vec<u8> {
    let mut root = named_binary_tag::CompoundTag::named(name);
    copy_compound_tag(&mut root, compound_tag);

    let mut buffer = Vec::new();
    named_binary_tag::encode::write_compound_tag(&mut buffer, root).unwrap();

    buffer
}

fn binary_compound_tag(compound_tag: &CompoundTag) -> named_binary_tag::CompoundTag {
    let mut binary_tag = named_binary_tag::CompoundTag::new();
    copy_compound_tag(&mut binary_tag, compound_tag);

    binary_tag
}

/// Fixtures only hold lists of compounds, other list element types panic.
fn copy_compound_tag(binary_tag: &mut named_binary_tag::CompoundTag, compound_tag: &CompoundTag) {
    for (name, tag) in compound_tag.iter() {
        match tag {
            Tag::Byte(value) => binary_tag.insert_i8(name, *value),
            Tag::Short(value) => binary_tag.insert_i16(name, *value),
            Tag::Int(value) => binary_tag.insert_i32(name, *value),
            Tag::Long(value) => binary_tag.insert_i64(name, *value),
            Tag::Float(value) => binary_tag.insert_f32(name, *value),
            Tag::Double(value) => binary_tag.insert_f64(name, *value),
            Tag::ByteArray(values) => binary_tag.insert_i8_vec(name, values.clone()),
            Tag::String(value) => binary_tag.insert_str(name, value),
            Tag::Compound(value) => {
                binary_tag.insert_compound_tag(name, binary_compound_tag(value))
            }
            Tag::IntArray(values) => binary_tag.insert_i32_vec(name, values.clone()),
            Tag::LongArray(values) => binary_tag.insert_i64_vec(name, values.clone()),
            Tag::List(tags) => {
                let compound_tags = tags
                    .iter()
                    .map(|tag| match tag {
                        Tag::Compound(value) => binary_compound_tag(value),
                        tag => panic!("Unsupported list element `{:?}` in `{}`", tag, name),
                    })
                    .collect();

                binary_tag.insert_compound_tag_vec(name, compound_tags)
            }
            Tag::End => panic!("Unexpected `End` tag `{}` in fixture", name),
        }
    }
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// On-disk chunk record: length, compression scheme, compressed root compound.
pub fn chunk_record(root: &CompoundTag, compression_scheme: u8) -> Vec<u8> {
    let encoded = encode_compound_tag("", root);
    let compressed = if compression_scheme == GZIP_COMPRESSION_TYPE {
        gzip(&encoded)
    } else {
        zlib(&encoded)
    };

    let mut record = Vec::new();
    record
        .write_u32::<BigEndian>(compressed.len() as u32 + 1)
        .unwrap();
    record.write_u8(compression_scheme).unwrap();
    record.extend_from_slice(&compressed);

    record
}

/// Packs values LSB-first into a continuous bit stream over 64-bit words.
pub fn pack_reference(values: &[u16], bits_per_value: usize) -> Vec<u64> {
    let mut bits: BitVec<u64, Lsb0> = BitVec::new();

    for &value in values {
        for bit in 0..bits_per_value {
            bits.push((value >> bit) & 1 == 1);
        }
    }

    bits.into_vec()
}

pub fn pack_reference_longs(values: &[u16], bits_per_value: usize) -> Vec<i64> {
    pack_reference(values, bits_per_value)
        .into_iter()
        .map(|word| word as i64)
        .collect()
}

/// Section with a `minecraft:<name>` palette and the given block states.
pub fn section_tag(y: i8, palette: &[&str], states: &[u16], bits_per_value: usize) -> CompoundTag {
    let palette = palette
        .iter()
        .map(|name| {
            let mut block = CompoundTag::new();
            block.insert("Name", Tag::String(format!("minecraft:{}", name)));
            Tag::Compound(block)
        })
        .collect();

    let mut section = CompoundTag::new();
    section.insert("Y", Tag::Byte(y));
    section.insert("Palette", Tag::List(palette));
    section.insert(
        "BlockStates",
        Tag::LongArray(pack_reference_longs(states, bits_per_value)),
    );

    section
}

/// Root compound of a chunk in the per-section palette layout.
pub fn chunk_tag(
    x: i32,
    z: i32,
    sections: Vec<CompoundTag>,
    heightmaps: Vec<(&str, Vec<i64>)>,
) -> CompoundTag {
    let mut heightmaps_tag = CompoundTag::new();

    for (kind, words) in heightmaps {
        heightmaps_tag.insert(kind, Tag::LongArray(words));
    }

    let mut level = CompoundTag::new();
    level.insert("xPos", Tag::Int(x));
    level.insert("zPos", Tag::Int(z));
    level.insert(
        "Sections",
        Tag::List(sections.into_iter().map(Tag::Compound).collect()),
    );
    level.insert("Heightmaps", Tag::Compound(heightmaps_tag));

    let mut root = CompoundTag::new();
    root.insert("DataVersion", Tag::Int(2230));
    root.insert("Level", Tag::Compound(level));

    root
}

/// Lays chunk records out back to back after the header.
pub struct RegionBuilder {
    header: Vec<u8>,
    body: Vec<u8>,
}

impl RegionBuilder {
    pub fn new() -> Self {
        RegionBuilder {
            header: vec![0; REGION_HEADER_BYTES_LENGTH],
            body: Vec::new(),
        }
    }

    pub fn chunk(self, x: u8, z: u8, record: &[u8]) -> Self {
        let sectors = (record.len() + REGION_SECTOR_BYTES_LENGTH - 1) / REGION_SECTOR_BYTES_LENGTH;
        self.chunk_with_sectors(x, z, record, sectors as u8)
    }

    /// Reserves `sectors` sectors for the record, which may be more than it needs.
    pub fn chunk_with_sectors(mut self, x: u8, z: u8, record: &[u8], sectors: u8) -> Self {
        let index = x as usize + z as usize * 32;
        let start_sector = 2 + self.body.len() / REGION_SECTOR_BYTES_LENGTH;
        let descriptor = (start_sector as u32) << 8 | sectors as u32;

        BigEndian::write_u32(&mut self.header[index * 4..], descriptor);
        BigEndian::write_u32(&mut self.header[4096 + index * 4..], FIXTURE_TIMESTAMP);

        let end = self.body.len() + sectors as usize * REGION_SECTOR_BYTES_LENGTH;
        self.body.extend_from_slice(record);
        self.body.resize(end, 0);

        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut data = self.header;
        data.extend_from_slice(&self.body);

        data
    }
}

/// Writes `data` as `<world>/region/r.<x>.<z>.mca`.
pub fn write_region(world_path: &Path, position: RegionPosition, data: &[u8]) -> PathBuf {
    let region_folder = world_path.join("region");
    fs::create_dir_all(&region_folder).unwrap();

    let path = region_folder.join(position.file_name());
    fs::write(&path, data).unwrap();

    path
}
