//! Dense bit-packed arrays of block state palette indices and heightmaps.
//!
//! The 64-bit words are read as their little-endian byte image and the values
//! form one LSB-first bit stream over it, so a value may start in one byte (or
//! word) and end in the next. Each width has its own group unpacker: a group is
//! the smallest run of bytes that holds a whole number of values.

use byteorder::{ByteOrder, LittleEndian};
use std::error::Error;
use std::fmt::{self, Display};

/// Values in the block state array of a section.
pub const BLOCK_STATES_LEN: usize = 4096;

pub const MIN_BITS_PER_VALUE: usize = 4;
pub const MAX_BITS_PER_VALUE: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackedArrayError {
    /// Word count does not give a whole bits-per-value in `4..=12`.
    UnsupportedBitsPerValue {
        word_count: usize,
        total_values: usize,
    },
}

impl Error for PackedArrayError {}

impl Display for PackedArrayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackedArrayError::UnsupportedBitsPerValue {
                word_count,
                total_values,
            } => write!(
                f,
                "{} words cannot hold {} values of 4 to 12 bits",
                word_count, total_values
            ),
        }
    }
}

/// Derives the packing width from the array size.
pub fn bits_per_value(word_count: usize, total_values: usize) -> Result<usize, PackedArrayError> {
    let error = PackedArrayError::UnsupportedBitsPerValue {
        word_count,
        total_values,
    };

    // Every group unpacker emits at most 8 values.
    if total_values == 0 || total_values % 8 != 0 {
        return Err(error);
    }

    let total_bits = word_count * 64;

    if total_bits % total_values != 0 {
        return Err(error);
    }

    let bits_per_value = total_bits / total_values;

    if bits_per_value < MIN_BITS_PER_VALUE || bits_per_value > MAX_BITS_PER_VALUE {
        return Err(error);
    }

    Ok(bits_per_value)
}

/// Unpacks `total_values` values from `words`.
pub fn decode(words: &[u64], total_values: usize) -> Result<Vec<u16>, PackedArrayError> {
    let bits_per_value = bits_per_value(words.len(), total_values)?;
    let mut bytes = vec![0; words.len() * 8];
    LittleEndian::write_u64_into(words, &mut bytes);

    Ok(unpack(&bytes, bits_per_value, total_values))
}

/// Same as [`decode`] for the signed longs stored in NBT.
pub fn decode_longs(words: &[i64], total_values: usize) -> Result<Vec<u16>, PackedArrayError> {
    let bits_per_value = bits_per_value(words.len(), total_values)?;
    let mut bytes = vec![0; words.len() * 8];
    LittleEndian::write_i64_into(words, &mut bytes);

    Ok(unpack(&bytes, bits_per_value, total_values))
}

type GroupUnpacker = fn(&[u8], &mut [u16]);

fn unpack(bytes: &[u8], bits_per_value: usize, total_values: usize) -> Vec<u16> {
    if bits_per_value == 8 {
        return bytes.iter().map(|&byte| u16::from(byte)).collect();
    }

    let (group_bytes, group_values, unpack_group): (usize, usize, GroupUnpacker) =
        match bits_per_value {
            4 => (1, 2, unpack_4),
            5 => (5, 8, unpack_5),
            6 => (3, 4, unpack_6),
            7 => (7, 8, unpack_7),
            9 => (9, 8, unpack_9),
            10 => (5, 4, unpack_10),
            11 => (11, 8, unpack_11),
            12 => (3, 2, unpack_12),
            _ => unreachable!("bits per value {} was not validated", bits_per_value),
        };

    let mut values = vec![0; total_values];
    let groups = bytes
        .chunks_exact(group_bytes)
        .zip(values.chunks_exact_mut(group_values));

    for (group, out) in groups {
        unpack_group(group, out);
    }

    values
}

fn unpack_4(bytes: &[u8], r: &mut [u16]) {
    let b = |i: usize| u16::from(bytes[i]);

    r[0] = b(0) & 0x0f;
    r[1] = (b(0) & 0xf0) >> 4;
}

fn unpack_5(bytes: &[u8], r: &mut [u16]) {
    let b = |i: usize| u16::from(bytes[i]);

    r[0] = b(0) & 0x1f;
    r[1] = ((b(1) & 0x03) << 3) | ((b(0) & 0xe0) >> 5);
    r[2] = (b(1) & 0x7c) >> 2;
    r[3] = ((b(2) & 0x0f) << 1) | ((b(1) & 0x80) >> 7);
    r[4] = ((b(3) & 0x01) << 4) | ((b(2) & 0xf0) >> 4);
    r[5] = (b(3) & 0x3e) >> 1;
    r[6] = ((b(4) & 0x07) << 2) | ((b(3) & 0xc0) >> 6);
    r[7] = (b(4) & 0xf8) >> 3;
}

fn unpack_6(bytes: &[u8], r: &mut [u16]) {
    let b = |i: usize| u16::from(bytes[i]);

    r[0] = b(0) & 0x3f;
    r[1] = ((b(1) & 0x0f) << 2) | ((b(0) & 0xc0) >> 6);
    r[2] = ((b(2) & 0x03) << 4) | ((b(1) & 0xf0) >> 4);
    r[3] = (b(2) & 0xfc) >> 2;
}

fn unpack_7(bytes: &[u8], r: &mut [u16]) {
    let b = |i: usize| u16::from(bytes[i]);

    r[0] = b(0) & 0x7f;
    r[1] = ((b(1) & 0x3f) << 1) | ((b(0) & 0x80) >> 7);
    r[2] = ((b(2) & 0x1f) << 2) | ((b(1) & 0xc0) >> 6);
    r[3] = ((b(3) & 0x0f) << 3) | ((b(2) & 0xe0) >> 5);
    r[4] = ((b(4) & 0x07) << 4) | ((b(3) & 0xf0) >> 4);
    r[5] = ((b(5) & 0x03) << 5) | ((b(4) & 0xf8) >> 3);
    r[6] = ((b(6) & 0x01) << 6) | ((b(5) & 0xfc) >> 2);
    r[7] = (b(6) & 0xfe) >> 1;
}

fn unpack_9(bytes: &[u8], r: &mut [u16]) {
    let b = |i: usize| u16::from(bytes[i]);

    r[0] = ((b(1) & 0x01) << 8) | b(0);
    r[1] = ((b(2) & 0x03) << 7) | ((b(1) & 0xfe) >> 1);
    r[2] = ((b(3) & 0x07) << 6) | ((b(2) & 0xfc) >> 2);
    r[3] = ((b(4) & 0x0f) << 5) | ((b(3) & 0xf8) >> 3);
    r[4] = ((b(5) & 0x1f) << 4) | ((b(4) & 0xf0) >> 4);
    r[5] = ((b(6) & 0x3f) << 3) | ((b(5) & 0xe0) >> 5);
    r[6] = ((b(7) & 0x7f) << 2) | ((b(6) & 0xc0) >> 6);
    r[7] = (b(8) << 1) | ((b(7) & 0x80) >> 7);
}

fn unpack_10(bytes: &[u8], r: &mut [u16]) {
    let b = |i: usize| u16::from(bytes[i]);

    r[0] = ((b(1) & 0x03) << 8) | b(0);
    r[1] = ((b(2) & 0x0f) << 6) | ((b(1) & 0xfc) >> 2);
    r[2] = ((b(3) & 0x3f) << 4) | ((b(2) & 0xf0) >> 4);
    r[3] = (b(4) << 2) | ((b(3) & 0xc0) >> 6);
}

fn unpack_11(bytes: &[u8], r: &mut [u16]) {
    let b = |i: usize| u16::from(bytes[i]);

    r[0] = ((b(1) & 0x07) << 8) | b(0);
    r[1] = ((b(2) & 0x3f) << 5) | ((b(1) & 0xf8) >> 3);
    r[2] = ((b(4) & 0x01) << 10) | (b(3) << 2) | ((b(2) & 0xc0) >> 6);
    r[3] = ((b(5) & 0x0f) << 7) | ((b(4) & 0xfe) >> 1);
    r[4] = ((b(6) & 0x7f) << 4) | ((b(5) & 0xf0) >> 4);
    r[5] = ((b(8) & 0x03) << 9) | (b(7) << 1) | ((b(6) & 0x80) >> 7);
    r[6] = ((b(9) & 0x1f) << 6) | ((b(8) & 0xfc) >> 2);
    r[7] = (b(10) << 3) | ((b(9) & 0xe0) >> 5);
}

fn unpack_12(bytes: &[u8], r: &mut [u16]) {
    let b = |i: usize| u16::from(bytes[i]);

    r[0] = ((b(1) & 0x0f) << 8) | b(0);
    r[1] = (b(2) << 4) | ((b(1) & 0xf0) >> 4);
}
