//! Decoder for the Named Binary Tag format used by chunk payloads.
//!
//! Only decoding is supported. All numbers are big-endian and there is no
//! alignment padding anywhere in the format.

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use flate2::read::{GzDecoder, ZlibDecoder};
use std::error::Error;
use std::fmt::{self, Display};
use std::io::{self, Read};

pub const END_TAG_TYPE: u8 = 0;
pub const BYTE_TAG_TYPE: u8 = 1;
pub const SHORT_TAG_TYPE: u8 = 2;
pub const INT_TAG_TYPE: u8 = 3;
pub const LONG_TAG_TYPE: u8 = 4;
pub const FLOAT_TAG_TYPE: u8 = 5;
pub const DOUBLE_TAG_TYPE: u8 = 6;
pub const BYTE_ARRAY_TAG_TYPE: u8 = 7;
pub const STRING_TAG_TYPE: u8 = 8;
pub const LIST_TAG_TYPE: u8 = 9;
pub const COMPOUND_TAG_TYPE: u8 = 10;
pub const INT_ARRAY_TAG_TYPE: u8 = 11;
pub const LONG_ARRAY_TAG_TYPE: u8 = 12;

/// Compounds and lists nested deeper than this are rejected.
const MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<Tag>),
    Compound(CompoundTag),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    pub fn type_id(&self) -> u8 {
        match self {
            Tag::End => END_TAG_TYPE,
            Tag::Byte(_) => BYTE_TAG_TYPE,
            Tag::Short(_) => SHORT_TAG_TYPE,
            Tag::Int(_) => INT_TAG_TYPE,
            Tag::Long(_) => LONG_TAG_TYPE,
            Tag::Float(_) => FLOAT_TAG_TYPE,
            Tag::Double(_) => DOUBLE_TAG_TYPE,
            Tag::ByteArray(_) => BYTE_ARRAY_TAG_TYPE,
            Tag::String(_) => STRING_TAG_TYPE,
            Tag::List(_) => LIST_TAG_TYPE,
            Tag::Compound(_) => COMPOUND_TAG_TYPE,
            Tag::IntArray(_) => INT_ARRAY_TAG_TYPE,
            Tag::LongArray(_) => LONG_ARRAY_TAG_TYPE,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Tag::End => "TAG_End",
            Tag::Byte(_) => "TAG_Byte",
            Tag::Short(_) => "TAG_Short",
            Tag::Int(_) => "TAG_Int",
            Tag::Long(_) => "TAG_Long",
            Tag::Float(_) => "TAG_Float",
            Tag::Double(_) => "TAG_Double",
            Tag::ByteArray(_) => "TAG_Byte_Array",
            Tag::String(_) => "TAG_String",
            Tag::List(_) => "TAG_List",
            Tag::Compound(_) => "TAG_Compound",
            Tag::IntArray(_) => "TAG_Int_Array",
            Tag::LongArray(_) => "TAG_Long_Array",
        }
    }

    pub fn as_compound_tag(&self) -> Option<&CompoundTag> {
        match self {
            Tag::Compound(compound_tag) => Some(compound_tag),
            _ => None,
        }
    }
}

/// String keyed tags in the order they were decoded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompoundTag {
    tags: Vec<(String, Tag)>,
}

macro_rules! define_copy_getter {
    ($method:ident, $variant:ident, $type:ty) => {
        pub fn $method(&self, name: &str) -> Result<$type, CompoundTagError> {
            match self.get_tag(name)? {
                Tag::$variant(value) => Ok(*value),
                tag => Err(CompoundTagError::wrong_type(name, tag)),
            }
        }
    };
}

macro_rules! define_ref_getter {
    ($method:ident, $variant:ident, $type:ty) => {
        pub fn $method(&self, name: &str) -> Result<&$type, CompoundTagError> {
            match self.get_tag(name)? {
                Tag::$variant(value) => Ok(value),
                tag => Err(CompoundTagError::wrong_type(name, tag)),
            }
        }
    };
}

impl CompoundTag {
    pub fn new() -> Self {
        CompoundTag { tags: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.tags
            .iter()
            .find(|(tag_name, _)| tag_name == name)
            .map(|(_, tag)| tag)
    }

    /// Inserts a tag, replacing an existing tag with the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, tag: Tag) {
        let name = name.into();

        match self.tags.iter_mut().find(|(tag_name, _)| *tag_name == name) {
            Some((_, existing)) => *existing = tag,
            None => self.tags.push((name, tag)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tag)> {
        self.tags.iter().map(|(name, tag)| (name.as_str(), tag))
    }

    pub fn get_tag(&self, name: &str) -> Result<&Tag, CompoundTagError> {
        self.get(name).ok_or_else(|| CompoundTagError::TagNotFound {
            name: name.to_owned(),
        })
    }

    define_copy_getter!(get_i8, Byte, i8);
    define_copy_getter!(get_i16, Short, i16);
    define_copy_getter!(get_i32, Int, i32);
    define_copy_getter!(get_i64, Long, i64);
    define_copy_getter!(get_f32, Float, f32);
    define_copy_getter!(get_f64, Double, f64);

    define_ref_getter!(get_i8_vec, ByteArray, [i8]);
    define_ref_getter!(get_i32_vec, IntArray, [i32]);
    define_ref_getter!(get_i64_vec, LongArray, [i64]);
    define_ref_getter!(get_list, List, [Tag]);
    define_ref_getter!(get_compound_tag, Compound, CompoundTag);

    pub fn get_bool(&self, name: &str) -> Result<bool, CompoundTagError> {
        Ok(self.get_i8(name)? != 0)
    }

    pub fn get_str(&self, name: &str) -> Result<&str, CompoundTagError> {
        match self.get_tag(name)? {
            Tag::String(value) => Ok(value),
            tag => Err(CompoundTagError::wrong_type(name, tag)),
        }
    }

    /// List of compounds. Every element must be a compound.
    pub fn get_compound_tag_vec(&self, name: &str) -> Result<Vec<&CompoundTag>, CompoundTagError> {
        self.get_list(name)?
            .iter()
            .map(|tag| {
                tag.as_compound_tag()
                    .ok_or_else(|| CompoundTagError::wrong_type(name, tag))
            })
            .collect()
    }
}

/// Errors of the typed [`CompoundTag`] getters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompoundTagError {
    /// Tag with this name does not exist.
    TagNotFound { name: String },
    /// Tag exists but holds another type.
    TagWrongType {
        name: String,
        actual_tag_type: &'static str,
    },
}

impl CompoundTagError {
    fn wrong_type(name: &str, tag: &Tag) -> Self {
        CompoundTagError::TagWrongType {
            name: name.to_owned(),
            actual_tag_type: tag.type_name(),
        }
    }
}

impl Error for CompoundTagError {}

impl Display for CompoundTagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompoundTagError::TagNotFound { name } => write!(f, "Tag {} not found", name),
            CompoundTagError::TagWrongType {
                name,
                actual_tag_type,
            } => write!(f, "Tag {} has unexpected type {}", name, actual_tag_type),
        }
    }
}

/// Possible errors while decoding binary data.
#[derive(Debug)]
pub enum TagDecodeError {
    /// Root of the data is not a compound.
    RootMustBeCompoundTag { actual_tag_type: u8 },
    /// Type id outside of 0..=12.
    UnknownTagType { type_id: u8 },
    /// Array length is negative.
    InvalidLength { length: i32 },
    /// Compounds or lists are nested too deep.
    DepthLimitExceeded { depth: usize },
    /// Input ended early or the decompressor failed.
    IOError { io_error: io::Error },
}

impl From<io::Error> for TagDecodeError {
    fn from(io_error: io::Error) -> Self {
        TagDecodeError::IOError { io_error }
    }
}

impl Error for TagDecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TagDecodeError::IOError { io_error } => Some(io_error),
            _ => None,
        }
    }
}

impl Display for TagDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TagDecodeError::*;
        match self {
            RootMustBeCompoundTag { actual_tag_type } => write!(
                f,
                "Root tag must be a compound, found type {}",
                actual_tag_type
            ),
            UnknownTagType { type_id } => write!(f, "Unknown tag type {}", type_id),
            InvalidLength { length } => write!(f, "Invalid array length {}", length),
            DepthLimitExceeded { depth } => write!(f, "Nesting depth exceeds {}", depth),
            IOError { .. } => write!(f, "IO Error"),
        }
    }
}

/// Decodes `bytes` into the root compound, gunzipping first if `decompress` is set.
pub fn parse(mut bytes: &[u8], decompress: bool) -> Result<CompoundTag, TagDecodeError> {
    if decompress {
        read_gzip_compound_tag(&mut bytes)
    } else {
        read_compound_tag(&mut bytes)
    }
}

pub fn read_gzip_compound_tag<R: Read>(reader: &mut R) -> Result<CompoundTag, TagDecodeError> {
    read_compound_tag(&mut GzDecoder::new(reader))
}

pub fn read_zlib_compound_tag<R: Read>(reader: &mut R) -> Result<CompoundTag, TagDecodeError> {
    read_compound_tag(&mut ZlibDecoder::new(reader))
}

pub fn read_compound_tag<R: Read>(reader: &mut R) -> Result<CompoundTag, TagDecodeError> {
    read_named_compound_tag(reader).map(|(_, compound_tag)| compound_tag)
}

/// Reads the root compound together with its name (usually empty).
pub fn read_named_compound_tag<R: Read>(
    reader: &mut R,
) -> Result<(String, CompoundTag), TagDecodeError> {
    let mut decoder = Decoder { reader, depth: 0 };
    let type_id = decoder.reader.read_u8()?;

    if type_id != COMPOUND_TAG_TYPE {
        return Err(TagDecodeError::RootMustBeCompoundTag {
            actual_tag_type: type_id,
        });
    }

    let name = decoder.read_string()?;
    let compound_tag = decoder.read_compound_tag()?;

    Ok((name, compound_tag))
}

type TagDecoder = fn(&mut Decoder<'_>) -> Result<Tag, TagDecodeError>;

/// Payload decoders indexed by type id.
const TAG_DECODERS: [TagDecoder; 13] = [
    decode_end,
    decode_byte,
    decode_short,
    decode_int,
    decode_long,
    decode_float,
    decode_double,
    decode_byte_array,
    decode_string,
    decode_list,
    decode_compound,
    decode_int_array,
    decode_long_array,
];

fn decode_end(_: &mut Decoder<'_>) -> Result<Tag, TagDecodeError> {
    Ok(Tag::End)
}

fn decode_byte(decoder: &mut Decoder<'_>) -> Result<Tag, TagDecodeError> {
    Ok(Tag::Byte(decoder.reader.read_i8()?))
}

fn decode_short(decoder: &mut Decoder<'_>) -> Result<Tag, TagDecodeError> {
    Ok(Tag::Short(decoder.reader.read_i16::<BigEndian>()?))
}

fn decode_int(decoder: &mut Decoder<'_>) -> Result<Tag, TagDecodeError> {
    Ok(Tag::Int(decoder.reader.read_i32::<BigEndian>()?))
}

fn decode_long(decoder: &mut Decoder<'_>) -> Result<Tag, TagDecodeError> {
    Ok(Tag::Long(decoder.reader.read_i64::<BigEndian>()?))
}

fn decode_float(decoder: &mut Decoder<'_>) -> Result<Tag, TagDecodeError> {
    Ok(Tag::Float(decoder.reader.read_f32::<BigEndian>()?))
}

fn decode_double(decoder: &mut Decoder<'_>) -> Result<Tag, TagDecodeError> {
    Ok(Tag::Double(decoder.reader.read_f64::<BigEndian>()?))
}

fn decode_byte_array(decoder: &mut Decoder<'_>) -> Result<Tag, TagDecodeError> {
    let bytes = decoder.read_array_bytes(1)?;
    Ok(Tag::ByteArray(bytes.into_iter().map(|b| b as i8).collect()))
}

fn decode_string(decoder: &mut Decoder<'_>) -> Result<Tag, TagDecodeError> {
    Ok(Tag::String(decoder.read_string()?))
}

fn decode_list(decoder: &mut Decoder<'_>) -> Result<Tag, TagDecodeError> {
    Ok(Tag::List(decoder.read_list()?))
}

fn decode_compound(decoder: &mut Decoder<'_>) -> Result<Tag, TagDecodeError> {
    Ok(Tag::Compound(decoder.read_compound_tag()?))
}

fn decode_int_array(decoder: &mut Decoder<'_>) -> Result<Tag, TagDecodeError> {
    let bytes = decoder.read_array_bytes(4)?;
    let mut values = vec![0; bytes.len() / 4];
    BigEndian::read_i32_into(&bytes, &mut values);

    Ok(Tag::IntArray(values))
}

fn decode_long_array(decoder: &mut Decoder<'_>) -> Result<Tag, TagDecodeError> {
    let bytes = decoder.read_array_bytes(8)?;
    let mut values = vec![0; bytes.len() / 8];
    BigEndian::read_i64_into(&bytes, &mut values);

    Ok(Tag::LongArray(values))
}

struct Decoder<'a> {
    reader: &'a mut dyn Read,
    depth: usize,
}

impl<'a> Decoder<'a> {
    fn read_tag(&mut self, type_id: u8) -> Result<Tag, TagDecodeError> {
        let decode = TAG_DECODERS
            .get(type_id as usize)
            .ok_or(TagDecodeError::UnknownTagType { type_id })?;

        decode(self)
    }

    fn read_compound_tag(&mut self) -> Result<CompoundTag, TagDecodeError> {
        self.enter()?;
        let mut compound_tag = CompoundTag::new();

        loop {
            let type_id = self.reader.read_u8()?;

            if type_id == END_TAG_TYPE {
                break;
            }

            let name = self.read_string()?;
            let tag = self.read_tag(type_id)?;

            compound_tag.insert(name, tag);
        }

        self.depth -= 1;
        Ok(compound_tag)
    }

    fn read_list(&mut self) -> Result<Vec<Tag>, TagDecodeError> {
        let type_id = self.reader.read_u8()?;
        let count = self.reader.read_i32::<BigEndian>()?;

        // Elements of an End list have no payload, so there is nothing to skip.
        if count <= 0 || type_id == END_TAG_TYPE {
            return Ok(Vec::new());
        }

        if type_id as usize >= TAG_DECODERS.len() {
            return Err(TagDecodeError::UnknownTagType { type_id });
        }

        self.enter()?;
        let mut tags = Vec::with_capacity((count as usize).min(1024));

        for _ in 0..count {
            tags.push(self.read_tag(type_id)?);
        }

        self.depth -= 1;
        Ok(tags)
    }

    fn read_string(&mut self) -> Result<String, TagDecodeError> {
        let length = self.reader.read_u16::<BigEndian>()?;
        let bytes = self.read_bytes(length as u64)?;

        // Java writes modified UTF-8, which is not always valid UTF-8.
        Ok(String::from_utf8(bytes)
            .unwrap_or_else(|error| String::from_utf8_lossy(error.as_bytes()).into_owned()))
    }

    fn read_array_bytes(&mut self, element_size: u64) -> Result<Vec<u8>, TagDecodeError> {
        let length = self.reader.read_i32::<BigEndian>()?;

        if length < 0 {
            return Err(TagDecodeError::InvalidLength { length });
        }

        self.read_bytes(length as u64 * element_size)
    }

    /// Reads exactly `length` bytes without trusting `length` for the allocation.
    fn read_bytes(&mut self, length: u64) -> Result<Vec<u8>, TagDecodeError> {
        let mut buffer = Vec::new();
        (&mut *self.reader).take(length).read_to_end(&mut buffer)?;

        if (buffer.len() as u64) < length {
            let io_error = io::Error::new(io::ErrorKind::UnexpectedEof, "tag payload truncated");
            return Err(io_error.into());
        }

        Ok(buffer)
    }

    fn enter(&mut self) -> Result<(), TagDecodeError> {
        self.depth += 1;

        if self.depth > MAX_DEPTH {
            return Err(TagDecodeError::DepthLimitExceeded { depth: MAX_DEPTH });
        }

        Ok(())
    }
}
