//! Binary NBT payload reader and writer. Compression and the Bedrock header are handled
//! by the codec; this module only sees the uncompressed tag stream.
//!
//! Big-endian strings are Java's modified UTF-8: NUL is `C0 80` and characters outside the
//! BMP are surrogate pairs. Plain UTF-8 is still accepted on read. The little-endian
//! layouts come from Bedrock, which writes standard UTF-8.

use crate::codec::{DecodeError, EncodeError};
use crate::tag::{Endianness, Tag, TagId, TagList};
use indexmap::IndexMap;
use std::borrow::Cow;

/// Deepest container nesting accepted on read or write.
pub const MAX_DEPTH: usize = 512;

pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endianness,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8], endian: Endianness) -> Self {
        Self {
            data,
            pos: 0,
            endian,
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Reads a root tag (Compound or List), optionally preceded by its name.
    pub(crate) fn read_root(&mut self, named: bool) -> Result<(Tag, Option<String>), DecodeError> {
        let offset = self.pos;
        let id = self.tag_id()?;
        if !matches!(id, TagId::Compound | TagId::List) {
            return Err(DecodeError::InvalidRootTag { id, offset });
        }
        let name = if named { Some(self.string()?) } else { None };
        let tag = self.payload(id, 0)?;
        Ok((tag, name))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::UnexpectedEof { offset: self.pos });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.array::<1>()?[0])
    }

    fn tag_id(&mut self) -> Result<TagId, DecodeError> {
        let offset = self.pos;
        let id = self.u8()?;
        TagId::from_u8(id).ok_or(DecodeError::UnknownTagId { id, offset })
    }

    fn i16(&mut self) -> Result<i16, DecodeError> {
        let bytes = self.array::<2>()?;
        Ok(match self.endian {
            Endianness::Big => i16::from_be_bytes(bytes),
            Endianness::Little | Endianness::LittleVarint => i16::from_le_bytes(bytes),
        })
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.array::<2>()?;
        Ok(match self.endian {
            Endianness::Big => u16::from_be_bytes(bytes),
            Endianness::Little | Endianness::LittleVarint => u16::from_le_bytes(bytes),
        })
    }

    fn i32(&mut self) -> Result<i32, DecodeError> {
        match self.endian {
            Endianness::Big => Ok(i32::from_be_bytes(self.array()?)),
            Endianness::Little => Ok(i32::from_le_bytes(self.array()?)),
            Endianness::LittleVarint => {
                let raw = self.var_u32()?;
                Ok(((raw >> 1) as i32) ^ -((raw & 1) as i32))
            }
        }
    }

    fn i64(&mut self) -> Result<i64, DecodeError> {
        match self.endian {
            Endianness::Big => Ok(i64::from_be_bytes(self.array()?)),
            Endianness::Little => Ok(i64::from_le_bytes(self.array()?)),
            Endianness::LittleVarint => {
                let raw = self.var_u64(10)?;
                Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
            }
        }
    }

    fn f32(&mut self) -> Result<f32, DecodeError> {
        let bytes = self.array::<4>()?;
        Ok(match self.endian {
            Endianness::Big => f32::from_be_bytes(bytes),
            Endianness::Little | Endianness::LittleVarint => f32::from_le_bytes(bytes),
        })
    }

    fn f64(&mut self) -> Result<f64, DecodeError> {
        let bytes = self.array::<8>()?;
        Ok(match self.endian {
            Endianness::Big => f64::from_be_bytes(bytes),
            Endianness::Little | Endianness::LittleVarint => f64::from_le_bytes(bytes),
        })
    }

    /// LEB128 unsigned varint of at most `max_bytes` bytes.
    fn var_u64(&mut self, max_bytes: usize) -> Result<u64, DecodeError> {
        let offset = self.pos;
        let mut value = 0u64;
        for i in 0..max_bytes {
            let byte = self.u8()?;
            value |= u64::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DecodeError::VarintTooLong { offset })
    }

    /// Five-byte varint whose value must fit in 32 bits.
    fn var_u32(&mut self) -> Result<u32, DecodeError> {
        let offset = self.pos;
        let value = self.var_u64(5)?;
        u32::try_from(value).map_err(|_| DecodeError::VarintTooLong { offset })
    }

    /// Element count of a list or array.
    fn length(&mut self) -> Result<usize, DecodeError> {
        let offset = self.pos;
        let length = self.i32()?;
        let length = usize::try_from(length)
            .map_err(|_| DecodeError::NegativeLength { length, offset })?;
        // Every element takes at least one byte, so a longer count cannot be satisfied.
        if length > self.remaining() {
            return Err(DecodeError::UnexpectedEof { offset });
        }
        Ok(length)
    }

    fn string(&mut self) -> Result<String, DecodeError> {
        let length = match self.endian {
            Endianness::Big | Endianness::Little => usize::from(self.u16()?),
            Endianness::LittleVarint => self.var_u32()? as usize,
        };
        let offset = self.pos;
        let bytes = self.take(length)?;
        if let Ok(text) = std::str::from_utf8(bytes) {
            return Ok(text.to_string());
        }
        match self.endian {
            Endianness::Big => simd_cesu8::mutf8::decode(bytes)
                .map(|text| text.into_owned())
                .map_err(|_| DecodeError::InvalidUtf8 { offset }),
            Endianness::Little | Endianness::LittleVarint => {
                Err(DecodeError::InvalidUtf8 { offset })
            }
        }
    }

    fn payload(&mut self, id: TagId, depth: usize) -> Result<Tag, DecodeError> {
        Ok(match id {
            TagId::End => {
                return Err(DecodeError::UnexpectedEnd {
                    offset: self.pos.saturating_sub(1),
                });
            }
            TagId::Byte => Tag::Byte(self.u8()? as i8),
            TagId::Short => Tag::Short(self.i16()?),
            TagId::Int => Tag::Int(self.i32()?),
            TagId::Long => Tag::Long(self.i64()?),
            TagId::Float => Tag::Float(self.f32()?),
            TagId::Double => Tag::Double(self.f64()?),
            TagId::String => Tag::String(self.string()?),
            TagId::ByteArray => {
                let length = self.length()?;
                let bytes = self.take(length)?;
                Tag::ByteArray(bytes.iter().map(|b| *b as i8).collect())
            }
            TagId::IntArray => {
                let length = self.length()?;
                let mut values = Vec::with_capacity(length);
                for _ in 0..length {
                    values.push(self.i32()?);
                }
                Tag::IntArray(values)
            }
            TagId::LongArray => {
                let length = self.length()?;
                let mut values = Vec::with_capacity(length);
                for _ in 0..length {
                    values.push(self.i64()?);
                }
                Tag::LongArray(values)
            }
            TagId::List => {
                let depth = nested(depth).ok_or(DecodeError::TooDeep { offset: self.pos })?;
                let offset = self.pos;
                let element = self.tag_id()?;
                let length = self.length()?;
                if element == TagId::End && length > 0 {
                    return Err(DecodeError::UnexpectedEnd { offset });
                }
                let mut items = Vec::with_capacity(length);
                for _ in 0..length {
                    items.push(self.payload(element, depth)?);
                }
                Tag::List(TagList::from_homogeneous(element, items))
            }
            TagId::Compound => {
                let depth = nested(depth).ok_or(DecodeError::TooDeep { offset: self.pos })?;
                let mut map = IndexMap::new();
                loop {
                    let id = self.tag_id()?;
                    if id == TagId::End {
                        break;
                    }
                    let offset = self.pos;
                    let key = self.string()?;
                    let value = self.payload(id, depth)?;
                    if map.contains_key(&key) {
                        return Err(DecodeError::DuplicateKey { key, offset });
                    }
                    map.insert(key, value);
                }
                Tag::Compound(map)
            }
        })
    }
}

fn nested(depth: usize) -> Option<usize> {
    let depth = depth + 1;
    (depth <= MAX_DEPTH).then_some(depth)
}

pub(crate) struct Writer {
    out: Vec<u8>,
    endian: Endianness,
}

impl Writer {
    pub(crate) fn new(endian: Endianness) -> Self {
        Self {
            out: Vec::new(),
            endian,
        }
    }

    pub(crate) fn write_root(
        mut self,
        tag: &Tag,
        name: Option<&str>,
    ) -> Result<Vec<u8>, EncodeError> {
        let id = tag.id();
        if !matches!(id, TagId::Compound | TagId::List) {
            return Err(EncodeError::InvalidRootTag(id));
        }
        self.out.push(id as u8);
        if let Some(name) = name {
            self.string(name)?;
        }
        self.payload(tag, 0)?;
        Ok(self.out)
    }

    fn i16(&mut self, v: i16) {
        match self.endian {
            Endianness::Big => self.out.extend_from_slice(&v.to_be_bytes()),
            Endianness::Little | Endianness::LittleVarint => {
                self.out.extend_from_slice(&v.to_le_bytes())
            }
        }
    }

    fn i32(&mut self, v: i32) {
        match self.endian {
            Endianness::Big => self.out.extend_from_slice(&v.to_be_bytes()),
            Endianness::Little => self.out.extend_from_slice(&v.to_le_bytes()),
            Endianness::LittleVarint => self.var_u64(u64::from(((v << 1) ^ (v >> 31)) as u32)),
        }
    }

    fn i64(&mut self, v: i64) {
        match self.endian {
            Endianness::Big => self.out.extend_from_slice(&v.to_be_bytes()),
            Endianness::Little => self.out.extend_from_slice(&v.to_le_bytes()),
            Endianness::LittleVarint => self.var_u64(((v << 1) ^ (v >> 63)) as u64),
        }
    }

    fn f32(&mut self, v: f32) {
        match self.endian {
            Endianness::Big => self.out.extend_from_slice(&v.to_be_bytes()),
            Endianness::Little | Endianness::LittleVarint => {
                self.out.extend_from_slice(&v.to_le_bytes())
            }
        }
    }

    fn f64(&mut self, v: f64) {
        match self.endian {
            Endianness::Big => self.out.extend_from_slice(&v.to_be_bytes()),
            Endianness::Little | Endianness::LittleVarint => {
                self.out.extend_from_slice(&v.to_le_bytes())
            }
        }
    }

    fn var_u64(&mut self, mut v: u64) {
        loop {
            let byte = (v & 0x7F) as u8;
            v >>= 7;
            if v == 0 {
                self.out.push(byte);
                return;
            }
            self.out.push(byte | 0x80);
        }
    }

    fn length(&mut self, length: usize) -> Result<(), EncodeError> {
        let length = i32::try_from(length).map_err(|_| EncodeError::TooLong { length })?;
        self.i32(length);
        Ok(())
    }

    fn string(&mut self, s: &str) -> Result<(), EncodeError> {
        let bytes = match self.endian {
            Endianness::Big => simd_cesu8::mutf8::encode(s),
            Endianness::Little | Endianness::LittleVarint => Cow::Borrowed(s.as_bytes()),
        };
        let length = bytes.len();
        match self.endian {
            Endianness::Big | Endianness::Little => {
                let length = u16::try_from(length)
                    .map_err(|_| EncodeError::StringTooLong { length })?;
                match self.endian {
                    Endianness::Big => self.out.extend_from_slice(&length.to_be_bytes()),
                    _ => self.out.extend_from_slice(&length.to_le_bytes()),
                }
            }
            Endianness::LittleVarint => {
                let length = u32::try_from(length)
                    .map_err(|_| EncodeError::StringTooLong { length })?;
                self.var_u64(u64::from(length));
            }
        }
        self.out.extend_from_slice(&bytes);
        Ok(())
    }

    fn payload(&mut self, tag: &Tag, depth: usize) -> Result<(), EncodeError> {
        match tag {
            Tag::Byte(v) => self.out.push(*v as u8),
            Tag::Short(v) => self.i16(*v),
            Tag::Int(v) => self.i32(*v),
            Tag::Long(v) => self.i64(*v),
            Tag::Float(v) => self.f32(*v),
            Tag::Double(v) => self.f64(*v),
            Tag::String(s) => self.string(s)?,
            Tag::ByteArray(values) => {
                self.length(values.len())?;
                self.out.extend(values.iter().map(|v| *v as u8));
            }
            Tag::IntArray(values) => {
                self.length(values.len())?;
                for v in values {
                    self.i32(*v);
                }
            }
            Tag::LongArray(values) => {
                self.length(values.len())?;
                for v in values {
                    self.i64(*v);
                }
            }
            Tag::List(list) => {
                let depth = nested(depth).ok_or(EncodeError::TooDeep)?;
                self.out.push(list.element() as u8);
                self.length(list.len())?;
                for item in list {
                    self.payload(item, depth)?;
                }
            }
            Tag::Compound(map) => {
                let depth = nested(depth).ok_or(EncodeError::TooDeep)?;
                for (key, value) in map {
                    self.out.push(value.id() as u8);
                    self.string(key)?;
                    self.payload(value, depth)?;
                }
                self.out.push(TagId::End as u8);
            }
        }
        Ok(())
    }
}
