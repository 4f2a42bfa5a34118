use crate::binary::{Reader, Writer};
use crate::snbt::{self, SnbtError};
use crate::tag::{Compression, Endianness, FormatMetadata, RootDocument, Tag, TagId};
use flate2::{
    GzBuilder,
    bufread::{DeflateDecoder, GzDecoder, ZlibDecoder},
    write::{DeflateEncoder, ZlibEncoder},
};
use std::io::{Read, Write};

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
const BEDROCK_HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Reject bytes left over after the root tag.
    pub strict: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self { strict: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// A complete document was read but bytes remain after it.
    #[error("{remaining} unread bytes remaining after the root tag")]
    TrailingData { remaining: usize },

    #[error("the file is empty")]
    Empty,

    #[error("unexpected end of data at offset {offset}")]
    UnexpectedEof { offset: usize },

    #[error("unknown tag id {id} at offset {offset}")]
    UnknownTagId { id: u8, offset: usize },

    #[error("root tag must be a Compound or List, found {id} at offset {offset}")]
    InvalidRootTag { id: TagId, offset: usize },

    #[error("unexpected End tag at offset {offset}")]
    UnexpectedEnd { offset: usize },

    #[error("negative length {length} at offset {offset}")]
    NegativeLength { length: i32, offset: usize },

    #[error("varint too long at offset {offset}")]
    VarintTooLong { offset: usize },

    #[error("string at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },

    #[error("duplicate compound key '{key}' at offset {offset}")]
    DuplicateKey { key: String, offset: usize },

    #[error("tags nested too deeply at offset {offset}")]
    TooDeep { offset: usize },

    #[error("decompression failed: {0}")]
    Decompress(String),
}

impl DecodeError {
    pub fn is_trailing_data(&self) -> bool {
        matches!(self, DecodeError::TrailingData { .. })
    }

    /// Position in the uncompressed stream where reading stopped.
    pub fn offset(&self) -> Option<usize> {
        match self {
            DecodeError::UnexpectedEof { offset }
            | DecodeError::UnknownTagId { offset, .. }
            | DecodeError::InvalidRootTag { offset, .. }
            | DecodeError::UnexpectedEnd { offset }
            | DecodeError::NegativeLength { offset, .. }
            | DecodeError::VarintTooLong { offset }
            | DecodeError::InvalidUtf8 { offset }
            | DecodeError::DuplicateKey { offset, .. }
            | DecodeError::TooDeep { offset } => Some(*offset),
            DecodeError::TrailingData { .. } | DecodeError::Empty | DecodeError::Decompress(_) => {
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("root tag must be a Compound or List, found {0}")]
    InvalidRootTag(TagId),

    #[error("string of {length} bytes is too long to encode")]
    StringTooLong { length: usize },

    #[error("{length} entries is too many to encode")]
    TooLong { length: usize },

    #[error("tags nested too deeply")]
    TooDeep,

    #[error("compression failed: {0}")]
    Compress(String),
}

/// Call contract of the binary/text codec used by the session.
pub trait Codec {
    fn decode(&self, bytes: &[u8], options: DecodeOptions) -> Result<RootDocument, DecodeError>;
    fn encode(&self, document: &RootDocument) -> Result<Vec<u8>, EncodeError>;
    fn parse_text(&self, text: &str) -> Result<Tag, SnbtError>;
    fn stringify_text(&self, tag: &Tag, indent: usize) -> String;
}

/// Codec for Java and Bedrock NBT files that detects compression, Bedrock header,
/// endianness and root naming on read.
#[derive(Debug, Clone, Copy, Default)]
pub struct NbtCodec;

impl Codec for NbtCodec {
    fn decode(&self, bytes: &[u8], options: DecodeOptions) -> Result<RootDocument, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        if bytes.starts_with(&GZIP_MAGIC) {
            let mut decoder = GzDecoder::new(bytes);
            let data = decompress(&mut decoder)?;
            let rest = decoder.into_inner();
            return decode_compressed(&data, rest, options, Compression::Gzip);
        }
        if has_zlib_header(bytes) {
            let mut decoder = ZlibDecoder::new(bytes);
            let data = decompress(&mut decoder)?;
            let rest = decoder.into_inner();
            return decode_compressed(&data, rest, options, Compression::Zlib);
        }

        match decode_uncompressed(bytes, options, None) {
            Ok(document) => Ok(document),
            Err(first) => {
                // No magic for raw deflate: only try it once a plain read has failed,
                // and only accept a stream that decodes cleanly.
                let mut decoder = DeflateDecoder::new(bytes);
                let Ok(data) = decompress(&mut decoder) else {
                    return Err(first);
                };
                let rest = decoder.into_inner();
                let strict = DecodeOptions { strict: true };
                decode_compressed(&data, rest, strict, Compression::RawDeflate).map_err(|_| first)
            }
        }
    }

    fn encode(&self, document: &RootDocument) -> Result<Vec<u8>, EncodeError> {
        let format = &document.format;
        let body = Writer::new(format.endianness)
            .write_root(&document.root_tag, format.root_name.as_deref())?;

        let body = match format.bedrock_level {
            Some(level) => {
                let length = u32::try_from(body.len()).map_err(|_| EncodeError::TooLong {
                    length: body.len(),
                })?;
                let mut out = Vec::with_capacity(BEDROCK_HEADER_LEN + body.len());
                out.extend_from_slice(&level.to_le_bytes());
                out.extend_from_slice(&length.to_le_bytes());
                out.extend_from_slice(&body);
                out
            }
            None => body,
        };

        match format.compression {
            None => Ok(body),
            Some(Compression::Gzip) => {
                let mut encoder = GzBuilder::new()
                    .mtime(0)
                    .write(Vec::new(), flate2::Compression::default());
                encoder.write_all(&body).map_err(compress_error)?;
                encoder.finish().map_err(compress_error)
            }
            Some(Compression::Zlib) => {
                let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&body).map_err(compress_error)?;
                encoder.finish().map_err(compress_error)
            }
            Some(Compression::RawDeflate) => {
                let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&body).map_err(compress_error)?;
                encoder.finish().map_err(compress_error)
            }
        }
    }

    fn parse_text(&self, text: &str) -> Result<Tag, SnbtError> {
        snbt::parse(text)
    }

    fn stringify_text(&self, tag: &Tag, indent: usize) -> String {
        snbt::stringify(tag, indent)
    }
}

fn compress_error(e: std::io::Error) -> EncodeError {
    EncodeError::Compress(e.to_string())
}

fn decompress(mut reader: impl Read) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::new();
    reader
        .read_to_end(&mut out)
        .map_err(|e| DecodeError::Decompress(e.to_string()))?;
    Ok(out)
}

/// Decodes a decompressed stream. `rest` is whatever followed the compressed stream.
fn decode_compressed(
    data: &[u8],
    rest: &[u8],
    options: DecodeOptions,
    compression: Compression,
) -> Result<RootDocument, DecodeError> {
    let document = decode_uncompressed(data, options, Some(compression))?;
    if options.strict && !rest.is_empty() {
        return Err(DecodeError::TrailingData {
            remaining: rest.len(),
        });
    }
    Ok(document)
}

fn has_zlib_header(bytes: &[u8]) -> bool {
    match bytes {
        [cmf, flg, ..] => *cmf == 0x78 && (u16::from(*cmf) << 8 | u16::from(*flg)) % 31 == 0,
        _ => false,
    }
}

/// Splits off the Bedrock level header when its length field matches the remaining data.
fn split_bedrock_header(data: &[u8]) -> (Option<u32>, &[u8]) {
    if data.len() < BEDROCK_HEADER_LEN {
        return (None, data);
    }
    let level = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let length = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if length as usize == data.len() - BEDROCK_HEADER_LEN {
        (Some(level), &data[BEDROCK_HEADER_LEN..])
    } else {
        (None, data)
    }
}

/// Tries each endianness and root naming. The first layout that reads the whole body
/// wins. Otherwise the layout that got furthest into the body decides the outcome: its
/// error, or its document with leftover bytes (`TrailingData` when strict). Earlier
/// layouts win ties.
fn decode_uncompressed(
    data: &[u8],
    options: DecodeOptions,
    compression: Option<Compression>,
) -> Result<RootDocument, DecodeError> {
    let (bedrock_level, body) = split_bedrock_header(data);

    let mut furthest: Option<(usize, Result<RootDocument, DecodeError>)> = None;
    for endianness in Endianness::ALL {
        for named in [true, false] {
            let mut reader = Reader::new(body, endianness);
            let (reached, result) = match reader.read_root(named) {
                Ok((root_tag, root_name)) => {
                    let document = RootDocument::new(
                        root_tag,
                        FormatMetadata {
                            root_name,
                            endianness,
                            compression,
                            bedrock_level,
                        },
                    );
                    let remaining = reader.remaining();
                    if remaining == 0 {
                        return Ok(document);
                    }
                    let result = if options.strict {
                        Err(DecodeError::TrailingData { remaining })
                    } else {
                        Ok(document)
                    };
                    (body.len() - remaining, result)
                }
                Err(e) => (e.offset().unwrap_or(0), Err(e)),
            };
            if furthest.as_ref().is_none_or(|(best, _)| reached > *best) {
                furthest = Some((reached, result));
            }
        }
    }

    match furthest {
        Some((_, result)) => result,
        None => Err(DecodeError::UnexpectedEof { offset: 0 }),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Codec, DecodeError, DecodeOptions, NbtCodec, has_zlib_header, split_bedrock_header,
    };
    use crate::tag::{Compression, Endianness, FormatMetadata, RootDocument, Tag};
    use indexmap::IndexMap;

    fn document(format: FormatMetadata) -> RootDocument {
        let mut map = IndexMap::new();
        map.insert("name".to_string(), Tag::String("Bananrama".to_string()));
        map.insert("value".to_string(), Tag::Long(-42));
        RootDocument::new(Tag::Compound(map), format)
    }

    #[test]
    fn detects_every_compression() {
        let compressions = [
            None,
            Some(Compression::Gzip),
            Some(Compression::Zlib),
            Some(Compression::RawDeflate),
        ];
        for compression in compressions {
            let doc = document(FormatMetadata {
                compression,
                ..FormatMetadata::default()
            });
            let bytes = NbtCodec.encode(&doc).unwrap();
            let decoded = NbtCodec.decode(&bytes, DecodeOptions::default()).unwrap();
            assert_eq!(decoded, doc, "{compression:?}");
        }
    }

    #[test]
    fn detects_little_endian_bedrock_header() {
        let doc = document(FormatMetadata {
            root_name: Some(String::new()),
            endianness: Endianness::Little,
            compression: None,
            bedrock_level: Some(8),
        });
        let bytes = NbtCodec.encode(&doc).unwrap();
        assert_eq!(&bytes[..4], &8u32.to_le_bytes());
        assert_eq!(NbtCodec.decode(&bytes, DecodeOptions::default()).unwrap(), doc);
    }

    #[test]
    fn detects_unnamed_varint_root() {
        let doc = document(FormatMetadata {
            root_name: None,
            endianness: Endianness::LittleVarint,
            compression: None,
            bedrock_level: None,
        });
        let bytes = NbtCodec.encode(&doc).unwrap();
        assert_eq!(NbtCodec.decode(&bytes, DecodeOptions::default()).unwrap(), doc);
    }

    #[test]
    fn trailing_bytes_only_fail_in_strict_mode() {
        let doc = document(FormatMetadata::default());
        let mut bytes = NbtCodec.encode(&doc).unwrap();
        bytes.extend_from_slice(&[0xAA, 0xBB, 0xCC]);

        let err = NbtCodec.decode(&bytes, DecodeOptions { strict: true }).unwrap_err();
        assert_eq!(err, DecodeError::TrailingData { remaining: 3 });
        assert!(err.is_trailing_data());

        let lenient = NbtCodec.decode(&bytes, DecodeOptions { strict: false }).unwrap();
        assert_eq!(lenient, doc);
    }

    #[test]
    fn truncated_file_is_malformed_not_trailing() {
        let bytes = NbtCodec.encode(&document(FormatMetadata::default())).unwrap();
        let truncated = &bytes[..bytes.len() - 1];
        for strict in [true, false] {
            let err = NbtCodec.decode(truncated, DecodeOptions { strict }).unwrap_err();
            assert_eq!(
                err,
                DecodeError::UnexpectedEof {
                    offset: truncated.len()
                },
                "strict: {strict}"
            );
        }
    }

    #[test]
    fn bad_string_is_malformed_not_trailing() {
        // {s: <FF FE>} with an empty root name.
        let bytes = [10, 0, 0, 8, 0, 1, b's', 0, 2, 0xFF, 0xFE, 0];
        for strict in [true, false] {
            let err = NbtCodec.decode(&bytes, DecodeOptions { strict }).unwrap_err();
            assert_eq!(err, DecodeError::InvalidUtf8 { offset: 9 }, "strict: {strict}");
        }
    }

    #[test]
    fn bytes_after_a_compressed_stream_are_trailing_data() {
        for compression in [Compression::Gzip, Compression::Zlib] {
            let doc = document(FormatMetadata {
                compression: Some(compression),
                ..FormatMetadata::default()
            });
            let clean = NbtCodec.encode(&doc).unwrap();
            let mut bytes = clean.clone();
            bytes.extend_from_slice(&[0xAA, 0xBB, 0xCC]);

            let err = NbtCodec.decode(&bytes, DecodeOptions { strict: true }).unwrap_err();
            assert_eq!(err, DecodeError::TrailingData { remaining: 3 }, "{compression:?}");

            let lenient = NbtCodec.decode(&bytes, DecodeOptions { strict: false }).unwrap();
            assert_eq!(lenient, doc);
            assert_eq!(NbtCodec.encode(&lenient).unwrap(), clean);
        }
    }

    #[test]
    fn garbage_is_malformed_not_trailing() {
        let err = NbtCodec
            .decode(b"definitely not nbt", DecodeOptions::default())
            .unwrap_err();
        assert!(!err.is_trailing_data());
        assert_eq!(
            NbtCodec.decode(&[], DecodeOptions::default()).unwrap_err(),
            DecodeError::Empty
        );
    }

    #[test]
    fn zlib_header_check_uses_fcheck() {
        assert!(has_zlib_header(&[0x78, 0x9C]));
        assert!(has_zlib_header(&[0x78, 0x01]));
        assert!(!has_zlib_header(&[0x78, 0x00]));
        assert!(!has_zlib_header(&[0x0A, 0x00]));
    }

    #[test]
    fn bedrock_header_requires_matching_length() {
        let data = [8, 0, 0, 0, 2, 0, 0, 0, 10, 0];
        assert_eq!(split_bedrock_header(&data), (Some(8), &data[8..]));
        let short = [8, 0, 0, 0, 9, 0, 0, 0, 10, 0];
        assert_eq!(split_bedrock_header(&short).0, None);
    }
}
