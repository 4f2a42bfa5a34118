use dovetail::{
    Codec, Compression, DecodeError, DecodeOptions, Endianness, Expansion, FormatMetadata,
    NbtCodec, RootDocument, Tag, TagId, TagList,
};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

const STRICT: DecodeOptions = DecodeOptions { strict: true };
const LENIENT: DecodeOptions = DecodeOptions { strict: false };

fn level_data() -> Tag {
    let mut player = IndexMap::new();
    player.insert("Health".to_string(), Tag::Float(20.0));
    player.insert("XpSeed".to_string(), Tag::Long(-9_000_000_000));
    let pos = vec![Tag::Double(0.5), Tag::Double(64.0), Tag::Double(-3.25)];
    player.insert("Pos".to_string(), Tag::List(TagList::new(pos).unwrap()));

    let mut root = IndexMap::new();
    root.insert("LevelName".to_string(), Tag::String("Überwelt".to_string()));
    root.insert("GameType".to_string(), Tag::Int(1));
    root.insert("hardcore".to_string(), Tag::Byte(0));
    root.insert("SpawnY".to_string(), Tag::Short(64));
    root.insert("Player".to_string(), Tag::Compound(player));
    root.insert("Seeds".to_string(), Tag::LongArray(vec![1, -1, i64::MAX]));
    root.insert("Biomes".to_string(), Tag::IntArray(vec![0, 7, 7, 12]));
    root.insert("Blocks".to_string(), Tag::ByteArray(vec![1, 2, -3]));
    root.insert("Empty".to_string(), Tag::List(TagList::empty()));
    Tag::Compound(root)
}

fn format(endianness: Endianness, compression: Option<Compression>) -> FormatMetadata {
    FormatMetadata {
        root_name: Some("Data".to_string()),
        endianness,
        compression,
        bedrock_level: None,
    }
}

#[test]
fn strict_decode_then_encode_is_byte_identical() -> Result<()> {
    for endianness in Endianness::ALL {
        for compression in [None, Some(Compression::Gzip)] {
            let doc = RootDocument::new(level_data(), format(endianness, compression));
            let bytes = NbtCodec.encode(&doc)?;

            let decoded = NbtCodec.decode(&bytes, STRICT)?;
            assert_eq!(decoded, doc);
            assert_eq!(NbtCodec.encode(&decoded)?, bytes);
        }
    }
    Ok(())
}

#[test]
fn bedrock_header_survives_round_trip() -> Result<()> {
    let mut format = format(Endianness::Little, None);
    format.bedrock_level = Some(10);
    let doc = RootDocument::new(level_data(), format);
    let bytes = NbtCodec.encode(&doc)?;

    assert_eq!(&bytes[..4], &10u32.to_le_bytes());
    assert_eq!(u32::from_le_bytes(bytes[4..8].try_into()?) as usize, bytes.len() - 8);
    assert_eq!(NbtCodec.decode(&bytes, STRICT)?, doc);
    Ok(())
}

#[test]
fn trailing_bytes_fail_strict_and_lenient_matches_prefix() -> Result<()> {
    let doc = RootDocument::new(level_data(), format(Endianness::Big, None));
    let prefix = NbtCodec.encode(&doc)?;
    let mut bytes = prefix.clone();
    bytes.extend_from_slice(&[0, 0, 0, 0, 0x42]);

    let err = NbtCodec.decode(&bytes, STRICT).unwrap_err();
    assert!(err.is_trailing_data(), "unexpected error: {err}");

    let lenient = NbtCodec.decode(&bytes, LENIENT)?;
    assert_eq!(lenient, NbtCodec.decode(&prefix, STRICT)?);

    // The dropped bytes do not come back on the next save.
    assert_eq!(NbtCodec.encode(&lenient)?, prefix);
    Ok(())
}

#[test]
fn truncated_java_file_is_malformed_not_trailing() -> Result<()> {
    let mut format = format(Endianness::Big, None);
    format.root_name = Some(String::new());
    let bytes = NbtCodec.encode(&RootDocument::new(level_data(), format))?;

    for cut in [bytes.len() - 1, bytes.len() / 2] {
        for options in [STRICT, LENIENT] {
            let err = NbtCodec.decode(&bytes[..cut], options).unwrap_err();
            assert!(!err.is_trailing_data(), "cut at {cut}: {err}");
        }
    }
    Ok(())
}

#[test]
fn gzip_with_trailing_bytes_fails_strict_and_lenient_drops_them() -> Result<()> {
    let doc = RootDocument::new(level_data(), format(Endianness::Big, Some(Compression::Gzip)));
    let clean = NbtCodec.encode(&doc)?;
    let mut bytes = clean.clone();
    bytes.extend_from_slice(&[0, 0, 0, 0, 0x42]);

    let err = NbtCodec.decode(&bytes, STRICT).unwrap_err();
    assert_eq!(err, DecodeError::TrailingData { remaining: 5 });

    let lenient = NbtCodec.decode(&bytes, LENIENT)?;
    assert_eq!(lenient, doc);
    assert_eq!(NbtCodec.encode(&lenient)?, clean);
    Ok(())
}

#[test]
fn gzip_big_endian_byte_array_renders_with_count() -> Result<()> {
    let mut root = IndexMap::new();
    root.insert("foo".to_string(), Tag::ByteArray(vec![1, 2, 3]));
    let doc = RootDocument::new(
        Tag::Compound(root),
        FormatMetadata {
            root_name: Some(String::new()),
            endianness: Endianness::Big,
            compression: Some(Compression::Gzip),
            bedrock_level: None,
        },
    );
    let bytes = NbtCodec.encode(&doc)?;
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);

    let decoded = NbtCodec.decode(&bytes, STRICT)?;
    assert_eq!(decoded.format.compression, Some(Compression::Gzip));
    assert_eq!(decoded.format.endianness, Endianness::Big);

    let tree = dovetail::tree::render(
        decoded.root_name(),
        &decoded.root_tag,
        true,
        &Expansion::default(),
    )?;
    let root = tree.node(tree.root());
    assert!(root.is_open());
    assert_eq!(root.kind(), TagId::Compound);
    assert_eq!(root.label(), "\"\"");
    assert_eq!(tree.child_labels(tree.root()), vec!["foo [3]".to_string()]);
    Ok(())
}

#[test]
fn text_notation_preserves_the_tree() -> Result<()> {
    let tag = level_data();
    let text = NbtCodec.stringify_text(&tag, 2);
    assert_eq!(NbtCodec.parse_text(&text)?, tag);
    Ok(())
}
