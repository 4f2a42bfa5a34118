use indexmap::IndexMap;
use std::fmt;

/// Wire discriminant of a tag. `End` only appears as the element type of an empty list
/// and as the compound terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagId {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

impl TagId {
    pub fn from_u8(id: u8) -> Option<Self> {
        Some(match id {
            0 => TagId::End,
            1 => TagId::Byte,
            2 => TagId::Short,
            3 => TagId::Int,
            4 => TagId::Long,
            5 => TagId::Float,
            6 => TagId::Double,
            7 => TagId::ByteArray,
            8 => TagId::String,
            9 => TagId::List,
            10 => TagId::Compound,
            11 => TagId::IntArray,
            12 => TagId::LongArray,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            TagId::End => "End",
            TagId::Byte => "Byte",
            TagId::Short => "Short",
            TagId::Int => "Int",
            TagId::Long => "Long",
            TagId::Float => "Float",
            TagId::Double => "Double",
            TagId::ByteArray => "ByteArray",
            TagId::String => "String",
            TagId::List => "List",
            TagId::Compound => "Compound",
            TagId::IntArray => "IntArray",
            TagId::LongArray => "LongArray",
        }
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One typed unit of NBT data. Primitive variants carry their bit width in the variant
/// itself, so `Byte(1)` and `Int(1)` are different tags.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    ByteArray(Vec<i8>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    List(TagList),
    Compound(IndexMap<String, Tag>),
}

impl Tag {
    pub fn id(&self) -> TagId {
        match self {
            Tag::Byte(_) => TagId::Byte,
            Tag::Short(_) => TagId::Short,
            Tag::Int(_) => TagId::Int,
            Tag::Long(_) => TagId::Long,
            Tag::Float(_) => TagId::Float,
            Tag::Double(_) => TagId::Double,
            Tag::String(_) => TagId::String,
            Tag::ByteArray(_) => TagId::ByteArray,
            Tag::IntArray(_) => TagId::IntArray,
            Tag::LongArray(_) => TagId::LongArray,
            Tag::List(_) => TagId::List,
            Tag::Compound(_) => TagId::Compound,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Tag::ByteArray(_)
                | Tag::IntArray(_)
                | Tag::LongArray(_)
                | Tag::List(_)
                | Tag::Compound(_)
        )
    }

    /// Number of direct entries of a container, `None` for primitives.
    pub fn entry_count(&self) -> Option<usize> {
        match self {
            Tag::ByteArray(values) => Some(values.len()),
            Tag::IntArray(values) => Some(values.len()),
            Tag::LongArray(values) => Some(values.len()),
            Tag::List(list) => Some(list.len()),
            Tag::Compound(map) => Some(map.len()),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&IndexMap<String, Tag>> {
        match self {
            Tag::Compound(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_compound_mut(&mut self) -> Option<&mut IndexMap<String, Tag>> {
        match self {
            Tag::Compound(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&TagList> {
        match self {
            Tag::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.as_compound().and_then(|m| m.get(key))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Tag> {
        self.as_compound_mut().and_then(|m| m.get_mut(key))
    }

    /// Plain textual form of a primitive value as shown in the tree view
    /// (no type suffix, no quoting). Containers return `None`.
    pub fn value_string(&self) -> Option<String> {
        Some(match self {
            Tag::Byte(v) => v.to_string(),
            Tag::Short(v) => v.to_string(),
            Tag::Int(v) => v.to_string(),
            Tag::Long(v) => v.to_string(),
            Tag::Float(v) => format_f32(*v),
            Tag::Double(v) => format_f64(*v),
            Tag::String(s) => s.clone(),
            _ => return None,
        })
    }
}

pub(crate) fn format_f32(v: f32) -> String {
    if v.is_finite() {
        let mut buf = ryu::Buffer::new();
        let s = buf.format_finite(v);
        s.strip_suffix(".0").unwrap_or(s).to_string()
    } else {
        non_finite(v.is_nan(), v.is_sign_negative())
    }
}

pub(crate) fn format_f64(v: f64) -> String {
    if v.is_finite() {
        let mut buf = ryu::Buffer::new();
        let s = buf.format_finite(v);
        s.strip_suffix(".0").unwrap_or(s).to_string()
    } else {
        non_finite(v.is_nan(), v.is_sign_negative())
    }
}

fn non_finite(nan: bool, negative: bool) -> String {
    match (nan, negative) {
        (true, _) => "NaN".to_string(),
        (false, true) => "-Infinity".to_string(),
        (false, false) => "Infinity".to_string(),
    }
}

/// A homogeneous list. The element type is kept even when the list is empty so that
/// re-encoding reproduces the declared type byte.
#[derive(Debug, Clone, PartialEq)]
pub struct TagList {
    element: TagId,
    items: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("list of {expected} cannot hold a {found} at index {index}")]
pub struct MixedListError {
    pub expected: TagId,
    pub found: TagId,
    pub index: usize,
}

impl TagList {
    /// Builds a list from items, taking the element type from the first item
    /// (`End` when empty).
    pub fn new(items: Vec<Tag>) -> Result<Self, MixedListError> {
        let element = items.first().map(Tag::id).unwrap_or(TagId::End);
        Self::with_element(element, items)
    }

    /// Builds a list with an explicit element type; every item must match it.
    pub fn with_element(element: TagId, items: Vec<Tag>) -> Result<Self, MixedListError> {
        if let Some((index, found)) = items
            .iter()
            .map(Tag::id)
            .enumerate()
            .find(|(_, id)| *id != element)
        {
            return Err(MixedListError {
                expected: element,
                found,
                index,
            });
        }
        Ok(Self { element, items })
    }

    pub fn empty() -> Self {
        Self {
            element: TagId::End,
            items: Vec::new(),
        }
    }

    /// For readers that already guarantee every item has type `element`.
    pub(crate) fn from_homogeneous(element: TagId, items: Vec<Tag>) -> Self {
        debug_assert!(items.iter().all(|item| item.id() == element));
        Self { element, items }
    }

    pub fn element(&self) -> TagId {
        self.element
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Tag> {
        self.items.get(index)
    }

    /// Appends an item, adopting its type if the list is still untyped.
    pub fn push(&mut self, item: Tag) -> Result<(), MixedListError> {
        if self.element == TagId::End && self.items.is_empty() {
            self.element = item.id();
        }
        if item.id() != self.element {
            return Err(MixedListError {
                expected: self.element,
                found: item.id(),
                index: self.items.len(),
            });
        }
        self.items.push(item);
        Ok(())
    }
}

impl<'a> IntoIterator for &'a TagList {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Big,
    Little,
    LittleVarint,
}

impl Endianness {
    pub const ALL: [Endianness; 3] = [
        Endianness::Big,
        Endianness::Little,
        Endianness::LittleVarint,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Endianness::Big => "Big",
            Endianness::Little => "Little",
            Endianness::LittleVarint => "Little-varint",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zlib,
    RawDeflate,
}

/// How a document was (or will be) laid out on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatMetadata {
    /// `None` means the root is unnamed.
    pub root_name: Option<String>,
    pub endianness: Endianness,
    /// `None` means uncompressed.
    pub compression: Option<Compression>,
    /// `None` means no Bedrock level header.
    pub bedrock_level: Option<u32>,
}

impl Default for FormatMetadata {
    fn default() -> Self {
        Self {
            root_name: Some(String::new()),
            endianness: Endianness::Big,
            compression: None,
            bedrock_level: None,
        }
    }
}

/// A decoded document: the root tag plus the metadata needed to write it back.
#[derive(Debug, Clone, PartialEq)]
pub struct RootDocument {
    pub root_tag: Tag,
    pub format: FormatMetadata,
}

impl RootDocument {
    pub fn new(root_tag: Tag, format: FormatMetadata) -> Self {
        Self { root_tag, format }
    }

    pub fn root_name(&self) -> Option<&str> {
        self.format.root_name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::{FormatMetadata, Tag, TagId, TagList};
    use indexmap::IndexMap;

    #[test]
    fn list_rejects_mixed_element_types() {
        let err = TagList::new(vec![Tag::Int(1), Tag::Byte(2)]).unwrap_err();
        assert_eq!(err.expected, TagId::Int);
        assert_eq!(err.found, TagId::Byte);
        assert_eq!(err.index, 1);
    }

    #[test]
    fn empty_list_keeps_declared_type() {
        let list = TagList::with_element(TagId::Compound, vec![]).unwrap();
        assert_eq!(list.element(), TagId::Compound);
        assert!(list.is_empty());

        let mut untyped = TagList::empty();
        untyped.push(Tag::Short(3)).unwrap();
        assert_eq!(untyped.element(), TagId::Short);
        assert!(untyped.push(Tag::Int(3)).is_err());
    }

    #[test]
    fn container_len_counts_direct_entries_only() {
        let mut inner = IndexMap::new();
        inner.insert("a".to_string(), Tag::Int(1));
        inner.insert("b".to_string(), Tag::IntArray(vec![1, 2, 3]));
        let tag = Tag::Compound(inner);
        assert_eq!(tag.entry_count(), Some(2));
        assert_eq!(Tag::Byte(0).entry_count(), None);
        assert!(tag.is_container());
    }

    #[test]
    fn value_string_drops_width_information() {
        assert_eq!(Tag::Byte(-1).value_string().as_deref(), Some("-1"));
        assert_eq!(Tag::Long(1 << 40).value_string().as_deref(), Some("1099511627776"));
        assert_eq!(Tag::Float(1.5).value_string().as_deref(), Some("1.5"));
        assert_eq!(Tag::Double(2.0).value_string().as_deref(), Some("2"));
        assert_eq!(Tag::Double(f64::NAN).value_string().as_deref(), Some("NaN"));
        assert_eq!(Tag::IntArray(vec![]).value_string(), None);
    }

    #[test]
    fn default_format_is_named_big_endian_uncompressed() {
        let format = FormatMetadata::default();
        assert_eq!(format.root_name.as_deref(), Some(""));
        assert_eq!(format.compression, None);
        assert_eq!(format.bedrock_level, None);
    }
}
