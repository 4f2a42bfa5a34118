//! SNBT, the text notation of a tag tree.

use crate::binary::MAX_DEPTH;
use crate::tag::{Tag, TagId, TagList, format_f32, format_f64};
use indexmap::IndexMap;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnbtError {
    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("invalid escape sequence at offset {offset}")]
    InvalidEscape { offset: usize },

    #[error("number '{text}' out of range at offset {offset}")]
    OutOfRange { text: String, offset: usize },

    #[error("expected a {expected} array element, found '{text}' at offset {offset}")]
    ArrayElement {
        expected: TagId,
        text: String,
        offset: usize,
    },

    #[error("{source} (at offset {offset})")]
    MixedList {
        source: crate::tag::MixedListError,
        offset: usize,
    },

    #[error("duplicate key '{key}' at offset {offset}")]
    DuplicateKey { key: String, offset: usize },

    #[error("tags nested too deeply at offset {offset}")]
    TooDeep { offset: usize },
}

pub fn parse(text: &str) -> Result<Tag, SnbtError> {
    let mut parser = Parser { src: text, pos: 0 };
    parser.skip_ws();
    let tag = parser.value(0)?;
    parser.skip_ws();
    match parser.peek() {
        None => Ok(tag),
        Some(ch) => Err(SnbtError::UnexpectedChar {
            ch,
            offset: parser.pos,
        }),
    }
}

fn is_bare(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.' | '+')
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), SnbtError> {
        let offset = self.pos;
        match self.bump() {
            Some(ch) if ch == expected => Ok(()),
            Some(ch) => Err(SnbtError::UnexpectedChar { ch, offset }),
            None => Err(SnbtError::UnexpectedEnd),
        }
    }

    fn unexpected(&self) -> SnbtError {
        match self.peek() {
            Some(ch) => SnbtError::UnexpectedChar {
                ch,
                offset: self.pos,
            },
            None => SnbtError::UnexpectedEnd,
        }
    }

    fn value(&mut self, depth: usize) -> Result<Tag, SnbtError> {
        match self.peek() {
            Some('{') => self.compound(depth),
            Some('[') => {
                let rest = &self.src[self.pos + 1..];
                match rest.as_bytes() {
                    [b'B', b';', ..] => self.array(TagId::Byte),
                    [b'I', b';', ..] => self.array(TagId::Int),
                    [b'L', b';', ..] => self.array(TagId::Long),
                    _ => self.list(depth),
                }
            }
            Some('"' | '\'') => Ok(Tag::String(self.quoted()?)),
            Some(_) => {
                let offset = self.pos;
                let token = self.bare();
                if token.is_empty() {
                    return Err(self.unexpected());
                }
                classify(token, offset)
            }
            None => Err(SnbtError::UnexpectedEnd),
        }
    }

    fn bare(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_bare) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn quoted(&mut self) -> Result<String, SnbtError> {
        let Some(quote) = self.bump() else {
            return Err(SnbtError::UnexpectedEnd);
        };
        let mut out = String::new();
        loop {
            let offset = self.pos;
            match self.bump() {
                None => return Err(SnbtError::UnexpectedEnd),
                Some(ch) if ch == quote => return Ok(out),
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some('\'') => '\'',
                        Some('b') => '\u{8}',
                        Some('f') => '\u{c}',
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some('u') => {
                            let hex = self.src.get(self.pos..self.pos + 4);
                            let ch = hex
                                .and_then(|h| u32::from_str_radix(h, 16).ok())
                                .and_then(char::from_u32)
                                .ok_or(SnbtError::InvalidEscape { offset })?;
                            self.pos += 4;
                            ch
                        }
                        _ => return Err(SnbtError::InvalidEscape { offset }),
                    };
                    out.push(escaped);
                }
                Some(ch) => out.push(ch),
            }
        }
    }

    fn nested(&self, depth: usize) -> Result<usize, SnbtError> {
        if depth >= MAX_DEPTH {
            return Err(SnbtError::TooDeep { offset: self.pos });
        }
        Ok(depth + 1)
    }

    fn compound(&mut self, depth: usize) -> Result<Tag, SnbtError> {
        let depth = self.nested(depth)?;
        self.expect('{')?;
        let mut map = IndexMap::new();
        self.skip_ws();
        if self.peek() == Some('}') {
            self.bump();
            return Ok(Tag::Compound(map));
        }
        loop {
            self.skip_ws();
            let offset = self.pos;
            let key = match self.peek() {
                Some('"' | '\'') => self.quoted()?,
                _ => {
                    let key = self.bare().to_string();
                    if key.is_empty() {
                        return Err(self.unexpected());
                    }
                    key
                }
            };
            self.skip_ws();
            self.expect(':')?;
            self.skip_ws();
            let value = self.value(depth)?;
            if map.contains_key(&key) {
                return Err(SnbtError::DuplicateKey { key, offset });
            }
            map.insert(key, value);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Tag::Compound(map)),
                Some(ch) => {
                    return Err(SnbtError::UnexpectedChar {
                        ch,
                        offset: self.pos - ch.len_utf8(),
                    });
                }
                None => return Err(SnbtError::UnexpectedEnd),
            }
        }
    }

    fn list(&mut self, depth: usize) -> Result<Tag, SnbtError> {
        let depth = self.nested(depth)?;
        self.expect('[')?;
        let mut list = TagList::empty();
        self.skip_ws();
        if self.peek() == Some(']') {
            self.bump();
            return Ok(Tag::List(list));
        }
        loop {
            self.skip_ws();
            let offset = self.pos;
            let item = self.value(depth)?;
            list.push(item)
                .map_err(|source| SnbtError::MixedList { source, offset })?;
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(Tag::List(list)),
                Some(ch) => {
                    return Err(SnbtError::UnexpectedChar {
                        ch,
                        offset: self.pos - ch.len_utf8(),
                    });
                }
                None => return Err(SnbtError::UnexpectedEnd),
            }
        }
    }

    /// `[B; ...]`, `[I; ...]` or `[L; ...]`; `element` is the width of one entry.
    fn array(&mut self, element: TagId) -> Result<Tag, SnbtError> {
        // '[', type letter, ';'
        self.pos += 3;
        let mut bytes = Vec::new();
        let mut ints = Vec::new();
        let mut longs = Vec::new();
        self.skip_ws();
        if self.peek() == Some(']') {
            self.bump();
        } else {
            loop {
                self.skip_ws();
                let offset = self.pos;
                let token = self.bare();
                if token.is_empty() {
                    return Err(self.unexpected());
                }
                let mismatch = || SnbtError::ArrayElement {
                    expected: element,
                    text: token.to_string(),
                    offset,
                };
                match (element, classify(token, offset)?) {
                    (TagId::Byte, Tag::Byte(v)) => bytes.push(v),
                    (TagId::Int, Tag::Int(v)) => ints.push(v),
                    (TagId::Long, Tag::Long(v)) => longs.push(v),
                    _ => return Err(mismatch()),
                }
                self.skip_ws();
                match self.bump() {
                    Some(',') => continue,
                    Some(']') => break,
                    Some(ch) => {
                        return Err(SnbtError::UnexpectedChar {
                            ch,
                            offset: self.pos - ch.len_utf8(),
                        });
                    }
                    None => return Err(SnbtError::UnexpectedEnd),
                }
            }
        }
        Ok(match element {
            TagId::Byte => Tag::ByteArray(bytes),
            TagId::Int => Tag::IntArray(ints),
            _ => Tag::LongArray(longs),
        })
    }
}

fn is_integer(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_decimal(s: &str) -> bool {
    let body = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(i) => (&body[..i], Some(&body[i + 1..])),
        None => (body, None),
    };
    let (whole, fraction) = match mantissa.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (mantissa, None),
    };
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    let mantissa_ok = all_digits(whole)
        && fraction.is_none_or(all_digits)
        && (!whole.is_empty() || fraction.is_some_and(|f| !f.is_empty()));
    let exponent_ok = exponent.is_none_or(is_integer);
    mantissa_ok && exponent_ok && (fraction.is_some() || exponent.is_some())
}

fn is_float_literal(s: &str) -> bool {
    is_integer(s) || is_decimal(s) || matches!(s, "NaN" | "Infinity" | "-Infinity")
}

/// Turns a bare token into a typed tag; tokens that are not numbers become strings.
fn classify(token: &str, offset: usize) -> Result<Tag, SnbtError> {
    match token {
        "true" => return Ok(Tag::Byte(1)),
        "false" => return Ok(Tag::Byte(0)),
        _ => {}
    }

    let out_of_range = || SnbtError::OutOfRange {
        text: token.to_string(),
        offset,
    };

    if let Some((suffix_at, suffix)) = token.char_indices().last() {
        let rest = &token[..suffix_at];
        match suffix.to_ascii_lowercase() {
            'b' if is_integer(rest) => {
                return rest.parse().map(Tag::Byte).map_err(|_| out_of_range());
            }
            's' if is_integer(rest) => {
                return rest.parse().map(Tag::Short).map_err(|_| out_of_range());
            }
            'l' if is_integer(rest) => {
                return rest.parse().map(Tag::Long).map_err(|_| out_of_range());
            }
            'f' if is_float_literal(rest) => {
                return rest.parse().map(Tag::Float).map_err(|_| out_of_range());
            }
            'd' if is_float_literal(rest) => {
                return rest.parse().map(Tag::Double).map_err(|_| out_of_range());
            }
            _ => {}
        }
    }

    if is_integer(token) {
        return token.parse().map(Tag::Int).map_err(|_| out_of_range());
    }
    if is_decimal(token) {
        return token.parse().map(Tag::Double).map_err(|_| out_of_range());
    }
    Ok(Tag::String(token.to_string()))
}

/// Writes `tag` as SNBT. `indent == 0` gives a single line.
pub fn stringify(tag: &Tag, indent: usize) -> String {
    let mut out = String::new();
    write_tag(&mut out, tag, indent, 0);
    out
}

fn write_tag(out: &mut String, tag: &Tag, indent: usize, level: usize) {
    match tag {
        Tag::Byte(v) => {
            let _ = write!(out, "{v}b");
        }
        Tag::Short(v) => {
            let _ = write!(out, "{v}s");
        }
        Tag::Int(v) => {
            let _ = write!(out, "{v}");
        }
        Tag::Long(v) => {
            let _ = write!(out, "{v}l");
        }
        Tag::Float(v) => {
            out.push_str(&format_f32(*v));
            out.push('f');
        }
        Tag::Double(v) => {
            out.push_str(&format_f64(*v));
            out.push('d');
        }
        Tag::String(s) => write_quoted(out, s),
        Tag::ByteArray(values) => write_array(out, "B", values.iter().map(|v| format!("{v}b"))),
        Tag::IntArray(values) => write_array(out, "I", values.iter().map(|v| v.to_string())),
        Tag::LongArray(values) => write_array(out, "L", values.iter().map(|v| format!("{v}l"))),
        Tag::List(list) => {
            out.push('[');
            for (i, item) in list.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                newline(out, indent, level + 1);
                write_tag(out, item, indent, level + 1);
            }
            if !list.is_empty() {
                newline(out, indent, level);
            }
            out.push(']');
        }
        Tag::Compound(map) => {
            out.push('{');
            for (i, (key, value)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                newline(out, indent, level + 1);
                if !key.is_empty() && key.chars().all(is_bare) {
                    out.push_str(key);
                } else {
                    write_quoted(out, key);
                }
                out.push(':');
                if indent > 0 {
                    out.push(' ');
                }
                write_tag(out, value, indent, level + 1);
            }
            if !map.is_empty() {
                newline(out, indent, level);
            }
            out.push('}');
        }
    }
}

fn newline(out: &mut String, indent: usize, level: usize) {
    if indent > 0 {
        out.push('\n');
        out.push_str(&" ".repeat(indent * level));
    }
}

fn write_array(out: &mut String, prefix: &str, items: impl Iterator<Item = String>) {
    out.push('[');
    out.push_str(prefix);
    out.push(';');
    for (i, item) in items.enumerate() {
        out.push_str(if i == 0 { " " } else { ", " });
        out.push_str(&item);
    }
    out.push(']');
}

fn write_quoted(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::{SnbtError, parse, stringify};
    use crate::tag::{Tag, TagId, TagList};
    use indexmap::IndexMap;

    #[test]
    fn suffixes_select_tag_width() {
        assert_eq!(parse("1b").unwrap(), Tag::Byte(1));
        assert_eq!(parse("-2S").unwrap(), Tag::Short(-2));
        assert_eq!(parse("3").unwrap(), Tag::Int(3));
        assert_eq!(parse("4l").unwrap(), Tag::Long(4));
        assert_eq!(parse("1.5f").unwrap(), Tag::Float(1.5));
        assert_eq!(parse("2d").unwrap(), Tag::Double(2.0));
        assert_eq!(parse("2.5").unwrap(), Tag::Double(2.5));
        assert_eq!(parse("1e3").unwrap(), Tag::Double(1000.0));
        assert_eq!(parse("true").unwrap(), Tag::Byte(1));
    }

    #[test]
    fn non_numbers_fall_back_to_strings() {
        assert_eq!(parse("hello").unwrap(), Tag::String("hello".to_string()));
        assert_eq!(parse("bad").unwrap(), Tag::String("bad".to_string()));
        assert_eq!(parse("1.2.3").unwrap(), Tag::String("1.2.3".to_string()));
        assert_eq!(
            parse("'it\\'s'").unwrap(),
            Tag::String("it's".to_string())
        );
    }

    #[test]
    fn out_of_range_numbers_are_errors() {
        assert!(matches!(parse("300b"), Err(SnbtError::OutOfRange { .. })));
        assert!(matches!(parse("3000000000"), Err(SnbtError::OutOfRange { .. })));
    }

    #[test]
    fn parses_nested_containers() {
        let tag = parse(r#"{ a: [I; 1, 2], "b c": [{x: 1b}, {}], d: [] , e: [B;] }"#).unwrap();
        assert_eq!(tag.get("a"), Some(&Tag::IntArray(vec![1, 2])));
        assert_eq!(tag.get("b c").and_then(Tag::entry_count), Some(2));
        assert_eq!(tag.get("d").and_then(Tag::as_list).map(TagList::element), Some(TagId::End));
        assert_eq!(tag.get("e"), Some(&Tag::ByteArray(vec![])));
    }

    #[test]
    fn rejects_mixed_lists_and_bad_arrays() {
        assert!(matches!(parse("[1, 2b]"), Err(SnbtError::MixedList { .. })));
        assert!(matches!(parse("[B; 1, 2]"), Err(SnbtError::ArrayElement { .. })));
        assert!(matches!(parse("{a: 1, a: 2}"), Err(SnbtError::DuplicateKey { .. })));
        assert!(matches!(parse("{a: 1"), Err(SnbtError::UnexpectedEnd)));
        assert!(matches!(parse("{a: 1} x"), Err(SnbtError::UnexpectedChar { ch: 'x', .. })));
    }

    #[test]
    fn stringify_indents_containers() {
        let mut map = IndexMap::new();
        map.insert("foo".to_string(), Tag::ByteArray(vec![1, 2, 3]));
        map.insert("a b".to_string(), Tag::List(TagList::new(vec![Tag::Short(5)]).unwrap()));
        map.insert("s".to_string(), Tag::String("line\nbreak".to_string()));
        let text = stringify(&Tag::Compound(map), 2);
        assert_eq!(
            text,
            "{\n  foo: [B; 1b, 2b, 3b],\n  \"a b\": [\n    5s\n  ],\n  s: \"line\\nbreak\"\n}"
        );
    }

    #[test]
    fn stringified_text_parses_back() {
        let mut map = IndexMap::new();
        map.insert("f".to_string(), Tag::Float(0.1));
        map.insert("d".to_string(), Tag::Double(-1e-7));
        map.insert("inf".to_string(), Tag::Double(f64::INFINITY));
        map.insert("l".to_string(), Tag::LongArray(vec![i64::MIN, i64::MAX]));
        map.insert("".to_string(), Tag::String("quote\"d".to_string()));
        let tag = Tag::Compound(map);
        for indent in [0, 2, 4] {
            assert_eq!(parse(&stringify(&tag, indent)).unwrap(), tag);
        }
    }
}
