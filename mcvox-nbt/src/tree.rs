use std::collections::HashMap;
use std::io::Write;

use itertools::Itertools as _;
use mcvox_util::ByteCursor;

use super::{walk_compound, walk_document, NbtError, Scalar, Step, Tag, Visit};

/// A list whose values MUST all be the same tag. The tag is fixed either up
/// front or by the first push; pushing a mismatching value is an error.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NbtList {
    tag: Option<Tag>,
    list: Vec<Nbt>,
}

impl NbtList {
    pub fn new() -> Self {
        Self::default()
    }

    fn new_with_tag(tag: Tag) -> Self {
        Self {
            tag: (tag != Tag::End).then_some(tag),
            list: Vec::new(),
        }
    }

    pub fn tag(&self) -> Option<Tag> {
        self.tag.or_else(|| self.list.first().map(|item| item.tag()))
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn push(&mut self, value: Nbt) -> Result<(), NbtError> {
        if let Some(tag) = self.tag() {
            if tag != value.tag() {
                return Err(NbtError::ListTagMismatch {
                    expected: tag,
                    got: value.tag(),
                });
            }
        }
        self.list.push(value);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Nbt> {
        self.list.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Nbt> {
        self.list.iter()
    }
}

impl IntoIterator for NbtList {
    type Item = Nbt;
    type IntoIter = std::vec::IntoIter<Self::Item>;
    fn into_iter(self) -> Self::IntoIter {
        self.list.into_iter()
    }
}

/// Materialized NBT tree, built through the default recording visitor over
/// the walker grammar. Inspection and test paths use this; the decoding hot
/// path uses targeted visitors instead and never builds a tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Nbt {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    List(NbtList),
    Compound(HashMap<String, Nbt>),
    ByteArray(Box<[i8]>),
    IntArray(Box<[i32]>),
    LongArray(Box<[i64]>),
}

impl Nbt {
    pub fn tag(&self) -> Tag {
        match self {
            Nbt::Byte(..) => Tag::Byte,
            Nbt::Short(..) => Tag::Short,
            Nbt::Int(..) => Tag::Int,
            Nbt::Long(..) => Tag::Long,
            Nbt::Float(..) => Tag::Float,
            Nbt::Double(..) => Tag::Double,
            Nbt::String(..) => Tag::String,
            Nbt::List(..) => Tag::List,
            Nbt::Compound(..) => Tag::Compound,
            Nbt::ByteArray(..) => Tag::ByteArray,
            Nbt::IntArray(..) => Tag::IntArray,
            Nbt::LongArray(..) => Tag::LongArray,
        }
    }

    /// Parse a chunk document (named root compound, header skipped) into a
    /// tree rooted at [`Nbt::Compound`].
    pub fn parse_document(data: &[u8]) -> Result<Nbt, NbtError> {
        let mut cur = ByteCursor::new(data);
        let mut builder = TreeBuilder::new();
        walk_document(&mut cur, &mut builder)?;
        builder.finish()
    }

    /// Parse one unnamed compound payload with the cursor at its first entry.
    pub fn parse_compound(cur: &mut ByteCursor) -> Result<Nbt, NbtError> {
        let mut builder = TreeBuilder::new();
        walk_compound(cur, &mut builder)?;
        builder.finish()
    }

    pub fn compound_get(&self, name: &str) -> Option<&Nbt> {
        match self {
            Nbt::Compound(map) => map.get(name),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&NbtList> {
        match self {
            Nbt::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> Option<i8> {
        match self {
            Nbt::Byte(v) => Some(*v),
            _ => None,
        }
    }

    /// Any integral value widened to i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Nbt::Byte(v) => Some(*v as i64),
            Nbt::Short(v) => Some(*v as i64),
            Nbt::Int(v) => Some(*v as i64),
            Nbt::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Nbt::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_long_array(&self) -> Option<&[i64]> {
        match self {
            Nbt::LongArray(v) => Some(v),
            _ => None,
        }
    }

    /// Indented structural dump, one entry per line. Driver trace logging
    /// uses this the way the old chunk explorer printed tag/name pairs.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, "", 0);
        out
    }

    fn dump_into(&self, out: &mut String, name: &str, depth: usize) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        let label = if name.is_empty() { "-" } else { name };
        match self {
            Nbt::Compound(map) => {
                out.push_str(&format!("{}: Compound ({} entries)\n", label, map.len()));
                // Sorted so the dump is stable across runs.
                for (key, value) in map.iter().sorted_by_key(|(key, _)| key.as_str()) {
                    value.dump_into(out, key, depth + 1);
                }
            }
            Nbt::List(list) => {
                out.push_str(&format!(
                    "{}: List of {:?} ({} entries)\n",
                    label,
                    list.tag().unwrap_or(Tag::End),
                    list.len()
                ));
                for value in list.iter() {
                    value.dump_into(out, "", depth + 1);
                }
            }
            Nbt::ByteArray(values) => {
                out.push_str(&format!("{}: ByteArray[{}]\n", label, values.len()));
            }
            Nbt::IntArray(values) => {
                out.push_str(&format!("{}: IntArray[{}]\n", label, values.len()));
            }
            Nbt::LongArray(values) => {
                out.push_str(&format!("{}: LongArray[{}]\n", label, values.len()));
            }
            value => out.push_str(&format!("{}: {:?}\n", label, value)),
        }
    }
}

enum Frame {
    Compound(String, HashMap<String, Nbt>),
    List(String, NbtList),
}

/// The recording visitor: enters everything, consumes every scalar, and
/// assembles the tree on a frame stack.
struct TreeBuilder {
    stack: Vec<Frame>,
    error: Option<NbtError>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Frame::Compound(String::new(), HashMap::new())],
            error: None,
        }
    }

    fn finish(mut self) -> Result<Nbt, NbtError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        // The walker balances begin/end calls, so the stack unwinds exactly
        // to the root unless an error interrupted it.
        match self.stack.pop() {
            Some(Frame::Compound(_, map)) if self.stack.is_empty() => Ok(Nbt::Compound(map)),
            _ => Err(NbtError::UnbalancedDocument),
        }
    }

    fn attach(&mut self, name: &str, value: Nbt) {
        if self.error.is_some() {
            return;
        }
        let result = match self.stack.last_mut() {
            Some(Frame::Compound(_, map)) => {
                map.insert(name.to_owned(), value);
                Ok(())
            }
            Some(Frame::List(_, list)) => list.push(value),
            None => Ok(()),
        };
        if let Err(error) = result {
            self.error = Some(error);
        }
    }
}

impl Visit for TreeBuilder {
    fn entry(&mut self, tag: Tag, _name: &str) -> Step {
        match tag {
            Tag::Compound | Tag::List => Step::Enter,
            _ => Step::Consume,
        }
    }

    fn scalar(&mut self, name: &str, value: Scalar<'_>) {
        let value = match value {
            Scalar::Byte(v) => Nbt::Byte(v),
            Scalar::Short(v) => Nbt::Short(v),
            Scalar::Int(v) => Nbt::Int(v),
            Scalar::Long(v) => Nbt::Long(v),
            Scalar::Float(v) => Nbt::Float(v),
            Scalar::Double(v) => Nbt::Double(v),
            Scalar::String(v) => Nbt::String(v.to_owned()),
            Scalar::ByteArray(v) => Nbt::ByteArray(v.iter().map(|b| *b as i8).collect()),
            Scalar::IntArray(v) => Nbt::IntArray(v.into()),
            Scalar::LongArray(v) => Nbt::LongArray(v.into()),
        };
        self.attach(name, value);
    }

    fn compound_begin(&mut self, name: &str) {
        self.stack.push(Frame::Compound(name.to_owned(), HashMap::new()));
    }

    fn compound_end(&mut self) {
        if let Some(Frame::Compound(name, map)) = self.stack.pop() {
            self.attach(&name, Nbt::Compound(map));
        }
    }

    fn list_begin(&mut self, name: &str, element: Tag, _len: usize) {
        self.stack
            .push(Frame::List(name.to_owned(), NbtList::new_with_tag(element)));
    }

    fn list_end(&mut self) {
        if let Some(Frame::List(name, list)) = self.stack.pop() {
            self.attach(&name, Nbt::List(list));
        }
    }
}

impl Nbt {
    fn write_payload(&self, out: &mut impl Write) -> Result<(), NbtError> {
        match self {
            Nbt::Byte(v) => out.write_all(&v.to_be_bytes())?,
            Nbt::Short(v) => out.write_all(&v.to_be_bytes())?,
            Nbt::Int(v) => out.write_all(&v.to_be_bytes())?,
            Nbt::Long(v) => out.write_all(&v.to_be_bytes())?,
            Nbt::Float(v) => out.write_all(&v.to_be_bytes())?,
            Nbt::Double(v) => out.write_all(&v.to_be_bytes())?,
            Nbt::String(v) => {
                let len =
                    u16::try_from(v.len()).map_err(|_| NbtError::StringTooLong(v.len()))?;
                out.write_all(&len.to_be_bytes())?;
                out.write_all(v.as_bytes())?;
            }
            Nbt::List(list) => {
                out.write_all(&[u8::from(list.tag().unwrap_or(Tag::End))])?;
                out.write_all(&(list.len() as i32).to_be_bytes())?;
                for value in list.iter() {
                    value.write_payload(out)?;
                }
            }
            Nbt::Compound(map) => {
                for (name, value) in map.iter() {
                    out.write_all(&[u8::from(value.tag())])?;
                    let len =
                        u16::try_from(name.len()).map_err(|_| NbtError::StringTooLong(name.len()))?;
                    out.write_all(&len.to_be_bytes())?;
                    out.write_all(name.as_bytes())?;
                    value.write_payload(out)?;
                }
                out.write_all(&[u8::from(Tag::End)])?;
            }
            Nbt::ByteArray(values) => {
                out.write_all(&(values.len() as i32).to_be_bytes())?;
                for value in values.iter() {
                    out.write_all(&value.to_be_bytes())?;
                }
            }
            Nbt::IntArray(values) => {
                out.write_all(&(values.len() as i32).to_be_bytes())?;
                for value in values.iter() {
                    out.write_all(&value.to_be_bytes())?;
                }
            }
            Nbt::LongArray(values) => {
                out.write_all(&(values.len() as i32).to_be_bytes())?;
                for value in values.iter() {
                    out.write_all(&value.to_be_bytes())?;
                }
            }
        }
        Ok(())
    }

    /// Write as a named document (root tag, name header, payload). Test
    /// fixtures and the inspection round-trip use this; region files are
    /// never written back.
    pub fn write_document(&self, name: &str, out: &mut impl Write) -> Result<(), NbtError> {
        out.write_all(&[u8::from(self.tag())])?;
        let len = u16::try_from(name.len()).map_err(|_| NbtError::StringTooLong(name.len()))?;
        out.write_all(&len.to_be_bytes())?;
        out.write_all(name.as_bytes())?;
        self.write_payload(out)
    }
}
