//! One implementation of the NBT grammar, parameterized by a visitor.
//!
//! The walker reads tag-and-name headers and asks the visitor what to do
//! with each payload. [`Step::Skip`] advances past the payload by computed
//! length without allocating; [`Step::Enter`] descends into compounds and
//! lists; [`Step::Consume`] decodes a scalar payload and hands it over;
//! [`Step::Halt`] stops the whole walk with the cursor parked at the start
//! of the halted entry's payload.
//!
//! The materialized tree of [`crate::Nbt`] is a visitor over this same
//! grammar, as are the targeted section parses in the anvil crate.

use mcvox_util::ByteCursor;

use super::{NbtError, Tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Skip,
    Enter,
    Consume,
    Halt,
}

/// A decoded leaf payload. Strings and byte arrays borrow from the document
/// buffer; the numeric arrays are decoded from big-endian on the way out.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar<'a> {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(&'a str),
    ByteArray(&'a [u8]),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

#[allow(unused_variables)]
pub trait Visit {
    /// Decide what to do with a named entry before its payload is read.
    fn entry(&mut self, tag: Tag, name: &str) -> Step {
        Step::Skip
    }

    /// A payload requested with [`Step::Consume`]. List elements arrive with
    /// an empty name.
    fn scalar(&mut self, name: &str, value: Scalar<'_>) {}

    /// An entered compound; list element compounds arrive with an empty name.
    fn compound_begin(&mut self, name: &str) {}

    fn compound_end(&mut self) {}

    /// Header of an entered list, before its elements are visited.
    fn list_begin(&mut self, name: &str, element: Tag, len: usize) {}

    fn list_end(&mut self) {}
}

fn read_len(cur: &mut ByteCursor) -> Result<usize, NbtError> {
    let len = cur.i32()?;
    usize::try_from(len).map_err(|_| NbtError::NegativeLength(len))
}

/// Walk a chunk document: a named root compound whose tag byte and name
/// header are skipped before descending. Returns whether the visitor halted.
pub fn walk_document<V: Visit>(cur: &mut ByteCursor, visitor: &mut V) -> Result<bool, NbtError> {
    let tag = Tag::try_from(cur.u8()?)?;
    if tag != Tag::Compound {
        return Err(NbtError::RootNotCompound(tag));
    }
    let name_len = cur.u16()? as usize;
    cur.skip(name_len)?;
    walk_compound(cur, visitor)
}

/// Walk the entries of a compound payload. Returns whether the visitor
/// halted; otherwise the cursor ends just past the terminating End tag.
pub fn walk_compound<V: Visit>(cur: &mut ByteCursor, visitor: &mut V) -> Result<bool, NbtError> {
    loop {
        let tag = Tag::try_from(cur.u8()?)?;
        if tag == Tag::End {
            return Ok(false);
        }
        let name_len = cur.u16()? as usize;
        let name = std::str::from_utf8(cur.take(name_len)?)?;
        match visitor.entry(tag, name) {
            Step::Halt => return Ok(true),
            Step::Skip => skip_payload(cur, tag)?,
            Step::Enter | Step::Consume => {
                if consume_payload(cur, tag, name, visitor)? {
                    return Ok(true);
                }
            }
        }
    }
}

/// Walk a list payload (element tag, count, then unnamed elements). Entered
/// scalar elements are handed to the visitor; compound and list elements are
/// walked recursively. A list of End has zero-width elements.
pub fn walk_list<V: Visit>(
    cur: &mut ByteCursor,
    name: &str,
    visitor: &mut V,
) -> Result<bool, NbtError> {
    let element = Tag::try_from(cur.u8()?)?;
    let len = read_len(cur)?;
    visitor.list_begin(name, element, len);
    if element != Tag::End {
        for _ in 0..len {
            if consume_payload(cur, element, "", visitor)? {
                return Ok(true);
            }
        }
    }
    visitor.list_end();
    Ok(false)
}

fn consume_payload<V: Visit>(
    cur: &mut ByteCursor,
    tag: Tag,
    name: &str,
    visitor: &mut V,
) -> Result<bool, NbtError> {
    match tag {
        Tag::End => {}
        Tag::Byte => visitor.scalar(name, Scalar::Byte(cur.i8()?)),
        Tag::Short => visitor.scalar(name, Scalar::Short(cur.i16()?)),
        Tag::Int => visitor.scalar(name, Scalar::Int(cur.i32()?)),
        Tag::Long => visitor.scalar(name, Scalar::Long(cur.i64()?)),
        Tag::Float => visitor.scalar(name, Scalar::Float(cur.f32()?)),
        Tag::Double => visitor.scalar(name, Scalar::Double(cur.f64()?)),
        Tag::String => {
            let len = cur.u16()? as usize;
            visitor.scalar(name, Scalar::String(std::str::from_utf8(cur.take(len)?)?));
        }
        Tag::ByteArray => {
            let len = read_len(cur)?;
            visitor.scalar(name, Scalar::ByteArray(cur.take(len)?));
        }
        Tag::IntArray => {
            let len = read_len(cur)?;
            let mut values = Vec::with_capacity(len);
            for _ in 0..len {
                values.push(cur.i32()?);
            }
            visitor.scalar(name, Scalar::IntArray(values));
        }
        Tag::LongArray => {
            let len = read_len(cur)?;
            let mut values = Vec::with_capacity(len);
            for _ in 0..len {
                values.push(cur.i64()?);
            }
            visitor.scalar(name, Scalar::LongArray(values));
        }
        Tag::Compound => {
            visitor.compound_begin(name);
            if walk_compound(cur, visitor)? {
                return Ok(true);
            }
            visitor.compound_end();
        }
        Tag::List => return walk_list(cur, name, visitor),
    }
    Ok(false)
}

/// Advance past one payload of the given tag without visiting anything.
pub fn skip_payload(cur: &mut ByteCursor, tag: Tag) -> Result<(), NbtError> {
    if let Some(width) = tag.payload_width() {
        cur.skip(width)?;
        return Ok(());
    }
    match tag {
        Tag::End => {}
        Tag::String => {
            let len = cur.u16()? as usize;
            cur.skip(len)?;
        }
        Tag::ByteArray => {
            let len = read_len(cur)?;
            cur.skip(len)?;
        }
        Tag::IntArray => {
            let len = read_len(cur)?;
            cur.skip(len * 4)?;
        }
        Tag::LongArray => {
            let len = read_len(cur)?;
            cur.skip(len * 8)?;
        }
        Tag::Compound => skip_compound(cur)?,
        Tag::List => skip_list(cur)?,
        _ => unreachable!("fixed-width tags handled above"),
    }
    Ok(())
}

fn skip_compound(cur: &mut ByteCursor) -> Result<(), NbtError> {
    loop {
        let tag = Tag::try_from(cur.u8()?)?;
        if tag == Tag::End {
            return Ok(());
        }
        let name_len = cur.u16()? as usize;
        cur.skip(name_len)?;
        skip_payload(cur, tag)?;
    }
}

fn skip_list(cur: &mut ByteCursor) -> Result<(), NbtError> {
    let element = Tag::try_from(cur.u8()?)?;
    let len = read_len(cur)?;
    // Fixed-width elements skip in a single jump.
    if let Some(width) = element.payload_width() {
        cur.skip(width * len)?;
        return Ok(());
    }
    if element != Tag::End {
        for _ in 0..len {
            skip_payload(cur, element)?;
        }
    }
    Ok(())
}
