use mcvox_nbt::{walk_compound, walk_document, Scalar, Step, Tag, Visit};
use mcvox_util::{chunk_to_block, ByteCursor};

use super::AnvilError;

/// One block name out of a section's local palette. Block state properties
/// are irrelevant to the id mapping and are skipped at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteEntry {
    pub name: String,
}

/// Decoded `block_states` of one chunk section: the local palette and the
/// bit-packed index words. `data` stays empty when the palette is unary.
#[derive(Debug, Clone, Default)]
pub struct Section {
    pub y: i8,
    pub palette: Vec<PaletteEntry>,
    pub data: Vec<i64>,
}

impl Section {
    pub fn y_offset(&self) -> i32 {
        chunk_to_block(self.y as i32)
    }
}

/// A parsed chunk: its global coordinates and its sections in file order
/// (the file does not sort them by y).
#[derive(Debug, Clone)]
pub struct Chunk {
    pub chunk_x: i32,
    pub chunk_z: i32,
    pub sections: Vec<Section>,
}

/// Stops the walk at the first list named `sections`, wherever it nests;
/// compounds are descended, everything else is skipped by length.
struct FindSections;

impl Visit for FindSections {
    fn entry(&mut self, tag: Tag, name: &str) -> Step {
        match (tag, name) {
            (Tag::List, "sections") => Step::Halt,
            (Tag::Compound, _) => Step::Enter,
            _ => Step::Skip,
        }
    }
}

/// Collects `Y`, `block_states.data` and `block_states.palette[].Name` from
/// one section compound; every other entry is skipped by length.
#[derive(Default)]
struct SectionVisitor {
    section: Section,
}

impl Visit for SectionVisitor {
    fn entry(&mut self, tag: Tag, name: &str) -> Step {
        match (tag, name) {
            (Tag::Byte, "Y") => Step::Consume,
            (Tag::Compound, "block_states") => Step::Enter,
            (Tag::LongArray, "data") => Step::Consume,
            (Tag::List, "palette") => Step::Enter,
            (Tag::String, "Name") => Step::Consume,
            _ => Step::Skip,
        }
    }

    fn scalar(&mut self, name: &str, value: Scalar<'_>) {
        match (name, value) {
            ("Y", Scalar::Byte(y)) => self.section.y = y,
            ("data", Scalar::LongArray(words)) => self.section.data = words,
            ("Name", Scalar::String(block)) => self.section.palette.push(PaletteEntry {
                name: block.to_owned(),
            }),
            _ => {}
        }
    }
}

impl Chunk {
    /// Parse the decompressed NBT document of one chunk. A document without
    /// a `sections` list yields a chunk with no sections (protochunks look
    /// like this); the caller decides whether that is worth keeping.
    pub fn parse(data: &[u8], chunk_x: i32, chunk_z: i32) -> Result<Chunk, AnvilError> {
        let mut sections = Vec::new();
        let mut cur = ByteCursor::new(data);
        if walk_document(&mut cur, &mut FindSections)? {
            // Halted at the list payload: element tag, count, elements.
            let element = Tag::try_from(cur.u8()?)?;
            let count = cur.i32()?.max(0);
            match element {
                Tag::Compound => {
                    sections.reserve(count as usize);
                    for _ in 0..count {
                        let mut visitor = SectionVisitor::default();
                        walk_compound(&mut cur, &mut visitor)?;
                        sections.push(visitor.section);
                    }
                }
                Tag::End => {}
                other => return Err(AnvilError::SectionsNotCompounds(other)),
            }
        }
        Ok(Chunk {
            chunk_x,
            chunk_z,
            sections,
        })
    }

    pub fn x_offset(&self) -> i32 {
        chunk_to_block(self.chunk_x)
    }

    pub fn z_offset(&self) -> i32 {
        chunk_to_block(self.chunk_z)
    }

    /// The section holding block y coordinates `[section_y * 16, ..+16)`,
    /// if the file had one.
    pub fn section_at(&self, section_y: i8) -> Option<&Section> {
        self.sections.iter().find(|section| section.y == section_y)
    }
}
