use std::collections::HashMap;
use std::path::Path;

use super::AnvilError;

/// The process-wide block name <-> id table, loaded once at startup from a
/// newline-delimited file: the name on line `i` gets id `i`. Read-only after
/// load and shared by reference across every region being decoded.
///
/// Id 0 is air by convention of the palette file; it is the sparse grid
/// background and never written out.
#[derive(Debug)]
pub struct GlobalPalette {
    names: Vec<String>,
    ids: HashMap<String, u32>,
}

impl GlobalPalette {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AnvilError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, &path.to_string_lossy())
    }

    /// Empty lines are rejected: a blank entry in the block list is always a
    /// curation mistake. A later duplicate of a name overwrites its id.
    pub fn parse(text: &str, source: &str) -> Result<Self, AnvilError> {
        let mut names = Vec::new();
        let mut ids = HashMap::new();
        for (line, name) in text.lines().enumerate() {
            if name.is_empty() {
                return Err(AnvilError::EmptyPaletteName {
                    path: source.to_owned(),
                    line: line + 1,
                });
            }
            ids.insert(name.to_owned(), line as u32);
            names.push(name.to_owned());
        }
        log::debug!("global palette: {} names from {}", names.len(), source);
        Ok(Self { names, ids })
    }

    pub fn id(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    /// Name for an id handed out by this palette. An out-of-range id is a
    /// programmer error, not an input error.
    pub fn name(&self, id: u32) -> &str {
        &self.names[id as usize]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
