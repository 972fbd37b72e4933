mod chunk;
mod decode;
mod inflate;
mod palette;
mod region;
mod writer;

pub use chunk::{Chunk, PaletteEntry, Section};
pub use decode::{decode_chunk, decode_section};
pub use inflate::inflate;
pub use palette::GlobalPalette;
pub use region::{parse_region_filename, region_files, Region};
pub use writer::VoxelWriter;

use mcvox_nbt::{NbtError, Tag};
use mcvox_util::{CursorError, PackedError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnvilError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    CursorError(#[from] CursorError),
    #[error(transparent)]
    NbtError(#[from] NbtError),
    #[error("zlib inflate failed: {0}")]
    InflateFailed(#[from] flate2::DecompressError),
    #[error("zlib stream ended before the frame was complete")]
    InflateTruncated,
    #[error("region chunk unsupported compression \"{0}\"")]
    RegionUnsupportedCompression(String),
    #[error("region chunk unknown compression \"{0}\"")]
    RegionUnknownCompression(u8),
    #[error("global palette {path}: empty name at line {line}")]
    EmptyPaletteName { path: String, line: usize },
    #[error("block \"{0}\" is not in the global palette")]
    UnknownBlock(String),
    #[error("section palette is empty")]
    EmptyPalette,
    #[error("sections list holds {0:?} elements, expected compounds")]
    SectionsNotCompounds(Tag),
    #[error("decoded palette index {index} out of range for palette of {len}")]
    PaletteIndexOutOfRange { index: usize, len: usize },
    #[error(transparent)]
    Packed(#[from] PackedError),
}

impl AnvilError {
    /// Errors that spoil only the chunk they came from. The driver loop
    /// catches these, logs, and moves to the next slot; everything else
    /// (configuration and logic errors) propagates out.
    pub fn is_chunk_local(&self) -> bool {
        matches!(
            self,
            AnvilError::IoError(..)
                | AnvilError::NbtError(..)
                | AnvilError::InflateFailed(..)
                | AnvilError::InflateTruncated
                | AnvilError::RegionUnsupportedCompression(..)
                | AnvilError::RegionUnknownCompression(..)
                | AnvilError::SectionsNotCompounds(..)
        )
    }
}
