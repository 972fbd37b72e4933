mod format;
mod grid;

pub use grid::{Accessor, SparseGrid, VoxelAccessor};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("bad grid file magic {0:?}")]
    BadMagic([u8; 4]),
    #[error("invalid utf-8 in grid name")]
    InvalidName(#[from] std::string::FromUtf8Error),
    #[error("leaf occupancy {0} exceeds the 4096 voxels of a leaf")]
    BadLeafCount(u16),
}
