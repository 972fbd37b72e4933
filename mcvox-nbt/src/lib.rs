mod tag;
mod tree;
mod walk;

pub use tag::Tag;
pub use tree::{Nbt, NbtList};
pub use walk::{skip_payload, walk_compound, walk_document, walk_list, Scalar, Step, Visit};

use mcvox_util::CursorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NbtError {
    #[error(transparent)]
    Cursor(#[from] CursorError),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("invalid tag value {0}")]
    InvalidTagValue(u8),
    #[error("root tag is {0:?}, expected a compound")]
    RootNotCompound(Tag),
    #[error("document ended with unbalanced nesting")]
    UnbalancedDocument,
    #[error("negative length {0}")]
    NegativeLength(i32),
    #[error("invalid utf-8 in string")]
    InvalidString(#[from] std::str::Utf8Error),
    #[error("list element tag mismatch: expected {expected:?}, got {got:?}")]
    ListTagMismatch { expected: Tag, got: Tag },
    #[error("string of {0} bytes does not fit a u16 length prefix")]
    StringTooLong(usize),
}
