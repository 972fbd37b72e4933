mod coords;
mod cursor;
mod packed;
mod stream;

pub use coords::*;
pub use cursor::*;
pub use packed::*;
pub use stream::*;
