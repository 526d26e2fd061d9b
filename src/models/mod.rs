//! Data models for the chunk store and its index files.

mod digest;
mod index;
mod summary;

pub use digest::*;
pub use index::*;
pub use summary::*;
