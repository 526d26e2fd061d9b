//! Datastore scanning, garbage detection and removal.

mod blob_scan;
mod delete;
mod gc;
mod index_scan;
mod layout;
mod report;

pub use blob_scan::*;
pub use delete::*;
pub use gc::*;
pub use index_scan::*;
pub use layout::*;
pub use report::*;
