//! Store - Container persistence, file I/O, and conversion adapters
//!
//! This crate owns the on-disk container format: a zip archive of a
//! header, the JSON document part, a relationship table, media parts,
//! and byte-for-byte carry-over of parts the engine does not interpret.
//! It also provides locked, atomic file I/O and the external PDF and
//! upload collaborator seams.

mod convert;
mod error;
mod file_io;
mod format;
mod package;
mod serializer;
mod settings;

pub use convert::*;
pub use error::*;
pub use file_io::*;
pub use format::*;
pub use package::*;
pub use serializer::*;
pub use settings::*;
