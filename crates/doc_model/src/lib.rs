//! Document Model - Core document tree structure and types
//!
//! This crate provides the foundational document model: an arena-and-index
//! block tree with stable IDs, the footnote/endnote reference registry,
//! comment and media stores, protection state, and integrity validation.

mod block;
mod block_id;
mod comment;
mod document;
mod error;
pub mod integrity;
mod media;
mod note;
mod paragraph;
pub mod protection;
mod run;
mod style;
pub mod table;

pub use block::*;
pub use block_id::*;
pub use comment::*;
pub use document::*;
pub use error::*;
pub use integrity::*;
pub use media::*;
pub use note::*;
pub use paragraph::*;
pub use protection::*;
pub use run::*;
pub use style::*;
pub use table::*;
