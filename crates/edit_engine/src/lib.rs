//! Edit Engine - Anchored structural operations over the document model
//!
//! This crate implements anchor resolution, the protection-aware edit
//! guard, and the full set of structural edit operations: content,
//! formatting, tables, find/replace, notes, comments, merging, and
//! protection. The dispatch module exposes every operation as a named
//! request with a fixed parameter schema.

mod anchor;
mod comment_ops;
mod content_ops;
mod dispatch;
mod error;
mod find_replace;
mod format_ops;
mod guard;
mod merge_ops;
mod note_ops;
mod protect_ops;
mod query;
mod table_ops;

pub use anchor::*;
pub use comment_ops::*;
pub use content_ops::*;
pub use dispatch::*;
pub use error::*;
pub use find_replace::*;
pub use format_ops::*;
pub use guard::*;
pub use merge_ops::*;
pub use note_ops::*;
pub use protect_ops::*;
pub use query::*;
pub use table_ops::*;
