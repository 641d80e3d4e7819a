//! Footnote and endnote reference registry
//!
//! The registry tracks reference entries and allocates their ids. Footnote
//! and endnote ids are independent spaces; each starts at 1 and only ever
//! increases, so an id is never reused within a document's lifetime even
//! across deletions. Entries are kept in insertion order in plain vectors:
//! a damaged container can legitimately load with duplicate ids, and the
//! integrity validator must be able to observe that state before repair.

use crate::Block;
use serde::{Deserialize, Serialize};

/// Kind of note (footnote vs endnote)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// Appears at the bottom of the page containing the reference
    Footnote,
    /// Collected at the end of the document
    Endnote,
}

impl std::fmt::Display for NoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoteKind::Footnote => write!(f, "footnote"),
            NoteKind::Endnote => write!(f, "endnote"),
        }
    }
}

/// A footnote or endnote entry: id plus owned content blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEntry {
    pub id: u32,
    pub content: Vec<Block>,
}

impl NoteEntry {
    pub fn new(id: u32, content: Vec<Block>) -> Self {
        Self { id, content }
    }

    /// Entry with a single plain-text paragraph
    pub fn with_text(id: u32, text: impl Into<String>) -> Self {
        Self {
            id,
            content: vec![Block::paragraph(text)],
        }
    }

    /// Plain text of the entry content
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|b| b.visible_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Registry of footnote and endnote entries with monotonic id allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRegistry {
    footnotes: Vec<NoteEntry>,
    endnotes: Vec<NoteEntry>,
    next_footnote_id: u32,
    next_endnote_id: u32,
}

impl Default for NoteRegistry {
    fn default() -> Self {
        Self {
            footnotes: Vec::new(),
            endnotes: Vec::new(),
            next_footnote_id: 1,
            next_endnote_id: 1,
        }
    }
}

impl NoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries_vec(&self, kind: NoteKind) -> &Vec<NoteEntry> {
        match kind {
            NoteKind::Footnote => &self.footnotes,
            NoteKind::Endnote => &self.endnotes,
        }
    }

    fn entries_vec_mut(&mut self, kind: NoteKind) -> &mut Vec<NoteEntry> {
        match kind {
            NoteKind::Footnote => &mut self.footnotes,
            NoteKind::Endnote => &mut self.endnotes,
        }
    }

    /// Allocate the next unused id for `kind` and store a new entry.
    /// Ids start at 1 and always increase, even across deletions.
    pub fn add_entry(&mut self, kind: NoteKind, content: Vec<Block>) -> u32 {
        let id = self.allocate_id(kind);
        self.entries_vec_mut(kind).push(NoteEntry::new(id, content));
        id
    }

    /// Insert an entry with an explicit id, as loaded from a container.
    /// Raises the allocation counter above the id so later allocations
    /// stay monotonic. Duplicate ids are accepted here; the integrity
    /// validator reports them.
    pub fn insert_loaded(&mut self, kind: NoteKind, entry: NoteEntry) {
        self.reserve_at_least(kind, entry.id.saturating_add(1));
        self.entries_vec_mut(kind).push(entry);
    }

    /// Take the next id for `kind` without storing an entry
    pub fn allocate_id(&mut self, kind: NoteKind) -> u32 {
        let counter = match kind {
            NoteKind::Footnote => &mut self.next_footnote_id,
            NoteKind::Endnote => &mut self.next_endnote_id,
        };
        let id = *counter;
        *counter += 1;
        id
    }

    /// Ensure future allocations for `kind` start at `floor` or above
    pub fn reserve_at_least(&mut self, kind: NoteKind, floor: u32) {
        let counter = match kind {
            NoteKind::Footnote => &mut self.next_footnote_id,
            NoteKind::Endnote => &mut self.next_endnote_id,
        };
        if *counter < floor {
            *counter = floor;
        }
    }

    /// Remove the first entry with the given id. Returns the entry if found.
    pub fn remove_entry(&mut self, kind: NoteKind, id: u32) -> Option<NoteEntry> {
        let entries = self.entries_vec_mut(kind);
        let pos = entries.iter().position(|e| e.id == id)?;
        Some(entries.remove(pos))
    }

    pub fn get(&self, kind: NoteKind, id: u32) -> Option<&NoteEntry> {
        self.entries_vec(kind).iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, kind: NoteKind, id: u32) -> Option<&mut NoteEntry> {
        self.entries_vec_mut(kind).iter_mut().find(|e| e.id == id)
    }

    pub fn contains(&self, kind: NoteKind, id: u32) -> bool {
        self.get(kind, id).is_some()
    }

    /// Entries of one kind in insertion order
    pub fn entries(&self, kind: NoteKind) -> &[NoteEntry] {
        self.entries_vec(kind)
    }

    /// Mutable access to the entries of one kind (for repair)
    pub fn entries_mut(&mut self, kind: NoteKind) -> &mut Vec<NoteEntry> {
        self.entries_vec_mut(kind)
    }

    pub fn count(&self, kind: NoteKind) -> usize {
        self.entries_vec(kind).len()
    }

    pub fn is_empty(&self) -> bool {
        self.footnotes.is_empty() && self.endnotes.is_empty()
    }

    pub fn next_id(&self, kind: NoteKind) -> u32 {
        match kind {
            NoteKind::Footnote => self.next_footnote_id,
            NoteKind::Endnote => self.next_endnote_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let mut reg = NoteRegistry::new();
        let a = reg.add_entry(NoteKind::Footnote, vec![Block::paragraph("a")]);
        let b = reg.add_entry(NoteKind::Footnote, vec![Block::paragraph("b")]);
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[test]
    fn test_id_spaces_are_independent() {
        let mut reg = NoteRegistry::new();
        let f = reg.add_entry(NoteKind::Footnote, Vec::new());
        let e = reg.add_entry(NoteKind::Endnote, Vec::new());
        assert_eq!(f, 1);
        assert_eq!(e, 1);
    }

    #[test]
    fn test_ids_never_reused_after_removal() {
        let mut reg = NoteRegistry::new();
        let a = reg.add_entry(NoteKind::Footnote, Vec::new());
        reg.remove_entry(NoteKind::Footnote, a);
        let b = reg.add_entry(NoteKind::Footnote, Vec::new());
        assert!(b > a);
    }

    #[test]
    fn test_insert_loaded_raises_counter() {
        let mut reg = NoteRegistry::new();
        reg.insert_loaded(NoteKind::Endnote, NoteEntry::with_text(7, "loaded"));
        let next = reg.add_entry(NoteKind::Endnote, Vec::new());
        assert_eq!(next, 8);
    }

    #[test]
    fn test_duplicate_ids_representable() {
        let mut reg = NoteRegistry::new();
        reg.insert_loaded(NoteKind::Footnote, NoteEntry::with_text(2, "first"));
        reg.insert_loaded(NoteKind::Footnote, NoteEntry::with_text(2, "second"));
        assert_eq!(reg.count(NoteKind::Footnote), 2);
        // Lookup returns the first occurrence
        assert_eq!(reg.get(NoteKind::Footnote, 2).unwrap().text(), "first");
    }

    #[test]
    fn test_entry_text() {
        let entry = NoteEntry::with_text(1, "see appendix");
        assert_eq!(entry.text(), "see appendix");
    }
}
