//! Comment model
//!
//! Comment metadata lives in a per-document store; the anchoring of a
//! comment to a text range is expressed by `CommentStart`/`CommentEnd`
//! marker runs in the body, associated by id. Start must precede end in
//! document order (checked by the integrity validator).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u32,
    pub author: String,
    /// Author initials shown in comment margins
    pub initials: String,
    pub text: String,
    pub date: DateTime<Utc>,
}

impl Comment {
    pub fn new(id: u32, author: impl Into<String>, text: impl Into<String>) -> Self {
        let author = author.into();
        let initials = author
            .split_whitespace()
            .filter_map(|w| w.chars().next())
            .collect::<String>()
            .to_uppercase();
        Self {
            id,
            author,
            initials,
            text: text.into(),
            date: Utc::now(),
        }
    }
}

/// Store of all comments in a document, with monotonic id allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentStore {
    comments: Vec<Comment>,
    next_id: u32,
}

impl Default for CommentStore {
    fn default() -> Self {
        Self {
            comments: Vec::new(),
            next_id: 1,
        }
    }
}

impl CommentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id and store a new comment
    pub fn add(&mut self, author: impl Into<String>, text: impl Into<String>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.comments.push(Comment::new(id, author, text));
        id
    }

    /// Insert a comment with an explicit id, as loaded from a container
    pub fn insert_loaded(&mut self, comment: Comment) {
        if self.next_id <= comment.id {
            self.next_id = comment.id + 1;
        }
        self.comments.push(comment);
    }

    pub fn get(&self, id: u32) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|c| c.id == id)
    }

    pub fn remove(&mut self, id: u32) -> Option<Comment> {
        let pos = self.comments.iter().position(|c| c.id == id)?;
        Some(self.comments.remove(pos))
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    /// All comments in insertion order
    pub fn all(&self) -> &[Comment] {
        &self.comments
    }

    /// Comments by a specific author
    pub fn by_author<'a>(&'a self, author: &'a str) -> impl Iterator<Item = &'a Comment> {
        self.comments.iter().filter(move |c| c.author == author)
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initials_derived_from_author() {
        let c = Comment::new(1, "Ada Lovelace", "check this");
        assert_eq!(c.initials, "AL");
    }

    #[test]
    fn test_store_ids_monotonic() {
        let mut store = CommentStore::new();
        let a = store.add("A", "first");
        store.remove(a);
        let b = store.add("B", "second");
        assert!(b > a);
    }

    #[test]
    fn test_by_author_filter() {
        let mut store = CommentStore::new();
        store.add("Alice", "one");
        store.add("Bob", "two");
        store.add("Alice", "three");
        assert_eq!(store.by_author("Alice").count(), 2);
        assert_eq!(store.by_author("Carol").count(), 0);
    }

    #[test]
    fn test_insert_loaded_raises_counter() {
        let mut store = CommentStore::new();
        store.insert_loaded(Comment::new(9, "X", "loaded"));
        assert_eq!(store.add("Y", "fresh"), 10);
    }
}
