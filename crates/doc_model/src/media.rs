//! Media relationship table
//!
//! Every picture run references a relationship id (`rId1`, `rId2`, ...)
//! that must resolve to an embedded resource here. Resource bytes are not
//! part of the serialized model; the store attaches them from container
//! parts on load and writes them back as parts on save.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named link from the document to an embedded resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRelationship {
    /// Relationship id, e.g. "rId1"
    pub rel_id: String,
    /// MIME content type, e.g. "image/png"
    pub content_type: String,
    /// Resource bytes; carried out-of-band by the container
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// Relationship table with `rId{n}` allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaStore {
    relationships: BTreeMap<String, MediaRelationship>,
    next_id: u32,
}

impl Default for MediaStore {
    fn default() -> Self {
        Self {
            relationships: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl MediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a resource and return its freshly allocated relationship id
    pub fn add(&mut self, content_type: impl Into<String>, data: Vec<u8>) -> String {
        let rel_id = format!("rId{}", self.next_id);
        self.next_id += 1;
        self.relationships.insert(
            rel_id.clone(),
            MediaRelationship {
                rel_id: rel_id.clone(),
                content_type: content_type.into(),
                data,
            },
        );
        rel_id
    }

    /// Insert a relationship with an explicit id, as loaded from a container
    pub fn insert_loaded(&mut self, rel: MediaRelationship) {
        if let Some(n) = rel
            .rel_id
            .strip_prefix("rId")
            .and_then(|s| s.parse::<u32>().ok())
        {
            if self.next_id <= n {
                self.next_id = n + 1;
            }
        }
        self.relationships.insert(rel.rel_id.clone(), rel);
    }

    pub fn get(&self, rel_id: &str) -> Option<&MediaRelationship> {
        self.relationships.get(rel_id)
    }

    pub fn get_mut(&mut self, rel_id: &str) -> Option<&mut MediaRelationship> {
        self.relationships.get_mut(rel_id)
    }

    pub fn contains(&self, rel_id: &str) -> bool {
        self.relationships.contains_key(rel_id)
    }

    pub fn remove(&mut self, rel_id: &str) -> Option<MediaRelationship> {
        self.relationships.remove(rel_id)
    }

    /// All relationships in id order
    pub fn iter(&self) -> impl Iterator<Item = &MediaRelationship> {
        self.relationships.values()
    }

    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }
}
