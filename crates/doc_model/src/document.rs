//! Document model
//!
//! The document is an arena-and-index structure: every block lives in a
//! flat owned map keyed by a stable `BlockId`, and ordering is expressed by
//! id lists (the top-level body, and each table cell's block list). All
//! cross-references (note marker to registry entry, picture to media
//! relationship, comment marker to comment) are id lookups, never embedded
//! references, so the ownership graph has no cycles.

use crate::{
    Block, BlockId, CommentStore, DocModelError, DocumentProtection, MediaStore, NamedStyle,
    NoteRegistry, Paragraph, ProtectionState, Result, Run, Signature,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Document metadata. `modified` and `revision` are the declared volatile
/// fields for round-trip purposes: they change on save without an edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentProperties {
    pub title: String,
    pub author: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub revision: u32,
}

impl Default for DocumentProperties {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            title: String::new(),
            author: String::new(),
            created: now,
            modified: now,
            revision: 1,
        }
    }
}

/// Template used when creating a fresh document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    /// An empty body
    Blank,
    /// Title paragraph followed by an empty body paragraph
    Report,
}

/// An in-memory rich document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Flat block arena
    blocks: BTreeMap<BlockId, Block>,
    /// Ordered top-level block ids
    body: Vec<BlockId>,
    pub notes: NoteRegistry,
    pub comments: CommentStore,
    pub media: MediaStore,
    pub styles: BTreeMap<String, NamedStyle>,
    pub protection: DocumentProtection,
    signature: Option<Signature>,
    pub properties: DocumentProperties,
}

impl Default for Document {
    fn default() -> Self {
        Self::from_template(Template::Blank)
    }
}

impl Document {
    /// Create a fresh document from a template
    pub fn from_template(template: Template) -> Self {
        let mut doc = Self {
            blocks: BTreeMap::new(),
            body: Vec::new(),
            notes: NoteRegistry::new(),
            comments: CommentStore::new(),
            media: MediaStore::new(),
            styles: BTreeMap::new(),
            protection: DocumentProtection::new(),
            signature: None,
            properties: DocumentProperties::default(),
        };
        match template {
            Template::Blank => {}
            Template::Report => {
                doc.push_block(Block::Paragraph(
                    Paragraph::with_text("").with_style("Title"),
                ));
                doc.push_block(Block::Paragraph(Paragraph::new()));
            }
        }
        doc
    }

    // -------------------------------------------------------------------------
    // Arena access
    // -------------------------------------------------------------------------

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(&id)
    }

    /// Store a block in the arena without attaching it anywhere
    pub fn alloc_block(&mut self, block: Block) -> BlockId {
        let id = BlockId::new();
        self.blocks.insert(id, block);
        id
    }

    /// Ordered top-level block ids
    pub fn body(&self) -> &[BlockId] {
        &self.body
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Append a block to the body
    pub fn push_block(&mut self, block: Block) -> BlockId {
        let id = self.alloc_block(block);
        self.body.push(id);
        id
    }

    /// Insert a block into the body at `index` (0..=len)
    pub fn insert_block_at(&mut self, index: usize, block: Block) -> Result<BlockId> {
        if index > self.body.len() {
            return Err(DocModelError::IndexOutOfRange {
                index,
                len: self.body.len(),
            });
        }
        let id = self.alloc_block(block);
        self.body.insert(index, id);
        Ok(id)
    }

    /// Body index of a top-level block
    pub fn body_index_of(&self, id: BlockId) -> Option<usize> {
        self.body.iter().position(|&b| b == id)
    }

    /// Remove the body block at `index`, along with every block nested in
    /// it (table cells recurse). Returns the removed blocks in document
    /// order so callers can cascade registry deletes from their markers.
    pub fn remove_block_at(&mut self, index: usize) -> Result<Vec<Block>> {
        if index >= self.body.len() {
            return Err(DocModelError::IndexOutOfRange {
                index,
                len: self.body.len(),
            });
        }
        let id = self.body.remove(index);
        let mut subtree = Vec::new();
        self.collect_subtree(id, &mut subtree);
        let mut removed = Vec::new();
        for sub_id in subtree {
            if let Some(block) = self.blocks.remove(&sub_id) {
                removed.push(block);
            }
        }
        Ok(removed)
    }

    /// Remove a block that is not referenced from the body list, e.g. a
    /// table cell child being replaced. Recurses like [`remove_block_at`]
    /// and returns the removed blocks in document order.
    ///
    /// [`remove_block_at`]: Document::remove_block_at
    pub fn remove_subtree(&mut self, id: BlockId) -> Vec<Block> {
        let mut subtree = Vec::new();
        self.collect_subtree(id, &mut subtree);
        let mut removed = Vec::new();
        for sub_id in subtree {
            if let Some(block) = self.blocks.remove(&sub_id) {
                removed.push(block);
            }
        }
        removed
    }

    fn collect_subtree(&self, id: BlockId, out: &mut Vec<BlockId>) {
        out.push(id);
        if let Some(Block::Table(table)) = self.blocks.get(&id) {
            for row in &table.rows {
                for cell in &row.cells {
                    for &child in &cell.blocks {
                        self.collect_subtree(child, out);
                    }
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Document-order traversal
    // -------------------------------------------------------------------------

    /// All block ids in document order, depth-first through table cells
    pub fn ordered_blocks(&self) -> Vec<BlockId> {
        let mut out = Vec::new();
        for &id in &self.body {
            self.collect_subtree(id, &mut out);
        }
        out
    }

    /// Paragraph ids in document order, including table cell paragraphs
    pub fn ordered_paragraphs(&self) -> Vec<BlockId> {
        self.ordered_blocks()
            .into_iter()
            .filter(|id| matches!(self.blocks.get(id), Some(Block::Paragraph(_))))
            .collect()
    }

    /// The id of the nth top-level paragraph (tables and breaks are skipped)
    pub fn paragraph_at(&self, index: usize) -> Result<BlockId> {
        let paras: Vec<BlockId> = self
            .body
            .iter()
            .copied()
            .filter(|id| matches!(self.blocks.get(id), Some(Block::Paragraph(_))))
            .collect();
        paras
            .get(index)
            .copied()
            .ok_or(DocModelError::IndexOutOfRange {
                index,
                len: paras.len(),
            })
    }

    /// All visible text in document order, one line per paragraph
    pub fn text(&self) -> String {
        let mut lines = Vec::new();
        for id in self.ordered_paragraphs() {
            if let Some(Block::Paragraph(p)) = self.blocks.get(&id) {
                lines.push(p.text());
            }
        }
        lines.join("\n")
    }

    /// Every marker run in document order: (paragraph id, run index, run)
    pub fn markers_in_order(&self) -> Vec<(BlockId, usize, Run)> {
        let mut out = Vec::new();
        for id in self.ordered_paragraphs() {
            if let Some(Block::Paragraph(p)) = self.blocks.get(&id) {
                for (i, run) in p.runs.iter().enumerate() {
                    if run.is_marker() {
                        out.push((id, i, run.clone()));
                    }
                }
            }
        }
        out
    }

    // -------------------------------------------------------------------------
    // Signing
    // -------------------------------------------------------------------------

    /// Whether structural edits are sealed off by a signature
    pub fn is_sealed(&self) -> bool {
        self.signature.is_some()
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Overall protection state, folding in the signature
    pub fn protection_state(&self) -> ProtectionState {
        if self.is_sealed() {
            ProtectionState::Signed
        } else {
            self.protection.state()
        }
    }

    /// Attach a certificate-backed signature over the current content hash.
    /// Signed is terminal with respect to structural edits.
    pub fn sign(
        &mut self,
        signer: impl Into<String>,
        certificate_fingerprint: impl Into<String>,
    ) -> Result<()> {
        if self.is_sealed() {
            return Err(DocModelError::DocumentSealed);
        }
        let prior = self.protection.to_prior();
        self.signature = Some(Signature {
            signer: signer.into(),
            certificate_fingerprint: certificate_fingerprint.into(),
            content_hash: self.content_fingerprint(),
            signed_at: Utc::now(),
            prior_state: prior,
        });
        Ok(())
    }

    /// Drop the signature and restore the protection state recorded when it
    /// was attached. Returns the dropped signature.
    pub fn invalidate_signature(&mut self) -> Option<Signature> {
        let signature = self.signature.take()?;
        self.protection.restore(signature.prior_state.clone());
        Some(signature)
    }

    /// Hex SHA-256 over the canonical serialized content. Volatile
    /// properties are excluded so an unedited reload verifies.
    pub fn content_fingerprint(&self) -> String {
        let view = (
            &self.blocks,
            &self.body,
            &self.notes,
            &self.comments,
            &self.styles,
        );
        let bytes = serde_json::to_vec(&view).unwrap_or_default();
        let digest = Sha256::digest(&bytes);
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Bump the volatile fields; called by the store on save
    pub fn touch(&mut self) {
        self.properties.modified = Utc::now();
        self.properties.revision += 1;
    }
}
