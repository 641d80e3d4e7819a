//! Document integrity validation and repair
//!
//! The validator is a pure function over a document: it reports every
//! violated cross-reference invariant and never mutates. Repair is a
//! separate, explicitly-invoked transform that applies a deterministic
//! correction policy; running it twice in sequence yields no further
//! report violations and no further tree changes on the second pass.

use crate::{Block, BlockId, Document, NoteEntry, NoteKind, Run, TableCell};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A single violated invariant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntegrityIssue {
    /// A marker run references a nonexistent registry entry
    DanglingMarker { kind: NoteKind, id: u32 },
    /// More than one marker run carries the same note id
    DuplicateMarker { kind: NoteKind, id: u32 },
    /// A registry entry has no matching marker in the body
    OrphanedEntry { kind: NoteKind, id: u32 },
    /// More than one registry entry carries the same id
    DuplicateEntryId { kind: NoteKind, id: u32 },
    /// A comment range start has no matching end after it
    UnpairedCommentStart { id: u32 },
    /// A comment range end has no matching start before it
    UnpairedCommentEnd { id: u32 },
    /// A comment's end marker precedes its start marker
    UnorderedCommentRange { id: u32 },
    /// A comment exists in the store but has no markers in the body
    OrphanedComment { id: u32 },
    /// Comment markers reference an id missing from the store
    DanglingCommentMarker { id: u32 },
    /// A picture run references a relationship id missing from the table
    MissingRelationship { rel_id: String },
    /// A table's rows span differing numbers of grid columns
    RaggedTable { block_id: BlockId },
}

impl IntegrityIssue {
    /// Severity of this issue
    pub fn severity(&self) -> IssueSeverity {
        match self {
            IntegrityIssue::DanglingMarker { .. } => IssueSeverity::Error,
            IntegrityIssue::DuplicateMarker { .. } => IssueSeverity::Error,
            IntegrityIssue::OrphanedEntry { .. } => IssueSeverity::Warning,
            IntegrityIssue::DuplicateEntryId { .. } => IssueSeverity::Critical,
            IntegrityIssue::UnpairedCommentStart { .. } => IssueSeverity::Error,
            IntegrityIssue::UnpairedCommentEnd { .. } => IssueSeverity::Error,
            IntegrityIssue::UnorderedCommentRange { .. } => IssueSeverity::Error,
            IntegrityIssue::OrphanedComment { .. } => IssueSeverity::Warning,
            IntegrityIssue::DanglingCommentMarker { .. } => IssueSeverity::Error,
            IntegrityIssue::MissingRelationship { .. } => IssueSeverity::Error,
            IntegrityIssue::RaggedTable { .. } => IssueSeverity::Warning,
        }
    }
}

/// Severity levels for integrity issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueSeverity {
    Warning,
    Error,
    Critical,
}

/// Result of validating a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<IntegrityIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.issues.is_empty() {
            return write!(f, "no violations");
        }
        write!(f, "{} violation(s): ", self.issues.len())?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{issue:?}")?;
        }
        Ok(())
    }
}

/// How repair handles a dangling note marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairMode {
    /// Remove the marker run
    #[default]
    RemoveDangling,
    /// Synthesize an empty entry under the marker's id
    CreatePlaceholder,
}

/// One correction applied by repair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RepairAction {
    ReassignedDuplicate { kind: NoteKind, old_id: u32, new_id: u32 },
    RemovedDanglingMarker { kind: NoteKind, id: u32 },
    RemovedDuplicateMarker { kind: NoteKind, id: u32 },
    CreatedPlaceholderEntry { kind: NoteKind, id: u32 },
    RemovedOrphanedEntry { kind: NoteKind, id: u32 },
    RemovedCommentMarkers { id: u32 },
    RemovedComment { id: u32 },
    RemovedPictureRun { rel_id: String },
    PaddedTable { block_id: BlockId },
}

/// Summary of a repair pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepairSummary {
    pub actions: Vec<RepairAction>,
}

impl RepairSummary {
    pub fn is_clean(&self) -> bool {
        self.actions.is_empty()
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Validate a document against the cross-reference invariants.
/// Pure: never mutates.
pub fn validate(doc: &Document) -> ValidationReport {
    let mut issues = Vec::new();

    for kind in [NoteKind::Footnote, NoteKind::Endnote] {
        check_notes(doc, kind, &mut issues);
    }
    check_comments(doc, &mut issues);
    check_relationships(doc, &mut issues);
    check_tables(doc, &mut issues);

    ValidationReport { issues }
}

fn note_marker_ids(doc: &Document, kind: NoteKind) -> Vec<u32> {
    doc.markers_in_order()
        .into_iter()
        .filter_map(|(_, _, run)| match run {
            Run::NoteRef { kind: k, id } if k == kind => Some(id),
            _ => None,
        })
        .collect()
}

fn check_notes(doc: &Document, kind: NoteKind, issues: &mut Vec<IntegrityIssue>) {
    let entries = doc.notes.entries(kind);
    let markers = note_marker_ids(doc, kind);

    // Duplicate entry ids
    let mut seen = BTreeSet::new();
    let mut reported = BTreeSet::new();
    for entry in entries {
        if !seen.insert(entry.id) && reported.insert(entry.id) {
            issues.push(IntegrityIssue::DuplicateEntryId { kind, id: entry.id });
        }
    }

    // Marker multiplicity: pairing is one-to-one by id
    let mut marker_counts: BTreeMap<u32, usize> = BTreeMap::new();
    for id in &markers {
        *marker_counts.entry(*id).or_default() += 1;
    }
    for (id, count) in &marker_counts {
        if *count > 1 {
            issues.push(IntegrityIssue::DuplicateMarker { kind, id: *id });
        }
    }

    let entry_ids: BTreeSet<u32> = entries.iter().map(|e| e.id).collect();
    let marker_ids: BTreeSet<u32> = markers.iter().copied().collect();

    // Dangling markers: marker with no entry of that id
    for id in marker_ids.difference(&entry_ids) {
        issues.push(IntegrityIssue::DanglingMarker { kind, id: *id });
    }

    // Orphaned entries: entry with no marker of that id
    for id in entry_ids.difference(&marker_ids) {
        issues.push(IntegrityIssue::OrphanedEntry { kind, id: *id });
    }
}

fn check_comments(doc: &Document, issues: &mut Vec<IntegrityIssue>) {
    // Marker ordinals per comment id, in document order
    let mut starts: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    let mut ends: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (ordinal, (_, _, run)) in doc.markers_in_order().into_iter().enumerate() {
        match run {
            Run::CommentStart { id } => starts.entry(id).or_default().push(ordinal),
            Run::CommentEnd { id } => ends.entry(id).or_default().push(ordinal),
            _ => {}
        }
    }

    let marker_ids: BTreeSet<u32> = starts.keys().chain(ends.keys()).copied().collect();
    for id in &marker_ids {
        if !doc.comments.contains(*id) {
            issues.push(IntegrityIssue::DanglingCommentMarker { id: *id });
            continue;
        }
        let s = starts.get(id).map(|v| v.as_slice()).unwrap_or(&[]);
        let e = ends.get(id).map(|v| v.as_slice()).unwrap_or(&[]);
        match (s.first(), e.first()) {
            (Some(_), None) => issues.push(IntegrityIssue::UnpairedCommentStart { id: *id }),
            (None, Some(_)) => issues.push(IntegrityIssue::UnpairedCommentEnd { id: *id }),
            (Some(&start), Some(_)) => {
                // Ordered when some end follows the first start
                if !e.iter().any(|&end| end > start) {
                    issues.push(IntegrityIssue::UnorderedCommentRange { id: *id });
                } else if s.len() > 1 {
                    issues.push(IntegrityIssue::UnpairedCommentStart { id: *id });
                } else if e.len() > 1 {
                    issues.push(IntegrityIssue::UnpairedCommentEnd { id: *id });
                }
            }
            (None, None) => {}
        }
    }

    for comment in doc.comments.all() {
        if !marker_ids.contains(&comment.id) {
            issues.push(IntegrityIssue::OrphanedComment { id: comment.id });
        }
    }
}

fn check_relationships(doc: &Document, issues: &mut Vec<IntegrityIssue>) {
    let mut reported = BTreeSet::new();
    for id in doc.ordered_paragraphs() {
        let Some(Block::Paragraph(para)) = doc.block(id) else {
            continue;
        };
        for run in &para.runs {
            if let Run::Picture { rel_id } = run {
                if !doc.media.contains(rel_id) && reported.insert(rel_id.clone()) {
                    issues.push(IntegrityIssue::MissingRelationship {
                        rel_id: rel_id.clone(),
                    });
                }
            }
        }
    }
}

fn check_tables(doc: &Document, issues: &mut Vec<IntegrityIssue>) {
    for id in doc.ordered_blocks() {
        if let Some(Block::Table(table)) = doc.block(id) {
            if !table.rows.is_empty() && !table.is_rectangular() {
                issues.push(IntegrityIssue::RaggedTable { block_id: id });
            }
        }
    }
}

// =============================================================================
// Repair
// =============================================================================

/// Apply the deterministic correction policy for every violation the
/// validator reports. Idempotent: a second pass is a no-op.
pub fn repair(doc: &mut Document, mode: RepairMode) -> RepairSummary {
    let mut actions = Vec::new();

    for kind in [NoteKind::Footnote, NoteKind::Endnote] {
        repair_duplicate_ids(doc, kind, &mut actions);
        repair_note_pairing(doc, kind, mode, &mut actions);
    }
    repair_comments(doc, &mut actions);
    repair_relationships(doc, &mut actions);
    repair_tables(doc, &mut actions);

    // Monotonicity survives repair: raise counters above every live id
    for kind in [NoteKind::Footnote, NoteKind::Endnote] {
        if let Some(max) = doc.notes.entries(kind).iter().map(|e| e.id).max() {
            doc.notes.reserve_at_least(kind, max + 1);
        }
    }

    RepairSummary { actions }
}

/// Marker locations (paragraph id, run index) for one note kind, in
/// document order
fn note_marker_locations(doc: &Document, kind: NoteKind) -> Vec<(BlockId, usize, u32)> {
    doc.markers_in_order()
        .into_iter()
        .filter_map(|(para, idx, run)| match run {
            Run::NoteRef { kind: k, id } if k == kind => Some((para, idx, id)),
            _ => None,
        })
        .collect()
}

/// Keep the first document-order occurrence of a duplicated id; reassign
/// later entries the next free id and re-bind their markers pairwise.
fn repair_duplicate_ids(doc: &mut Document, kind: NoteKind, actions: &mut Vec<RepairAction>) {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for entry in doc.notes.entries(kind) {
        *counts.entry(entry.id).or_default() += 1;
    }
    let duplicated: Vec<u32> = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(id, _)| id)
        .collect();

    for old_id in duplicated {
        let markers = note_marker_locations(doc, kind);
        let marker_occurrences: Vec<(BlockId, usize)> = markers
            .into_iter()
            .filter(|(_, _, id)| *id == old_id)
            .map(|(p, i, _)| (p, i))
            .collect();
        let entry_occurrences: Vec<usize> = doc
            .notes
            .entries(kind)
            .iter()
            .enumerate()
            .filter(|(_, e)| e.id == old_id)
            .map(|(i, _)| i)
            .collect();

        for (occurrence, &entry_index) in entry_occurrences.iter().enumerate().skip(1) {
            let new_id = doc.notes.allocate_id(kind);
            doc.notes.entries_mut(kind)[entry_index].id = new_id;
            if let Some(&(para_id, run_idx)) = marker_occurrences.get(occurrence) {
                if let Some(Block::Paragraph(para)) =
                    doc.block_mut(para_id)
                {
                    para.runs[run_idx] = Run::NoteRef { kind, id: new_id };
                }
            }
            actions.push(RepairAction::ReassignedDuplicate {
                kind,
                old_id,
                new_id,
            });
        }
    }
}

fn repair_note_pairing(
    doc: &mut Document,
    kind: NoteKind,
    mode: RepairMode,
    actions: &mut Vec<RepairAction>,
) {
    let mut entry_ids: BTreeSet<u32> = doc.notes.entries(kind).iter().map(|e| e.id).collect();
    let markers = note_marker_locations(doc, kind);

    // Dangling and duplicate markers, one document-order walk. A
    // placeholder is synthesized at most once per id; every marker past
    // the first for an id is removed so pairing stays one-to-one.
    let mut removals: BTreeMap<BlockId, Vec<usize>> = BTreeMap::new();
    let mut kept: BTreeSet<u32> = BTreeSet::new();
    for (para_id, run_idx, id) in &markers {
        if !entry_ids.contains(id) {
            match mode {
                RepairMode::RemoveDangling => {
                    removals.entry(*para_id).or_default().push(*run_idx);
                    actions.push(RepairAction::RemovedDanglingMarker { kind, id: *id });
                    continue;
                }
                RepairMode::CreatePlaceholder => {
                    doc.notes
                        .insert_loaded(kind, NoteEntry::new(*id, Vec::new()));
                    entry_ids.insert(*id);
                    actions.push(RepairAction::CreatedPlaceholderEntry { kind, id: *id });
                }
            }
        }
        if !kept.insert(*id) {
            removals.entry(*para_id).or_default().push(*run_idx);
            actions.push(RepairAction::RemovedDuplicateMarker { kind, id: *id });
        }
    }
    remove_runs(doc, removals);

    // Orphaned entries
    let marker_ids: BTreeSet<u32> = note_marker_locations(doc, kind)
        .into_iter()
        .map(|(_, _, id)| id)
        .collect();
    let orphaned: Vec<u32> = doc
        .notes
        .entries(kind)
        .iter()
        .map(|e| e.id)
        .filter(|id| !marker_ids.contains(id))
        .collect();
    for id in orphaned {
        doc.notes.remove_entry(kind, id);
        actions.push(RepairAction::RemovedOrphanedEntry { kind, id });
    }
}

fn repair_comments(doc: &mut Document, actions: &mut Vec<RepairAction>) {
    // Locate every comment marker with a global ordinal
    let markers = doc.markers_in_order();
    let mut by_id: BTreeMap<u32, Vec<(usize, BlockId, usize, bool)>> = BTreeMap::new();
    for (ordinal, (para, idx, run)) in markers.into_iter().enumerate() {
        match run {
            Run::CommentStart { id } => by_id.entry(id).or_default().push((ordinal, para, idx, true)),
            Run::CommentEnd { id } => by_id.entry(id).or_default().push((ordinal, para, idx, false)),
            _ => {}
        }
    }

    let mut removals: BTreeMap<BlockId, Vec<usize>> = BTreeMap::new();
    let marker_ids: BTreeSet<u32> = by_id.keys().copied().collect();

    for (id, occurrences) in &by_id {
        if !doc.comments.contains(*id) {
            for (_, para, idx, _) in occurrences {
                removals.entry(*para).or_default().push(*idx);
            }
            actions.push(RepairAction::RemovedCommentMarkers { id: *id });
            continue;
        }
        // First start, then the first end after it, form the surviving pair
        let first_start = occurrences.iter().find(|(_, _, _, is_start)| *is_start);
        let matching_end = first_start.and_then(|(s, _, _, _)| {
            occurrences
                .iter()
                .find(|(o, _, _, is_start)| !is_start && o > s)
        });
        match (first_start, matching_end) {
            (Some(start), Some(end)) => {
                let keep = [start.0, end.0];
                let mut extra = false;
                for (ordinal, para, idx, _) in occurrences {
                    if !keep.contains(ordinal) {
                        removals.entry(*para).or_default().push(*idx);
                        extra = true;
                    }
                }
                if extra {
                    actions.push(RepairAction::RemovedCommentMarkers { id: *id });
                }
            }
            _ => {
                // No ordered pair survives: drop the markers and the comment
                for (_, para, idx, _) in occurrences {
                    removals.entry(*para).or_default().push(*idx);
                }
                doc.comments.remove(*id);
                actions.push(RepairAction::RemovedComment { id: *id });
            }
        }
    }
    remove_runs(doc, removals);

    let orphaned: Vec<u32> = doc
        .comments
        .all()
        .iter()
        .map(|c| c.id)
        .filter(|id| !marker_ids.contains(id))
        .collect();
    for id in orphaned {
        doc.comments.remove(id);
        actions.push(RepairAction::RemovedComment { id });
    }
}

fn repair_relationships(doc: &mut Document, actions: &mut Vec<RepairAction>) {
    let mut removals: BTreeMap<BlockId, Vec<usize>> = BTreeMap::new();
    let mut reported = BTreeSet::new();
    for id in doc.ordered_paragraphs() {
        let Some(Block::Paragraph(para)) = doc.block(id) else {
            continue;
        };
        for (idx, run) in para.runs.iter().enumerate() {
            if let Run::Picture { rel_id } = run {
                if !doc.media.contains(rel_id) {
                    removals.entry(id).or_default().push(idx);
                    if reported.insert(rel_id.clone()) {
                        actions.push(RepairAction::RemovedPictureRun {
                            rel_id: rel_id.clone(),
                        });
                    }
                }
            }
        }
    }
    remove_runs(doc, removals);
}

fn repair_tables(doc: &mut Document, actions: &mut Vec<RepairAction>) {
    for id in doc.ordered_blocks() {
        let Some(Block::Table(table)) = doc.block_mut(id) else {
            continue;
        };
        if table.rows.is_empty() || table.is_rectangular() {
            continue;
        }
        let width = table
            .rows
            .iter()
            .map(|r| r.grid_width())
            .max()
            .unwrap_or(0);
        for row in &mut table.rows {
            while row.grid_width() < width {
                row.cells.push(TableCell::new());
            }
        }
        actions.push(RepairAction::PaddedTable { block_id: id });
    }
}

/// Remove runs by (paragraph, run index), highest index first so earlier
/// indices stay valid
fn remove_runs(doc: &mut Document, removals: BTreeMap<BlockId, Vec<usize>>) {
    for (para_id, mut indices) in removals {
        indices.sort_unstable();
        indices.dedup();
        if let Some(Block::Paragraph(para)) = doc.block_mut(para_id) {
            for idx in indices.into_iter().rev() {
                if idx < para.runs.len() {
                    para.runs.remove(idx);
                }
            }
        }
    }
}
