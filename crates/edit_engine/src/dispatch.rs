//! Operation dispatch boundary
//!
//! Every structural edit operation is exposed as a named request with a
//! fixed, serde-checked parameter schema. Dispatch is a total function
//! from (document, request) to (document, result): malformed parameters
//! fail typed deserialization before the tree is touched, and each
//! operation validates its own inputs before mutating.

use crate::{
    add_comment, add_heading, add_note_at_paragraph, add_note_near_text, add_page_break,
    add_paragraph, add_table, add_table_of_contents, convert_footnotes_to_endnotes,
    create_custom_style, delete_block, delete_comment, delete_note, delete_range, document_info,
    document_text, extract_comments, extract_comments_by_author,
    extract_comments_for_paragraph, find_text, format_cell, format_text, insert_heading_near,
    insert_list_near, insert_paragraph_near, insert_table_near, invalidate_signature,
    merge_cells, merge_document, note_text, outline, protect, protection_info,
    repair_document, replace_between_anchors, search_replace, set_cell_text,
    set_paragraph_style, set_properties, sign, unprotect, update_note, validate_document,
    verify_signature, Anchor, CellPatch, EditOptions, FormatPatch, InsertPosition,
    MarkerPlacement, MatchOptions, Result,
};
use doc_model::integrity::RepairMode;
use doc_model::protection::RestrictionSet;
use doc_model::{Block, Document, NoteKind, RunStyle};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A single named operation with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ToolRequest {
    AddParagraph {
        text: String,
        #[serde(default)]
        style: Option<String>,
    },
    AddHeading {
        text: String,
        level: u32,
    },
    AddPageBreak,
    AddTableOfContents {
        #[serde(default = "default_toc_levels")]
        levels: u32,
        #[serde(default)]
        title: Option<String>,
    },
    InsertParagraphNear {
        anchor: Anchor,
        #[serde(default)]
        position: InsertPosition,
        text: String,
        #[serde(default)]
        style: Option<String>,
    },
    InsertHeadingNear {
        anchor: Anchor,
        #[serde(default)]
        position: InsertPosition,
        text: String,
        level: u32,
    },
    InsertListNear {
        anchor: Anchor,
        #[serde(default)]
        position: InsertPosition,
        items: Vec<String>,
        #[serde(default)]
        ordered: bool,
    },
    DeleteBlock {
        index: usize,
    },
    DeleteRange {
        start: Anchor,
        end: Anchor,
    },
    ReplaceBetweenAnchors {
        start: Anchor,
        end: Anchor,
        /// Replacement paragraphs, one per entry
        replacement: Vec<String>,
    },
    AddTable {
        rows: usize,
        cols: usize,
        #[serde(default)]
        style: Option<String>,
    },
    InsertTableNear {
        anchor: Anchor,
        #[serde(default)]
        position: InsertPosition,
        rows: usize,
        cols: usize,
    },
    SetCellText {
        table: usize,
        row: usize,
        col: usize,
        text: String,
    },
    FormatCell {
        table: usize,
        row: usize,
        col: usize,
        patch: CellPatch,
    },
    MergeCells {
        table: usize,
        row: usize,
        start_col: usize,
        count: usize,
    },
    FormatText {
        anchor: Anchor,
        patch: FormatPatch,
    },
    SetParagraphStyle {
        anchor: Anchor,
        #[serde(default)]
        style: Option<String>,
    },
    CreateCustomStyle {
        name: String,
        #[serde(default)]
        base: Option<String>,
        #[serde(default)]
        font: RunStyle,
    },
    FindText {
        pattern: String,
        #[serde(default)]
        options: MatchOptions,
        /// Treat the pattern as a regular expression
        #[serde(default)]
        regex: bool,
    },
    SearchReplace {
        pattern: String,
        replacement: String,
        #[serde(default)]
        options: MatchOptions,
        #[serde(default)]
        regex: bool,
    },
    AddNoteAtParagraph {
        kind: NoteKind,
        paragraph: usize,
        text: String,
    },
    AddNoteNearText {
        kind: NoteKind,
        anchor: Anchor,
        #[serde(default)]
        placement: MarkerPlacement,
        text: String,
    },
    UpdateNote {
        kind: NoteKind,
        id: u32,
        text: String,
    },
    DeleteNote {
        kind: NoteKind,
        id: u32,
    },
    GetNote {
        kind: NoteKind,
        id: u32,
    },
    ConvertFootnotesToEndnotes,
    ValidateDocument,
    RepairDocument {
        #[serde(default)]
        mode: RepairMode,
    },
    AddComment {
        anchor: Anchor,
        author: String,
        text: String,
    },
    DeleteComment {
        id: u32,
    },
    ExtractComments {
        #[serde(default)]
        author: Option<String>,
        #[serde(default)]
        paragraph: Option<usize>,
    },
    MergeDocument {
        source: Box<Document>,
        #[serde(default)]
        page_break_between: bool,
    },
    GetText,
    GetOutline,
    GetInfo,
    SetProperties {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        author: Option<String>,
    },
    Protect {
        password: String,
        #[serde(default)]
        restrictions: Option<RestrictionSet>,
    },
    Unprotect {
        password: String,
    },
    Sign {
        signer: String,
        certificate_fingerprint: String,
    },
    InvalidateSignature,
    VerifySignature,
    GetProtectionInfo,
}

fn default_toc_levels() -> u32 {
    3
}

/// The wire name of a request's operation, for logging
fn operation_name(request: &ToolRequest) -> &'static str {
    match request {
        ToolRequest::AddParagraph { .. } => "add_paragraph",
        ToolRequest::AddHeading { .. } => "add_heading",
        ToolRequest::AddPageBreak => "add_page_break",
        ToolRequest::AddTableOfContents { .. } => "add_table_of_contents",
        ToolRequest::InsertParagraphNear { .. } => "insert_paragraph_near",
        ToolRequest::InsertHeadingNear { .. } => "insert_heading_near",
        ToolRequest::InsertListNear { .. } => "insert_list_near",
        ToolRequest::DeleteBlock { .. } => "delete_block",
        ToolRequest::DeleteRange { .. } => "delete_range",
        ToolRequest::ReplaceBetweenAnchors { .. } => "replace_between_anchors",
        ToolRequest::AddTable { .. } => "add_table",
        ToolRequest::InsertTableNear { .. } => "insert_table_near",
        ToolRequest::SetCellText { .. } => "set_cell_text",
        ToolRequest::FormatCell { .. } => "format_cell",
        ToolRequest::MergeCells { .. } => "merge_cells",
        ToolRequest::FormatText { .. } => "format_text",
        ToolRequest::SetParagraphStyle { .. } => "set_paragraph_style",
        ToolRequest::CreateCustomStyle { .. } => "create_custom_style",
        ToolRequest::FindText { .. } => "find_text",
        ToolRequest::SearchReplace { .. } => "search_replace",
        ToolRequest::AddNoteAtParagraph { .. } => "add_note_at_paragraph",
        ToolRequest::AddNoteNearText { .. } => "add_note_near_text",
        ToolRequest::UpdateNote { .. } => "update_note",
        ToolRequest::DeleteNote { .. } => "delete_note",
        ToolRequest::GetNote { .. } => "get_note",
        ToolRequest::ConvertFootnotesToEndnotes => "convert_footnotes_to_endnotes",
        ToolRequest::ValidateDocument => "validate_document",
        ToolRequest::RepairDocument { .. } => "repair_document",
        ToolRequest::AddComment { .. } => "add_comment",
        ToolRequest::DeleteComment { .. } => "delete_comment",
        ToolRequest::ExtractComments { .. } => "extract_comments",
        ToolRequest::MergeDocument { .. } => "merge_document",
        ToolRequest::GetText => "get_text",
        ToolRequest::GetOutline => "get_outline",
        ToolRequest::GetInfo => "get_info",
        ToolRequest::SetProperties { .. } => "set_properties",
        ToolRequest::Protect { .. } => "protect",
        ToolRequest::Unprotect { .. } => "unprotect",
        ToolRequest::Sign { .. } => "sign",
        ToolRequest::InvalidateSignature => "invalidate_signature",
        ToolRequest::VerifySignature => "verify_signature",
        ToolRequest::GetProtectionInfo => "get_protection_info",
    }
}

/// A request envelope: the operation plus cross-cutting flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(flatten)]
    pub request: ToolRequest,
    /// Allow the edit on a signed document by dropping the signature
    #[serde(default)]
    pub invalidate_signature: bool,
}

impl From<ToolRequest> for Envelope {
    fn from(request: ToolRequest) -> Self {
        Self {
            request,
            invalidate_signature: false,
        }
    }
}

/// Execute one request against a document. Returns a JSON result payload
/// describing the outcome; errors leave the document unchanged.
pub fn dispatch(doc: &mut Document, envelope: Envelope) -> Result<Value> {
    tracing::debug!(request = operation_name(&envelope.request), "dispatching operation");
    let options = EditOptions::new().invalidate_signature(envelope.invalidate_signature);
    match envelope.request {
        ToolRequest::AddParagraph { text, style } => {
            let id = add_paragraph(doc, &text, style.as_deref(), options)?;
            Ok(json!({ "block_id": id }))
        }
        ToolRequest::AddHeading { text, level } => {
            let id = add_heading(doc, &text, level, options)?;
            Ok(json!({ "block_id": id }))
        }
        ToolRequest::AddPageBreak => {
            let id = add_page_break(doc, options)?;
            Ok(json!({ "block_id": id }))
        }
        ToolRequest::AddTableOfContents { levels, title } => {
            let id = add_table_of_contents(doc, levels, title.as_deref(), options)?;
            Ok(json!({ "block_id": id }))
        }
        ToolRequest::InsertParagraphNear {
            anchor,
            position,
            text,
            style,
        } => {
            let id =
                insert_paragraph_near(doc, &anchor, position, &text, style.as_deref(), options)?;
            Ok(json!({ "block_id": id }))
        }
        ToolRequest::InsertHeadingNear {
            anchor,
            position,
            text,
            level,
        } => {
            let id = insert_heading_near(doc, &anchor, position, &text, level, options)?;
            Ok(json!({ "block_id": id }))
        }
        ToolRequest::InsertListNear {
            anchor,
            position,
            items,
            ordered,
        } => {
            let ids = insert_list_near(doc, &anchor, position, &items, ordered, options)?;
            Ok(json!({ "block_ids": ids }))
        }
        ToolRequest::DeleteBlock { index } => {
            delete_block(doc, index, options)?;
            Ok(json!({ "deleted": index }))
        }
        ToolRequest::DeleteRange { start, end } => {
            delete_range(doc, &start, &end, options)?;
            Ok(json!({ "ok": true }))
        }
        ToolRequest::ReplaceBetweenAnchors {
            start,
            end,
            replacement,
        } => {
            let blocks: Vec<Block> = replacement
                .iter()
                .map(|text| Block::paragraph(text.as_str()))
                .collect();
            let ids = replace_between_anchors(doc, &start, &end, blocks, options)?;
            Ok(json!({ "block_ids": ids }))
        }
        ToolRequest::AddTable { rows, cols, style } => {
            let id = add_table(doc, rows, cols, style.as_deref(), options)?;
            Ok(json!({ "block_id": id }))
        }
        ToolRequest::InsertTableNear {
            anchor,
            position,
            rows,
            cols,
        } => {
            let id = insert_table_near(doc, &anchor, position, rows, cols, options)?;
            Ok(json!({ "block_id": id }))
        }
        ToolRequest::SetCellText {
            table,
            row,
            col,
            text,
        } => {
            set_cell_text(doc, table, row, col, &text, options)?;
            Ok(json!({ "ok": true }))
        }
        ToolRequest::FormatCell {
            table,
            row,
            col,
            patch,
        } => {
            format_cell(doc, table, row, col, &patch, options)?;
            Ok(json!({ "ok": true }))
        }
        ToolRequest::MergeCells {
            table,
            row,
            start_col,
            count,
        } => {
            merge_cells(doc, table, row, start_col, count, options)?;
            Ok(json!({ "ok": true }))
        }
        ToolRequest::FormatText { anchor, patch } => {
            format_text(doc, &anchor, &patch, options)?;
            Ok(json!({ "ok": true }))
        }
        ToolRequest::SetParagraphStyle { anchor, style } => {
            set_paragraph_style(doc, &anchor, style.as_deref(), options)?;
            Ok(json!({ "ok": true }))
        }
        ToolRequest::CreateCustomStyle { name, base, font } => {
            create_custom_style(doc, &name, base.as_deref(), font, options)?;
            Ok(json!({ "style": name }))
        }
        ToolRequest::FindText {
            pattern,
            options,
            regex,
        } => {
            let matches = if regex {
                crate::find_regex(doc, &pattern)?
            } else {
                find_text(doc, &pattern, &options)?
            };
            Ok(json!({ "matches": matches }))
        }
        ToolRequest::SearchReplace {
            pattern,
            replacement,
            options: match_options,
            regex,
        } => {
            let summary = if regex {
                crate::replace_regex(doc, &pattern, &replacement, options)?
            } else {
                search_replace(doc, &pattern, &replacement, &match_options, options)?
            };
            Ok(json!({
                "replacements": summary.replacements,
                "paragraphs": summary.paragraphs,
            }))
        }
        ToolRequest::AddNoteAtParagraph {
            kind,
            paragraph,
            text,
        } => {
            let id = add_note_at_paragraph(doc, kind, paragraph, &text, options)?;
            Ok(json!({ "note_id": id }))
        }
        ToolRequest::AddNoteNearText {
            kind,
            anchor,
            placement,
            text,
        } => {
            let id = add_note_near_text(doc, kind, &anchor, placement, &text, options)?;
            Ok(json!({ "note_id": id }))
        }
        ToolRequest::UpdateNote { kind, id, text } => {
            update_note(doc, kind, id, &text, options)?;
            Ok(json!({ "ok": true }))
        }
        ToolRequest::DeleteNote { kind, id } => {
            delete_note(doc, kind, id, options)?;
            Ok(json!({ "ok": true }))
        }
        ToolRequest::GetNote { kind, id } => {
            let text = note_text(doc, kind, id)?;
            Ok(json!({ "text": text }))
        }
        ToolRequest::ConvertFootnotesToEndnotes => {
            let converted = convert_footnotes_to_endnotes(doc, options)?;
            Ok(json!({ "converted": converted }))
        }
        ToolRequest::ValidateDocument => {
            let report = validate_document(doc);
            Ok(json!({
                "valid": report.is_valid(),
                "issues": report.issues,
            }))
        }
        ToolRequest::RepairDocument { mode } => {
            let summary = repair_document(doc, mode, options)?;
            Ok(json!({ "actions": summary.actions }))
        }
        ToolRequest::AddComment {
            anchor,
            author,
            text,
        } => {
            let id = add_comment(doc, &anchor, &author, &text, options)?;
            Ok(json!({ "comment_id": id }))
        }
        ToolRequest::DeleteComment { id } => {
            delete_comment(doc, id, options)?;
            Ok(json!({ "ok": true }))
        }
        ToolRequest::ExtractComments { author, paragraph } => {
            let comments = match (author, paragraph) {
                (Some(author), _) => extract_comments_by_author(doc, &author),
                (None, Some(paragraph)) => extract_comments_for_paragraph(doc, paragraph)?,
                (None, None) => extract_comments(doc),
            };
            Ok(json!({ "comments": comments }))
        }
        ToolRequest::MergeDocument {
            source,
            page_break_between,
        } => {
            let appended = merge_document(doc, &source, page_break_between, options)?;
            Ok(json!({ "appended_blocks": appended }))
        }
        ToolRequest::GetText => Ok(json!({ "text": document_text(doc) })),
        ToolRequest::GetOutline => Ok(json!({ "outline": outline(doc) })),
        ToolRequest::GetInfo => Ok(serde_json::to_value(document_info(doc))
            .unwrap_or_else(|_| json!({}))),
        ToolRequest::SetProperties { title, author } => {
            set_properties(doc, title.as_deref(), author.as_deref())?;
            Ok(json!({ "ok": true }))
        }
        ToolRequest::Protect {
            password,
            restrictions,
        } => {
            protect(doc, &password, restrictions)?;
            Ok(json!({ "state": doc.protection_state() }))
        }
        ToolRequest::Unprotect { password } => {
            unprotect(doc, &password)?;
            Ok(json!({ "state": doc.protection_state() }))
        }
        ToolRequest::Sign {
            signer,
            certificate_fingerprint,
        } => {
            sign(doc, &signer, &certificate_fingerprint)?;
            Ok(json!({ "state": doc.protection_state() }))
        }
        ToolRequest::InvalidateSignature => {
            let signature = invalidate_signature(doc)?;
            Ok(json!({
                "signer": signature.signer,
                "state": doc.protection_state(),
            }))
        }
        ToolRequest::VerifySignature => Ok(json!({ "valid": verify_signature(doc) })),
        ToolRequest::GetProtectionInfo => Ok(serde_json::to_value(protection_info(doc))
            .unwrap_or_else(|_| json!({}))),
    }
}
