//! Edit gating and atomicity
//!
//! Every mutating operation funnels through [`guarded_edit`]: it checks
//! the protection state, snapshots the document, applies the mutation,
//! and validates the result. On any failure the snapshot is restored, so
//! the caller observes either the full mutation or an unchanged document.

use crate::{EditError, Result};
use doc_model::integrity;
use doc_model::protection::EditCategory;
use doc_model::{Document, ProtectionState};

/// What kind of edit is being gated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Body, table, note, or formatting mutation
    Structural,
    /// Adding or removing comments
    Comment,
}

/// How the edit treats an existing signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditOptions {
    /// Drop the signature and proceed instead of failing with
    /// `DocumentSealed`
    pub invalidate_signature: bool,
}

impl EditOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate_signature(mut self, value: bool) -> Self {
        self.invalidate_signature = value;
        self
    }
}

fn check_gate(doc: &Document, kind: EditKind, options: EditOptions) -> Result<()> {
    if doc.is_sealed() && !options.invalidate_signature {
        return Err(EditError::DocumentSealed);
    }
    match doc.protection_state() {
        ProtectionState::Unprotected | ProtectionState::Signed => Ok(()),
        ProtectionState::PasswordProtected => Err(EditError::EditingRestricted(
            "document is password protected".to_string(),
        )),
        ProtectionState::RestrictedEditing => {
            let restrictions = doc.protection.restrictions();
            let allowed = match kind {
                EditKind::Structural => restrictions
                    .map(|r| r.allows_body_editing())
                    .unwrap_or(false),
                EditKind::Comment => restrictions
                    .map(|r| r.allows(EditCategory::Comments))
                    .unwrap_or(false),
            };
            if allowed {
                Ok(())
            } else {
                Err(EditError::EditingRestricted(
                    "edit is not permitted by the active restrictions".to_string(),
                ))
            }
        }
    }
}

/// Run a mutation atomically. The document is snapshotted first; if the
/// mutation errors or leaves an integrity violation, the snapshot is
/// restored and the error surfaced.
pub fn guarded_edit<T>(
    doc: &mut Document,
    kind: EditKind,
    options: EditOptions,
    mutation: impl FnOnce(&mut Document) -> Result<T>,
) -> Result<T> {
    check_gate(doc, kind, options)?;

    let snapshot = doc.clone();

    if doc.is_sealed() {
        doc.invalidate_signature();
    }

    match mutation(doc) {
        Ok(value) => {
            let report = integrity::validate(doc);
            if report.is_valid() {
                doc.touch();
                Ok(value)
            } else {
                tracing::warn!(%report, "mutation left integrity violations, rolling back");
                *doc = snapshot;
                Err(EditError::IntegrityViolation(report.to_string()))
            }
        }
        Err(err) => {
            tracing::debug!(error = %err, "mutation failed, restoring snapshot");
            *doc = snapshot;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{Block, NoteKind, Run, Template};

    #[test]
    fn test_failed_mutation_rolls_back() {
        let mut doc = Document::from_template(Template::Blank);
        doc.push_block(Block::paragraph("original"));
        let before = doc.clone();

        let result: Result<()> = guarded_edit(
            &mut doc,
            EditKind::Structural,
            EditOptions::new(),
            |doc| {
                doc.push_block(Block::paragraph("partial"));
                Err(EditError::InvalidParameter("boom".to_string()))
            },
        );
        assert!(result.is_err());
        assert_eq!(doc, before);
    }

    #[test]
    fn test_integrity_violation_rolls_back() {
        let mut doc = Document::from_template(Template::Blank);
        let before = doc.clone();

        let result: Result<()> = guarded_edit(
            &mut doc,
            EditKind::Structural,
            EditOptions::new(),
            |doc| {
                // Dangling marker with no registry entry
                let mut para = doc_model::Paragraph::with_text("text");
                para.push_run(Run::NoteRef {
                    kind: NoteKind::Footnote,
                    id: 42,
                });
                doc.push_block(Block::Paragraph(para));
                Ok(())
            },
        );
        assert!(matches!(result, Err(EditError::IntegrityViolation(_))));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_sealed_document_rejects_without_flag() {
        let mut doc = Document::from_template(Template::Blank);
        doc.sign("Signer", "ab:cd").unwrap();

        let result = guarded_edit(
            &mut doc,
            EditKind::Structural,
            EditOptions::new(),
            |doc| {
                doc.push_block(Block::paragraph("new"));
                Ok(())
            },
        );
        assert!(matches!(result, Err(EditError::DocumentSealed)));
        assert!(doc.is_sealed());
    }

    #[test]
    fn test_sealed_document_edits_with_flag() {
        let mut doc = Document::from_template(Template::Blank);
        doc.protection.protect("pw", None).unwrap();
        doc.sign("Signer", "ab:cd").unwrap();

        guarded_edit(
            &mut doc,
            EditKind::Structural,
            EditOptions::new().invalidate_signature(true),
            |doc| {
                doc.push_block(Block::paragraph("new"));
                Ok(())
            },
        )
        .unwrap();

        assert!(!doc.is_sealed());
        assert_eq!(doc.protection_state(), ProtectionState::PasswordProtected);
    }

    #[test]
    fn test_password_protection_blocks_structural_edit() {
        let mut doc = Document::from_template(Template::Blank);
        doc.protection.protect("pw", None).unwrap();

        let result = guarded_edit(
            &mut doc,
            EditKind::Structural,
            EditOptions::new(),
            |doc| {
                doc.push_block(Block::paragraph("new"));
                Ok(())
            },
        );
        assert!(matches!(result, Err(EditError::EditingRestricted(_))));
    }

    #[test]
    fn test_comments_allowed_under_comment_restriction() {
        let mut doc = Document::from_template(Template::Blank);
        doc.protection
            .protect("pw", Some(doc_model::protection::RestrictionSet::comments_only()))
            .unwrap();

        assert!(check_gate(&doc, EditKind::Comment, EditOptions::new()).is_ok());
        assert!(check_gate(&doc, EditKind::Structural, EditOptions::new()).is_err());
    }
}
