//! Protection and signing operations
//!
//! State machine: Unprotected, PasswordProtected, RestrictedEditing,
//! Signed. Signing seals the document against structural edits; the
//! edit guard enforces that, and invalidating the signature restores
//! whatever protection was in force before signing.

use crate::{EditError, Result};
use doc_model::protection::RestrictionSet;
use doc_model::{Document, ProtectionState, Signature};
use serde::{Deserialize, Serialize};

/// Snapshot of the protection state for callers and listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectionInfo {
    pub state: ProtectionState,
    pub restrictions: Option<RestrictionSet>,
    pub signer: Option<String>,
    pub signed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Password-protect a document, optionally with an edit restriction set
pub fn protect(
    doc: &mut Document,
    password: &str,
    restrictions: Option<RestrictionSet>,
) -> Result<()> {
    if password.is_empty() {
        return Err(EditError::InvalidParameter(
            "password is empty".to_string(),
        ));
    }
    if doc.is_sealed() {
        return Err(EditError::DocumentSealed);
    }
    doc.protection.protect(password, restrictions)?;
    doc.touch();
    Ok(())
}

/// Remove protection. Fails with `InvalidPassword` on a mismatch and
/// leaves the state untouched.
pub fn unprotect(doc: &mut Document, password: &str) -> Result<()> {
    if doc.is_sealed() {
        return Err(EditError::DocumentSealed);
    }
    doc.protection.unprotect(password)?;
    doc.touch();
    Ok(())
}

/// Sign the document, sealing it against structural edits
pub fn sign(doc: &mut Document, signer: &str, certificate_fingerprint: &str) -> Result<()> {
    if signer.trim().is_empty() {
        return Err(EditError::InvalidParameter(
            "signer name is empty".to_string(),
        ));
    }
    doc.sign(signer, certificate_fingerprint)?;
    Ok(())
}

/// Drop the signature explicitly, restoring the prior protection state
pub fn invalidate_signature(doc: &mut Document) -> Result<Signature> {
    doc.invalidate_signature().ok_or_else(|| {
        EditError::InvalidParameter("document is not signed".to_string())
    })
}

/// Whether the stored content hash still matches the document
pub fn verify_signature(doc: &Document) -> bool {
    match doc.signature() {
        Some(sig) => sig.content_hash == doc.content_fingerprint(),
        None => false,
    }
}

pub fn protection_info(doc: &Document) -> ProtectionInfo {
    ProtectionInfo {
        state: doc.protection_state(),
        restrictions: doc.protection.restrictions().cloned(),
        signer: doc.signature().map(|s| s.signer.clone()),
        signed_at: doc.signature().map(|s| s.signed_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{add_paragraph, EditOptions};
    use doc_model::{Block, Template};

    #[test]
    fn test_protect_wrong_password_then_right() {
        let mut doc = Document::from_template(Template::Blank);
        protect(&mut doc, "p1", None).unwrap();
        assert_eq!(doc.protection_state(), ProtectionState::PasswordProtected);

        let err = unprotect(&mut doc, "wrong").unwrap_err();
        assert!(matches!(err, EditError::InvalidPassword));
        assert_eq!(doc.protection_state(), ProtectionState::PasswordProtected);

        unprotect(&mut doc, "p1").unwrap();
        assert_eq!(doc.protection_state(), ProtectionState::Unprotected);
    }

    #[test]
    fn test_empty_password_rejected() {
        let mut doc = Document::from_template(Template::Blank);
        assert!(protect(&mut doc, "", None).is_err());
    }

    #[test]
    fn test_signed_blocks_insert_until_flag() {
        let mut doc = Document::from_template(Template::Blank);
        doc.push_block(Block::paragraph("original"));
        sign(&mut doc, "Signer", "ab:cd:ef").unwrap();
        assert_eq!(doc.protection_state(), ProtectionState::Signed);

        let err =
            add_paragraph(&mut doc, "blocked", None, EditOptions::new()).unwrap_err();
        assert!(matches!(err, EditError::DocumentSealed));

        add_paragraph(
            &mut doc,
            "allowed",
            None,
            EditOptions::new().invalidate_signature(true),
        )
        .unwrap();
        assert_eq!(doc.protection_state(), ProtectionState::Unprotected);
        assert_eq!(doc.body_len(), 2);
    }

    #[test]
    fn test_signature_reverts_to_prior_state() {
        let mut doc = Document::from_template(Template::Blank);
        protect(&mut doc, "pw", Some(RestrictionSet::comments_only())).unwrap();
        sign(&mut doc, "Signer", "ab").unwrap();

        invalidate_signature(&mut doc).unwrap();
        assert_eq!(doc.protection_state(), ProtectionState::RestrictedEditing);
    }

    #[test]
    fn test_verify_signature_detects_tamper() {
        let mut doc = Document::from_template(Template::Blank);
        doc.push_block(Block::paragraph("sealed content"));
        sign(&mut doc, "Signer", "ab").unwrap();
        assert!(verify_signature(&doc));

        // Mutate behind the guard's back
        doc.push_block(Block::paragraph("tampered"));
        assert!(!verify_signature(&doc));
    }

    #[test]
    fn test_protect_while_sealed_rejected() {
        let mut doc = Document::from_template(Template::Blank);
        sign(&mut doc, "Signer", "ab").unwrap();
        let err = protect(&mut doc, "pw", None).unwrap_err();
        assert!(matches!(err, EditError::DocumentSealed));
    }

    #[test]
    fn test_protection_info() {
        let mut doc = Document::from_template(Template::Blank);
        sign(&mut doc, "Signer", "ab").unwrap();
        let info = protection_info(&doc);
        assert_eq!(info.state, ProtectionState::Signed);
        assert_eq!(info.signer.as_deref(), Some("Signer"));
    }
}
