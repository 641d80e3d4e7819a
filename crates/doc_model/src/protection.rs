//! Document protection and signing
//!
//! Protection wraps the whole document and is orthogonal to content edits.
//! States: unprotected, password protected, restricted editing, signed.
//! A signature seals the document against structural edits until it is
//! explicitly invalidated, at which point the prior protection state is
//! restored.

use crate::{DocModelError, Result};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use uuid::Uuid;

/// Externally visible protection state of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionState {
    Unprotected,
    PasswordProtected,
    RestrictedEditing,
    Signed,
}

/// Permitted-edit category under restricted editing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditCategory {
    /// Adding comments
    Comments,
    /// Filling form fields
    Forms,
    /// Edits recorded as tracked changes
    TrackedChanges,
}

/// Set of permitted-edit categories. An empty set means read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestrictionSet {
    permitted: Vec<EditCategory>,
}

impl RestrictionSet {
    /// Read-only: nothing is permitted
    pub fn read_only() -> Self {
        Self::default()
    }

    pub fn comments_only() -> Self {
        Self {
            permitted: vec![EditCategory::Comments],
        }
    }

    pub fn forms_only() -> Self {
        Self {
            permitted: vec![EditCategory::Forms],
        }
    }

    pub fn with(mut self, category: EditCategory) -> Self {
        if !self.permitted.contains(&category) {
            self.permitted.push(category);
        }
        self
    }

    pub fn allows(&self, category: EditCategory) -> bool {
        self.permitted.contains(&category)
    }

    /// Structural body edits are never permitted under restricted editing
    pub fn allows_body_editing(&self) -> bool {
        self.allows(EditCategory::TrackedChanges)
    }
}

/// Hash algorithm for the password verifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::Sha256
    }
}

/// Salted, iterated password verifier. Only the salt and final hash are
/// stored; the password itself never is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordVerifier {
    pub algorithm: HashAlgorithm,
    /// Base64-encoded random salt
    pub salt: String,
    /// Base64-encoded iterated hash
    pub hash: String,
    /// Number of hash iterations
    pub spin_count: u32,
}

const DEFAULT_SPIN_COUNT: u32 = 100_000;

impl PasswordVerifier {
    /// Derive a verifier from a password with a fresh random salt
    pub fn derive(password: &str) -> Self {
        let salt: Vec<u8> = Uuid::new_v4().as_bytes().to_vec();
        let algorithm = HashAlgorithm::default();
        let hash = iterated_hash(algorithm, &salt, password, DEFAULT_SPIN_COUNT);
        let b64 = base64::engine::general_purpose::STANDARD;
        Self {
            algorithm,
            salt: b64.encode(salt),
            hash: b64.encode(hash),
            spin_count: DEFAULT_SPIN_COUNT,
        }
    }

    /// Check a candidate password against the stored salt and hash
    pub fn verify(&self, password: &str) -> bool {
        let b64 = base64::engine::general_purpose::STANDARD;
        let Ok(salt) = b64.decode(&self.salt) else {
            return false;
        };
        let candidate = iterated_hash(self.algorithm, &salt, password, self.spin_count);
        b64.encode(candidate) == self.hash
    }
}

fn iterated_hash(algorithm: HashAlgorithm, salt: &[u8], password: &str, spins: u32) -> Vec<u8> {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(salt);
            hasher.update(password.as_bytes());
            let mut digest = hasher.finalize_reset().to_vec();
            for _ in 0..spins {
                hasher.update(&digest);
                digest = hasher.finalize_reset().to_vec();
            }
            digest
        }
        HashAlgorithm::Sha512 => {
            let mut hasher = Sha512::new();
            hasher.update(salt);
            hasher.update(password.as_bytes());
            let mut digest = hasher.finalize_reset().to_vec();
            for _ in 0..spins {
                hasher.update(&digest);
                digest = hasher.finalize_reset().to_vec();
            }
            digest
        }
    }
}

/// Certificate-backed signature over the serialized content hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub signer: String,
    pub certificate_fingerprint: String,
    /// Hex SHA-256 of the canonical serialized content at signing time
    pub content_hash: String,
    pub signed_at: DateTime<Utc>,
    /// Protection state to restore when the signature is invalidated
    pub prior_state: PriorProtection,
}

/// Snapshot of the protection configuration that signing replaced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorProtection {
    pub state: ProtectionState,
    pub verifier: Option<PasswordVerifier>,
    pub restrictions: Option<RestrictionSet>,
}

/// Document-level protection configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentProtection {
    verifier: Option<PasswordVerifier>,
    restrictions: Option<RestrictionSet>,
}

impl DocumentProtection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, ignoring any signature (the document tracks that)
    pub fn state(&self) -> ProtectionState {
        match (&self.verifier, &self.restrictions) {
            (None, None) => ProtectionState::Unprotected,
            (_, Some(_)) => ProtectionState::RestrictedEditing,
            (Some(_), None) => ProtectionState::PasswordProtected,
        }
    }

    pub fn is_protected(&self) -> bool {
        self.state() != ProtectionState::Unprotected
    }

    pub fn restrictions(&self) -> Option<&RestrictionSet> {
        self.restrictions.as_ref()
    }

    /// Apply protection. Fails if the document is already protected.
    pub fn protect(&mut self, password: &str, restrictions: Option<RestrictionSet>) -> Result<()> {
        if self.is_protected() {
            return Err(DocModelError::InvalidOperation(
                "document is already protected".to_string(),
            ));
        }
        self.verifier = Some(PasswordVerifier::derive(password));
        self.restrictions = restrictions;
        Ok(())
    }

    /// Remove protection after verifying the password
    pub fn unprotect(&mut self, password: &str) -> Result<()> {
        let Some(verifier) = &self.verifier else {
            return Err(DocModelError::InvalidOperation(
                "document is not protected".to_string(),
            ));
        };
        if !verifier.verify(password) {
            return Err(DocModelError::InvalidPassword);
        }
        self.verifier = None;
        self.restrictions = None;
        Ok(())
    }

    /// Snapshot for signing
    pub fn to_prior(&self) -> PriorProtection {
        PriorProtection {
            state: self.state(),
            verifier: self.verifier.clone(),
            restrictions: self.restrictions.clone(),
        }
    }

    /// Restore a snapshot after signature invalidation
    pub fn restore(&mut self, prior: PriorProtection) {
        self.verifier = prior.verifier;
        self.restrictions = prior.restrictions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_roundtrip() {
        let v = PasswordVerifier::derive("s3cret");
        assert!(v.verify("s3cret"));
        assert!(!v.verify("wrong"));
        assert!(!v.verify(""));
    }

    #[test]
    fn test_verifier_salts_differ() {
        let a = PasswordVerifier::derive("same");
        let b = PasswordVerifier::derive("same");
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_protect_unprotect_cycle() {
        let mut prot = DocumentProtection::new();
        assert_eq!(prot.state(), ProtectionState::Unprotected);

        prot.protect("p1", None).unwrap();
        assert_eq!(prot.state(), ProtectionState::PasswordProtected);

        let err = prot.unprotect("wrong").unwrap_err();
        assert!(matches!(err, DocModelError::InvalidPassword));
        assert!(prot.is_protected());

        prot.unprotect("p1").unwrap();
        assert_eq!(prot.state(), ProtectionState::Unprotected);
    }

    #[test]
    fn test_double_protect_rejected() {
        let mut prot = DocumentProtection::new();
        prot.protect("a", None).unwrap();
        assert!(prot.protect("b", None).is_err());
    }

    #[test]
    fn test_restricted_editing_state() {
        let mut prot = DocumentProtection::new();
        prot.protect("pw", Some(RestrictionSet::comments_only()))
            .unwrap();
        assert_eq!(prot.state(), ProtectionState::RestrictedEditing);
        let r = prot.restrictions().unwrap();
        assert!(r.allows(EditCategory::Comments));
        assert!(!r.allows(EditCategory::Forms));
        assert!(!r.allows_body_editing());
    }

    #[test]
    fn test_prior_snapshot_restore() {
        let mut prot = DocumentProtection::new();
        prot.protect("pw", Some(RestrictionSet::forms_only()))
            .unwrap();
        let prior = prot.to_prior();

        let mut fresh = DocumentProtection::new();
        fresh.restore(prior);
        assert_eq!(fresh.state(), ProtectionState::RestrictedEditing);
        fresh.unprotect("pw").unwrap();
    }
}
