//! Document serialization
//!
//! The document part is pretty-printed JSON. Every map in the model is
//! ordered, so serializing an unmodified document is deterministic and
//! the container round-trips byte for byte.

use crate::Result;
use doc_model::Document;
use sha2::{Digest, Sha256};

/// Serialize a document to its JSON part
pub fn serialize(doc: &Document) -> Result<String> {
    Ok(serde_json::to_string_pretty(doc)?)
}

/// Deserialize a document from its JSON part
pub fn deserialize(json: &str) -> Result<Document> {
    Ok(serde_json::from_str(json)?)
}

/// Hex SHA-256 of a serialized part, stored in the header
pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{Block, Template};

    #[test]
    fn test_serialize_roundtrip() {
        let mut doc = Document::from_template(Template::Blank);
        doc.push_block(Block::paragraph("persisted"));

        let json = serialize(&doc).unwrap();
        let back = deserialize(&json).unwrap();
        assert_eq!(doc, back);
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let mut doc = Document::from_template(Template::Blank);
        doc.push_block(Block::paragraph("stable"));
        doc.styles.insert(
            "B".to_string(),
            doc_model::NamedStyle::new(doc_model::RunStyle::default()),
        );
        doc.styles.insert(
            "A".to_string(),
            doc_model::NamedStyle::new(doc_model::RunStyle::default()),
        );

        assert_eq!(serialize(&doc).unwrap(), serialize(&doc).unwrap());
    }

    #[test]
    fn test_checksum_is_stable_hex() {
        let a = checksum(b"part bytes");
        let b = checksum(b"part bytes");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(deserialize("not json at all").is_err());
    }
}
