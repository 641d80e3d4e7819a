//! Container packaging
//!
//! A document file is a zip archive of structured parts: the header,
//! the JSON document part, a relationship table, and one part per media
//! resource. Parts the engine does not understand are carried over
//! byte for byte, so an edit that does not touch them leaves them
//! intact. Writing is deterministic: fixed part order, fixed
//! timestamps, ordered JSON.

use crate::format::{parts, FileHeader};
use crate::{checksum, deserialize, serialize, Result, StoreError};
use doc_model::Document;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Parts preserved across load/save without interpretation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarryOver {
    /// Part name to raw bytes, in canonical (sorted) order
    parts: BTreeMap<String, Vec<u8>>,
}

impl CarryOver {
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(Vec::as_slice)
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.parts.insert(name.into(), bytes);
    }
}

/// A document loaded from a container, with everything needed to write
/// it back faithfully
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub document: Document,
    pub carry_over: CarryOver,
}

// -----------------------------------------------------------------------------
// Relationship table
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "Relationships")]
struct RelationshipsXml {
    #[serde(rename = "Relationship", default)]
    entries: Vec<RelationshipXml>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RelationshipXml {
    #[serde(rename = "@Id")]
    id: String,
    #[serde(rename = "@Type")]
    content_type: String,
    #[serde(rename = "@Target")]
    target: String,
}

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

fn build_rels(doc: &Document) -> Result<String> {
    let mut rels = RelationshipsXml {
        entries: vec![RelationshipXml {
            id: "document".to_string(),
            content_type: "application/json".to_string(),
            target: parts::DOCUMENT.to_string(),
        }],
    };
    for media in doc.media.iter() {
        rels.entries.push(RelationshipXml {
            id: media.rel_id.clone(),
            content_type: media.content_type.clone(),
            target: format!("{}{}", parts::MEDIA_DIR, media.rel_id),
        });
    }
    let body = quick_xml::se::to_string(&rels)
        .map_err(|e| StoreError::CorruptContainer(e.to_string()))?;
    Ok(format!("{XML_DECL}{body}"))
}

fn parse_rels(xml: &str) -> Result<RelationshipsXml> {
    quick_xml::de::from_str(xml).map_err(|e| {
        StoreError::CorruptContainer(format!("bad relationship table: {e}"))
    })
}

// -----------------------------------------------------------------------------
// Save
// -----------------------------------------------------------------------------

/// Serialize a document and its carried-over parts into container bytes
pub fn save_container(doc: &Document, carry_over: &CarryOver) -> Result<Vec<u8>> {
    let document_json = serialize(doc)?;
    let header = FileHeader::new(checksum(document_json.as_bytes()));
    let header_json = serde_json::to_string_pretty(&header)?;
    let rels_xml = build_rels(doc)?;

    let mut buffer = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut buffer);

    // Fixed timestamp so identical content yields identical bytes
    let text = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());
    let binary = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .last_modified_time(zip::DateTime::default());

    zip.start_file(parts::HEADER, text)?;
    zip.write_all(header_json.as_bytes())?;
    zip.start_file(parts::DOCUMENT, text)?;
    zip.write_all(document_json.as_bytes())?;
    zip.start_file(parts::RELS, text)?;
    zip.write_all(rels_xml.as_bytes())?;

    // Media in id order (the store iterates its ordered map)
    for media in doc.media.iter() {
        zip.start_file(format!("{}{}", parts::MEDIA_DIR, media.rel_id), binary)?;
        zip.write_all(&media.data)?;
    }

    // Unknown parts, byte for byte, in canonical order
    for (name, bytes) in &carry_over.parts {
        zip.start_file(name.clone(), binary)?;
        zip.write_all(bytes)?;
    }

    zip.finish()?;
    Ok(buffer.into_inner())
}

// -----------------------------------------------------------------------------
// Load
// -----------------------------------------------------------------------------

/// Parse container bytes. Fails with `CorruptContainer` when the header
/// is unrecognized, the checksum mismatches, or the relationship table
/// references a part that is not present. No partial document is ever
/// returned.
pub fn load_container(bytes: &[u8]) -> Result<LoadedDocument> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut all_parts: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        all_parts.insert(file.name().to_string(), contents);
    }

    let header_bytes = all_parts.remove(parts::HEADER).ok_or_else(|| {
        StoreError::CorruptContainer("missing header part".to_string())
    })?;
    let header: FileHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| StoreError::CorruptContainer(format!("bad header: {e}")))?;
    if !header.is_valid() {
        return Err(StoreError::CorruptContainer(format!(
            "unrecognized format (magic '{}', version {})",
            header.magic, header.version
        )));
    }

    let document_bytes = all_parts.remove(parts::DOCUMENT).ok_or_else(|| {
        StoreError::CorruptContainer("missing document part".to_string())
    })?;
    if checksum(&document_bytes) != header.checksum {
        return Err(StoreError::CorruptContainer(
            "document checksum mismatch".to_string(),
        ));
    }
    let document_json = String::from_utf8(document_bytes)
        .map_err(|e| StoreError::CorruptContainer(format!("document part: {e}")))?;
    let mut document = deserialize(&document_json)
        .map_err(|e| StoreError::CorruptContainer(format!("document part: {e}")))?;

    let rels_bytes = all_parts.remove(parts::RELS).ok_or_else(|| {
        StoreError::CorruptContainer("missing relationship table".to_string())
    })?;
    let rels_xml = String::from_utf8(rels_bytes)
        .map_err(|e| StoreError::CorruptContainer(format!("relationship table: {e}")))?;
    let rels = parse_rels(&rels_xml)?;

    // Every relationship target must resolve to a part
    for entry in &rels.entries {
        if entry.target == parts::DOCUMENT {
            continue;
        }
        if !all_parts.contains_key(&entry.target) {
            return Err(StoreError::CorruptContainer(format!(
                "relationship '{}' references missing part '{}'",
                entry.id, entry.target
            )));
        }
    }

    // Attach media bytes from their parts
    let media_ids: Vec<String> = document.media.iter().map(|m| m.rel_id.clone()).collect();
    for rel_id in media_ids {
        let part_name = format!("{}{}", parts::MEDIA_DIR, rel_id);
        let Some(data) = all_parts.remove(&part_name) else {
            return Err(StoreError::CorruptContainer(format!(
                "media relationship '{rel_id}' has no part"
            )));
        };
        if let Some(media) = document.media.get_mut(&rel_id) {
            media.data = data;
        }
    }

    let carry_over = CarryOver { parts: all_parts };
    Ok(LoadedDocument {
        document,
        carry_over,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{Block, Paragraph, Run, Template};

    fn sample_doc() -> Document {
        let mut doc = Document::from_template(Template::Blank);
        doc.push_block(Block::paragraph("container body"));
        doc
    }

    #[test]
    fn test_save_load_roundtrip() {
        let doc = sample_doc();
        let bytes = save_container(&doc, &CarryOver::default()).unwrap();
        let loaded = load_container(&bytes).unwrap();
        assert_eq!(loaded.document, doc);
        assert!(loaded.carry_over.is_empty());
    }

    #[test]
    fn test_unmodified_save_is_byte_identical() {
        let doc = sample_doc();
        let first = save_container(&doc, &CarryOver::default()).unwrap();
        let loaded = load_container(&first).unwrap();
        let second = save_container(&loaded.document, &loaded.carry_over).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_media_parts_roundtrip() {
        let mut doc = sample_doc();
        let rel_id = doc.media.add("image/png", vec![0x89, 0x50, 0x4e, 0x47]);
        let mut para = Paragraph::new();
        para.push_run(Run::Picture {
            rel_id: rel_id.clone(),
        });
        doc.push_block(Block::Paragraph(para));

        let bytes = save_container(&doc, &CarryOver::default()).unwrap();
        let loaded = load_container(&bytes).unwrap();
        let media = loaded.document.media.get(&rel_id).unwrap();
        assert_eq!(media.data, vec![0x89, 0x50, 0x4e, 0x47]);
        assert_eq!(media.content_type, "image/png");
    }

    #[test]
    fn test_unknown_parts_carried_over() {
        let doc = sample_doc();
        let mut carry = CarryOver::default();
        carry.insert("custom/annotations.bin", vec![1, 2, 3, 4]);

        let bytes = save_container(&doc, &carry).unwrap();
        let loaded = load_container(&bytes).unwrap();
        assert_eq!(
            loaded.carry_over.get("custom/annotations.bin"),
            Some([1u8, 2, 3, 4].as_slice())
        );

        // And written back byte for byte
        let again = save_container(&loaded.document, &loaded.carry_over).unwrap();
        assert_eq!(bytes, again);
    }

    #[test]
    fn test_not_a_zip_rejected() {
        let err = load_container(b"plainly not a zip archive").unwrap_err();
        assert!(matches!(err, StoreError::CorruptContainer(_)));
    }

    #[test]
    fn test_missing_rels_target_rejected() {
        // Build a container whose rels table references a media part,
        // then strip the part
        let mut doc = sample_doc();
        doc.media.add("image/png", vec![1, 2, 3]);
        let bytes = save_container(&doc, &CarryOver::default()).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut rebuilt = Cursor::new(Vec::new());
        let mut writer = ZipWriter::new(&mut rebuilt);
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).unwrap();
            if file.name().starts_with(parts::MEDIA_DIR) {
                continue;
            }
            let mut contents = Vec::new();
            file.read_to_end(&mut contents).unwrap();
            let name = file.name().to_string();
            writer
                .start_file(name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(&contents).unwrap();
        }
        writer.finish().unwrap();

        let err = load_container(&rebuilt.into_inner()).unwrap_err();
        assert!(matches!(err, StoreError::CorruptContainer(_)));
    }

    #[test]
    fn test_tampered_document_rejected() {
        let doc = sample_doc();
        let bytes = save_container(&doc, &CarryOver::default()).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut rebuilt = Cursor::new(Vec::new());
        let mut writer = ZipWriter::new(&mut rebuilt);
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).unwrap();
            let mut contents = Vec::new();
            file.read_to_end(&mut contents).unwrap();
            if file.name() == parts::DOCUMENT {
                contents.extend_from_slice(b" ");
            }
            let name = file.name().to_string();
            writer
                .start_file(name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(&contents).unwrap();
        }
        writer.finish().unwrap();

        let err = load_container(&rebuilt.into_inner()).unwrap_err();
        assert!(matches!(err, StoreError::CorruptContainer(_)));
    }
}
