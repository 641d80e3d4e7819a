//! Container format constants and header

use serde::{Deserialize, Serialize};

/// Container format version
pub const FORMAT_VERSION: u32 = 1;

/// File extension for the container format
pub const FILE_EXTENSION: &str = "wcz";

/// Well-known part names inside the container
pub mod parts {
    pub const HEADER: &str = "header.json";
    pub const DOCUMENT: &str = "document.json";
    pub const RELS: &str = "_rels/package.rels";
    pub const MEDIA_DIR: &str = "media/";
}

/// Identification header stored as the container's first part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHeader {
    /// Magic string for format identification
    pub magic: String,
    /// Format version
    pub version: u32,
    /// Hex SHA-256 of the document part, checked on load
    pub checksum: String,
}

impl FileHeader {
    pub const MAGIC: &'static str = "WORDCRAFT";

    pub fn new(checksum: impl Into<String>) -> Self {
        Self {
            magic: Self::MAGIC.to_string(),
            version: FORMAT_VERSION,
            checksum: checksum.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == Self::MAGIC && self.version <= FORMAT_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_validity() {
        let header = FileHeader::new("abc123");
        assert!(header.is_valid());

        let mut wrong_magic = header.clone();
        wrong_magic.magic = "NOTWORD".to_string();
        assert!(!wrong_magic.is_valid());

        let mut future_version = header;
        future_version.version = FORMAT_VERSION + 1;
        assert!(!future_version.is_valid());
    }
}
