//! Engine settings
//!
//! Settings persist as pretty JSON next to the engine's working data.
//! Missing files yield defaults; unknown fields are ignored so older
//! builds can read newer files.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level settings container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub convert: ConvertSettings,
}

/// Where produced files go and how access is serialized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory for produced artifacts
    pub output_dir: String,
    /// Acquire a sidecar lock around load/save cycles
    pub lock_files: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            output_dir: "output".to_string(),
            lock_files: true,
        }
    }
}

/// External PDF conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertSettings {
    /// Command invoked with the container on stdin, PDF expected on
    /// stdout
    pub pdf_command: String,
    pub pdf_args: Vec<String>,
}

impl Default for ConvertSettings {
    fn default() -> Self {
        Self {
            pdf_command: "wordcraft-render".to_string(),
            pdf_args: Vec::new(),
        }
    }
}

impl EngineSettings {
    /// Load settings, falling back to defaults when the file is absent
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = EngineSettings::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, EngineSettings::default());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = EngineSettings::default();
        settings.convert.pdf_command = "soffice".to_string();
        settings.save(&path).unwrap();

        let back = EngineSettings::load(&path).unwrap();
        assert_eq!(back.convert.pdf_command, "soffice");
        assert!(back.storage.lock_files);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let json = r#"{ "storage": { "output_dir": "x", "lock_files": false }, "future": 1 }"#;
        let settings: EngineSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.storage.output_dir, "x");
        assert!(!settings.storage.lock_files);
    }
}
