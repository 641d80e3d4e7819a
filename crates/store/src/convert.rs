//! External collaborator adapters: PDF rendering and artifact upload
//!
//! Both collaborators are opaque to the engine. Rendering runs
//! out-of-process over stdin/stdout; a failure surfaces `Conversion`
//! and never corrupts or discards the original container bytes. Upload
//! happens exactly once per produced artifact, after a successful save.

use crate::{save_container, CarryOver, Result, StoreError};
use doc_model::Document;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Renders container bytes into PDF bytes
pub trait PdfRenderer {
    fn render(&self, document_bytes: &[u8]) -> Result<Vec<u8>>;
}

/// Receives a produced artifact and returns its location
pub trait StorageSink {
    fn upload(&self, file_bytes: &[u8], suffix: &str) -> Result<String>;
}

/// Renderer that pipes the container through an external command
#[derive(Debug, Clone)]
pub struct ExternalPdfRenderer {
    command: String,
    args: Vec<String>,
}

impl ExternalPdfRenderer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl PdfRenderer for ExternalPdfRenderer {
    fn render(&self, document_bytes: &[u8]) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| StoreError::Conversion(format!("{}: {e}", self.command)))?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin
                .write_all(document_bytes)
                .map_err(|e| StoreError::Conversion(e.to_string()))?;
        }
        let output = child
            .wait_with_output()
            .map_err(|e| StoreError::Conversion(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StoreError::Conversion(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

/// Sink that writes artifacts into a directory and returns the path
#[derive(Debug, Clone)]
pub struct LocalDirSink {
    dir: PathBuf,
}

impl LocalDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl StorageSink for LocalDirSink {
    fn upload(&self, file_bytes: &[u8], suffix: &str) -> Result<String> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::Upload(e.to_string()))?;
        let name = format!("artifact-{}.{suffix}", crate::checksum(file_bytes));
        let path = self.dir.join(name);
        std::fs::write(&path, file_bytes).map_err(|e| StoreError::Upload(e.to_string()))?;
        Ok(path.display().to_string())
    }
}

/// Render a document to PDF. The container bytes are produced first and
/// returned alongside the PDF, so a conversion failure costs nothing.
pub fn convert_to_pdf(
    doc: &Document,
    carry_over: &CarryOver,
    renderer: &dyn PdfRenderer,
) -> Result<(Vec<u8>, Vec<u8>)> {
    let container = save_container(doc, carry_over)?;
    let pdf = renderer.render(&container)?;
    Ok((container, pdf))
}

/// Save a document and hand the artifact to the sink exactly once
pub fn publish(
    doc: &Document,
    carry_over: &CarryOver,
    sink: &dyn StorageSink,
    suffix: &str,
) -> Result<String> {
    let bytes = save_container(doc, carry_over)?;
    let location = sink.upload(&bytes, suffix)?;
    tracing::info!(%location, "artifact uploaded");
    Ok(location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{Block, Template};

    struct FakeRenderer {
        fail: bool,
    }

    impl PdfRenderer for FakeRenderer {
        fn render(&self, document_bytes: &[u8]) -> Result<Vec<u8>> {
            if self.fail {
                Err(StoreError::Conversion("renderer crashed".to_string()))
            } else {
                let mut pdf = b"%PDF-1.7 ".to_vec();
                pdf.extend_from_slice(&document_bytes[..4]);
                Ok(pdf)
            }
        }
    }

    fn sample_doc() -> Document {
        let mut doc = Document::from_template(Template::Blank);
        doc.push_block(Block::paragraph("to render"));
        doc
    }

    #[test]
    fn test_convert_produces_both_artifacts() {
        let doc = sample_doc();
        let (container, pdf) =
            convert_to_pdf(&doc, &CarryOver::default(), &FakeRenderer { fail: false })
                .unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        assert!(!container.is_empty());
    }

    #[test]
    fn test_conversion_failure_preserves_document() {
        let doc = sample_doc();
        let before = doc.clone();
        let err = convert_to_pdf(&doc, &CarryOver::default(), &FakeRenderer { fail: true })
            .unwrap_err();
        assert!(matches!(err, StoreError::Conversion(_)));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_local_sink_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalDirSink::new(dir.path());
        let location = publish(&sample_doc(), &CarryOver::default(), &sink, "wcz").unwrap();
        assert!(std::path::Path::new(&location).exists());
        assert!(location.ends_with(".wcz"));
    }
}
