//! PDF text extraction
//!
//! Conversion goes through the `DocumentConverter` trait so the extraction
//! engine can be swapped (or stubbed in tests). The processor prefers the
//! converter's markdown export and falls back to walking the section tree
//! when that export comes back empty, which happens with scanned documents
//! that only carry partial text layers.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use super::{DocumentKind, DocumentMetadata, ProcessedDocument};
use crate::error::{Error, Result};

const DEFAULT_MAX_PDF_SIZE: u64 = 10 * 1024 * 1024;

/// Structured output of a document conversion
#[derive(Debug, Clone)]
pub struct ConvertedDocument {
    markdown: String,
    sections: Vec<DocSection>,
}

/// A text-bearing node of the converted document tree
#[derive(Debug, Clone)]
pub struct DocSection {
    pub text: String,
}

impl ConvertedDocument {
    pub fn new(markdown: String, sections: Vec<DocSection>) -> Self {
        Self { markdown, sections }
    }

    /// Markdown-like rendering of the whole document
    pub fn export_markdown(&self) -> &str {
        &self.markdown
    }

    /// Plain text gathered from the section tree
    pub fn plain_text(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Document conversion capability
pub trait DocumentConverter: Send + Sync {
    fn convert_path(&self, path: &Path) -> Result<ConvertedDocument>;
    fn convert_bytes(&self, bytes: &[u8]) -> Result<ConvertedDocument>;
}

/// Default converter backed by the pdf-extract crate
pub struct PdfExtractConverter;

impl PdfExtractConverter {
    fn build_document(text: String) -> ConvertedDocument {
        let sections = text
            .split("\n\n")
            .filter(|part| !part.trim().is_empty())
            .map(|part| DocSection {
                text: part.trim().to_string(),
            })
            .collect();
        ConvertedDocument::new(text, sections)
    }
}

impl DocumentConverter for PdfExtractConverter {
    fn convert_path(&self, path: &Path) -> Result<ConvertedDocument> {
        let text = pdf_extract::extract_text(path)
            .map_err(|e| Error::Input(format!("Failed to process PDF: {}", e)))?;
        Ok(Self::build_document(text))
    }

    fn convert_bytes(&self, bytes: &[u8]) -> Result<ConvertedDocument> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| Error::Input(format!("Failed to process PDF: {}", e)))?;
        Ok(Self::build_document(text))
    }
}

/// Extracts analyzable text from PDF invoices
#[derive(Clone)]
pub struct PdfProcessor {
    converter: Arc<dyn DocumentConverter>,
    max_size: u64,
}

impl PdfProcessor {
    /// Create a processor with the default converter and 10 MB ceiling
    pub fn new() -> Self {
        Self {
            converter: Arc::new(PdfExtractConverter),
            max_size: DEFAULT_MAX_PDF_SIZE,
        }
    }

    /// Create a processor with a custom conversion engine
    pub fn with_converter(converter: Arc<dyn DocumentConverter>) -> Self {
        Self {
            converter,
            max_size: DEFAULT_MAX_PDF_SIZE,
        }
    }

    /// Process a PDF file from disk
    ///
    /// `display_name` overrides the name recorded in metadata, for callers
    /// that hold the document in an anonymous temporary file.
    pub fn process_file(&self, path: &Path, display_name: Option<&str>) -> Result<ProcessedDocument> {
        let file_size = std::fs::metadata(path)?.len();
        if file_size > self.max_size {
            return Err(Error::Input(format!(
                "File size ({} bytes) exceeds maximum allowed size ({} bytes)",
                file_size, self.max_size
            )));
        }

        info!(path = %path.display(), "Processing PDF");

        let document = self.converter.convert_path(path)?;
        let file_name = display_name
            .map(String::from)
            .or_else(|| path.file_name().and_then(|n| n.to_str()).map(String::from));

        self.finish(document, file_name, Some(file_size))
    }

    /// Process raw PDF bytes
    pub fn process_bytes(&self, bytes: &[u8], file_name: Option<&str>) -> Result<ProcessedDocument> {
        if bytes.len() as u64 > self.max_size {
            return Err(Error::Input(format!(
                "File size ({} bytes) exceeds maximum allowed size ({} bytes)",
                bytes.len(),
                self.max_size
            )));
        }

        let document = self.converter.convert_bytes(bytes)?;

        self.finish(document, file_name.map(String::from), Some(bytes.len() as u64))
    }

    fn finish(
        &self,
        document: ConvertedDocument,
        file_name: Option<String>,
        file_size: Option<u64>,
    ) -> Result<ProcessedDocument> {
        let mut text_content = document.export_markdown().to_string();
        if text_content.trim().is_empty() {
            text_content = document.plain_text();
        }

        info!(characters = text_content.len(), "Extracted text from PDF");

        Ok(ProcessedDocument {
            kind: DocumentKind::Pdf,
            text_content: Some(text_content.clone()),
            image_bytes: None,
            metadata: DocumentMetadata {
                file_name,
                file_size,
                text_length: Some(text_content.len()),
                ..Default::default()
            },
        })
    }
}

impl Default for PdfProcessor {
    fn default() -> Self {
        Self::new()
    }
}
