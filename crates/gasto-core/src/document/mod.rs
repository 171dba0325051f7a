//! Multi-modal input normalization
//!
//! Raw expense signals arrive as plain text, receipt photos, or PDF
//! invoices. This module converts each into a single `ProcessedDocument`
//! payload (kind tag, optional text, optional canonical JPEG bytes) that the
//! AI layer consumes without caring about the source format.
//!
//! - `ImageProcessor`: validates and re-encodes raster images
//! - `PdfProcessor`: extracts text through a pluggable converter
//! - `FileFetcher`: downloads remote files into scoped temporary storage
//! - `DocumentService`: facade dispatching on input kind

mod fetch;
mod image;
mod pdf;

pub use self::fetch::{FetchedFile, FileFetcher};
pub use self::image::ImageProcessor;
pub use self::pdf::{
    ConvertedDocument, DocSection, DocumentConverter, PdfExtractConverter, PdfProcessor,
};

use crate::error::{Error, Result};

/// Input kind after normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Image,
    Pdf,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Text => "text",
            DocumentKind::Image => "image",
            DocumentKind::Pdf => "pdf",
        }
    }
}

/// Facts gathered while normalizing an input
#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<String>,
    pub text_length: Option<usize>,
}

/// Normalized analysis payload
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub kind: DocumentKind,
    pub text_content: Option<String>,
    pub image_bytes: Option<Vec<u8>>,
    pub metadata: DocumentMetadata,
}

/// Unified entry point for all input kinds
#[derive(Clone)]
pub struct DocumentService {
    image: ImageProcessor,
    pdf: PdfProcessor,
    fetcher: FileFetcher,
}

impl DocumentService {
    pub fn new() -> Self {
        Self {
            image: ImageProcessor::new(),
            pdf: PdfProcessor::new(),
            fetcher: FileFetcher::new(),
        }
    }

    /// Wrap a plain text message
    pub fn process_text(&self, text: &str) -> ProcessedDocument {
        ProcessedDocument {
            kind: DocumentKind::Text,
            text_content: Some(text.to_string()),
            image_bytes: None,
            metadata: DocumentMetadata {
                text_length: Some(text.len()),
                ..Default::default()
            },
        }
    }

    /// Normalize uploaded image bytes
    pub fn process_image_bytes(
        &self,
        bytes: &[u8],
        file_name: Option<&str>,
    ) -> Result<ProcessedDocument> {
        self.image.process_bytes(bytes, file_name)
    }

    /// Extract text from uploaded PDF bytes
    pub fn process_pdf_bytes(
        &self,
        bytes: &[u8],
        file_name: Option<&str>,
    ) -> Result<ProcessedDocument> {
        self.pdf.process_bytes(bytes, file_name)
    }

    /// Download a remote file and normalize it
    ///
    /// The kind is decided from the URL file name first and the reported
    /// Content-Type second. The temporary download is removed before this
    /// returns, whatever the outcome.
    pub async fn fetch_and_process(&self, url: &str) -> Result<ProcessedDocument> {
        let fetched = self.fetcher.fetch(url).await?;
        let kind = classify_fetched(fetched.file_name(), fetched.content_type())?;

        match kind {
            DocumentKind::Pdf => self.pdf.process_file(fetched.path(), fetched.file_name()),
            DocumentKind::Image => {
                let bytes = std::fs::read(fetched.path())?;
                self.image.process_bytes(&bytes, fetched.file_name())
            }
            DocumentKind::Text => Err(Error::Input(
                "Remote fetch supports PDF and image files only".into(),
            )),
        }
    }
}

impl Default for DocumentService {
    fn default() -> Self {
        Self::new()
    }
}

/// Decide what a downloaded file is
fn classify_fetched(file_name: Option<&str>, content_type: Option<&str>) -> Result<DocumentKind> {
    if let Some(name) = file_name {
        if let Some((_, ext)) = name.rsplit_once('.') {
            match ext.to_lowercase().as_str() {
                "pdf" => return Ok(DocumentKind::Pdf),
                "jpg" | "jpeg" | "png" | "webp" => return Ok(DocumentKind::Image),
                _ => {}
            }
        }
    }

    if let Some(content_type) = content_type {
        let content_type = content_type.to_lowercase();
        if content_type.starts_with("application/pdf") {
            return Ok(DocumentKind::Pdf);
        }
        if content_type.starts_with("image/") {
            return Ok(DocumentKind::Image);
        }
    }

    Err(Error::Input(
        "Cannot determine file type: URL must point to a PDF or image".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockFileServer;

    fn sample_png() -> Vec<u8> {
        let img = ::image::RgbImage::from_pixel(4, 4, ::image::Rgb([10u8, 200, 60]));
        let mut bytes = Vec::new();
        ::image::DynamicImage::ImageRgb8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                ::image::ImageFormat::Png,
            )
            .unwrap();
        bytes
    }

    #[test]
    fn test_process_text_payload() {
        let service = DocumentService::new();

        let doc = service.process_text("Lunch 12.50 EUR");

        assert_eq!(doc.kind, DocumentKind::Text);
        assert_eq!(doc.text_content.as_deref(), Some("Lunch 12.50 EUR"));
        assert!(doc.image_bytes.is_none());
        assert_eq!(doc.metadata.text_length, Some(15));
    }

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(
            classify_fetched(Some("invoice.PDF"), None).unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            classify_fetched(Some("receipt.jpeg"), None).unwrap(),
            DocumentKind::Image
        );
    }

    #[test]
    fn test_classify_falls_back_to_content_type() {
        assert_eq!(
            classify_fetched(Some("download"), Some("application/pdf")).unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            classify_fetched(None, Some("image/png; charset=binary")).unwrap(),
            DocumentKind::Image
        );
    }

    #[test]
    fn test_classify_rejects_unknown() {
        let result = classify_fetched(Some("notes.txt"), Some("text/plain"));
        assert!(matches!(result, Err(Error::Input(_))));
    }

    #[tokio::test]
    async fn test_fetch_and_process_remote_image() {
        let server = MockFileServer::start().await;
        server.serve("/photos/receipt.png", sample_png(), "image/png");
        let service = DocumentService::new();

        let doc = service
            .fetch_and_process(&format!("{}/photos/receipt.png", server.url()))
            .await
            .unwrap();

        assert_eq!(doc.kind, DocumentKind::Image);
        assert_eq!(doc.metadata.file_name.as_deref(), Some("receipt.png"));
        let jpeg = doc.image_bytes.as_deref().unwrap();
        assert_eq!(
            ::image::guess_format(jpeg).unwrap(),
            ::image::ImageFormat::Jpeg
        );
    }

    #[tokio::test]
    async fn test_fetch_and_process_rejects_unclassifiable() {
        let server = MockFileServer::start().await;
        server.serve("/blob", b"some bytes".to_vec(), "application/octet-stream");
        let service = DocumentService::new();

        let result = service.fetch_and_process(&format!("{}/blob", server.url())).await;

        assert!(matches!(result, Err(Error::Input(_))));
    }
}
