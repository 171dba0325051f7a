//! Receipt image validation and canonicalization
//!
//! Every accepted image is re-encoded to JPEG before analysis so the AI
//! providers always receive one consistent encoding regardless of what the
//! user uploaded.

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use tracing::info;

use super::{DocumentKind, DocumentMetadata, ProcessedDocument};
use crate::error::{Error, Result};

const DEFAULT_MAX_IMAGE_SIZE: u64 = 5 * 1024 * 1024;
const JPEG_QUALITY: u8 = 95;
const SUPPORTED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Prepares image files for AI analysis
#[derive(Clone)]
pub struct ImageProcessor {
    max_size: u64,
}

impl ImageProcessor {
    /// Create a processor with the default 5 MB size ceiling
    pub fn new() -> Self {
        Self {
            max_size: DEFAULT_MAX_IMAGE_SIZE,
        }
    }

    /// Create a processor with a custom size ceiling
    pub fn with_max_size(max_size: u64) -> Self {
        Self { max_size }
    }

    /// Process an image file from disk
    ///
    /// Validates the extension against the supported set and the file size
    /// against the ceiling before decoding.
    pub fn process_file(&self, path: &Path) -> Result<ProcessedDocument> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(Error::Input(format!(
                "Unsupported image format: .{}. Supported formats: {}",
                ext,
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }

        let file_size = std::fs::metadata(path)?.len();
        if file_size > self.max_size {
            return Err(Error::Input(format!(
                "Image size ({} bytes) exceeds maximum allowed size ({} bytes)",
                file_size, self.max_size
            )));
        }

        info!(path = %path.display(), "Processing image");

        let img = image::open(path)
            .map_err(|e| Error::Input(format!("Failed to process image: {}", e)))?;
        let format = ImageFormat::from_path(path)
            .map(format_name)
            .unwrap_or_else(|_| ext.to_uppercase());
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(String::from);

        self.finish(img, file_name, file_size, format)
    }

    /// Process raw image bytes
    ///
    /// The format is sniffed from the content rather than a file name, so
    /// this is the entry point for uploads and downloads.
    pub fn process_bytes(&self, bytes: &[u8], file_name: Option<&str>) -> Result<ProcessedDocument> {
        if bytes.len() as u64 > self.max_size {
            return Err(Error::Input(format!(
                "Image size ({} bytes) exceeds maximum allowed size ({} bytes)",
                bytes.len(),
                self.max_size
            )));
        }

        let format = image::guess_format(bytes)
            .map_err(|e| Error::Input(format!("Failed to process image: {}", e)))?;
        if !matches!(
            format,
            ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP
        ) {
            return Err(Error::Input(format!(
                "Unsupported image format: {}. Supported formats: {}",
                format_name(format),
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }

        let img = image::load_from_memory(bytes)
            .map_err(|e| Error::Input(format!("Failed to process image: {}", e)))?;

        self.finish(
            img,
            file_name.map(String::from),
            bytes.len() as u64,
            format_name(format),
        )
    }

    fn finish(
        &self,
        img: DynamicImage,
        file_name: Option<String>,
        file_size: u64,
        format: String,
    ) -> Result<ProcessedDocument> {
        let width = img.width();
        let height = img.height();
        let image_bytes = encode_jpeg(img)?;

        info!(
            width,
            height,
            bytes = image_bytes.len(),
            format = %format,
            "Processed image"
        );

        Ok(ProcessedDocument {
            kind: DocumentKind::Image,
            text_content: None,
            image_bytes: Some(image_bytes),
            metadata: DocumentMetadata {
                file_name,
                file_size: Some(file_size),
                width: Some(width),
                height: Some(height),
                format: Some(format),
                ..Default::default()
            },
        })
    }
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-encode to JPEG at fixed quality
///
/// Grayscale stays grayscale; everything else (including alpha formats,
/// which JPEG cannot carry) goes through an RGB buffer.
fn encode_jpeg(img: DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);

    let result = match img {
        DynamicImage::ImageLuma8(gray) => encoder.encode_image(&gray),
        other => encoder.encode_image(&other.to_rgb8()),
    };
    result.map_err(|e| Error::Input(format!("Failed to process image: {}", e)))?;

    Ok(buffer)
}

fn format_name(format: ImageFormat) -> String {
    format!("{:?}", format).to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn test_png_is_reencoded_as_jpeg() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, Rgb([200, 16, 16])));
        let bytes = encode(img, ImageFormat::Png);

        let processed = ImageProcessor::new()
            .process_bytes(&bytes, Some("receipt.png"))
            .unwrap();

        let out = processed.image_bytes.unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
        assert_eq!(processed.kind, DocumentKind::Image);
        assert_eq!(processed.metadata.width, Some(4));
        assert_eq!(processed.metadata.height, Some(3));
        assert_eq!(processed.metadata.format.as_deref(), Some("PNG"));
    }

    #[test]
    fn test_rgba_input_converted_to_rgb() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 128])));
        let bytes = encode(img, ImageFormat::Png);

        let processed = ImageProcessor::new().process_bytes(&bytes, None).unwrap();

        let decoded = image::load_from_memory(&processed.image_bytes.unwrap()).unwrap();
        assert!(matches!(decoded, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn test_grayscale_preserved() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, image::Luma([90])));
        let bytes = encode(img, ImageFormat::Png);

        let processed = ImageProcessor::new().process_bytes(&bytes, None).unwrap();

        let decoded = image::load_from_memory(&processed.image_bytes.unwrap()).unwrap();
        assert!(matches!(decoded, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_oversized_image_rejected() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([0, 0, 0])));
        let bytes = encode(img, ImageFormat::Png);

        let result = ImageProcessor::with_max_size(16).process_bytes(&bytes, None);

        assert!(matches!(result, Err(Error::Input(msg)) if msg.contains("exceeds maximum")));
    }

    #[test]
    fn test_unsupported_format_rejected() {
        // BMP magic bytes; sniffed before any decode happens
        let bytes = b"BM\x00\x00\x00\x00";

        let result = ImageProcessor::new().process_bytes(bytes, None);

        assert!(matches!(result, Err(Error::Input(msg)) if msg.contains("Unsupported image format")));
    }

    #[test]
    fn test_file_extension_allowlist() {
        let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        std::fs::write(file.path(), b"not an image").unwrap();

        let result = ImageProcessor::new().process_file(file.path());

        assert!(matches!(result, Err(Error::Input(msg)) if msg.contains("Unsupported image format")));
    }
}
