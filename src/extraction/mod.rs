//! Hybrid document-to-text extraction.
//!
//! Digital PDFs are read through their embedded text layer; pages whose
//! layer is missing or too thin fall back to rendering + OCR. Raster
//! image uploads go straight to OCR. The expensive work is synchronous
//! CPU code; callers run it through the worker pool.

pub mod ocr;
pub mod pdf;
pub mod pdfium;
pub mod preprocess;
pub mod types;

pub use types::{ExtractionMethod, ExtractionResult, OcrEngine, PdfPageRenderer, PdfTextLayer};

use thiserror::Error;

/// Minimum characters of stripped text a PDF page must carry for its
/// native layer to be trusted. Below this the page is assumed scanned.
pub const OCR_FALLBACK_THRESHOLD: usize = 80;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Uploaded file is empty")]
    EmptyInput,

    #[error("Cannot read document: {0}")]
    CorruptDocument(String),

    #[error("Failed to render page {page}: {reason}")]
    PageRender { page: usize, reason: String },

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR failed: {0}")]
    OcrProcessing(String),
}

/// Media types the extractor accepts.
pub fn is_supported_mime(mime: &str) -> bool {
    matches!(
        normalize_mime(mime),
        Some(MediaKind::Pdf) | Some(MediaKind::Image)
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaKind {
    Pdf,
    Image,
}

fn normalize_mime(mime: &str) -> Option<MediaKind> {
    // Parameters like "; charset=binary" are irrelevant here.
    let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
    match essence.as_str() {
        "application/pdf" => Some(MediaKind::Pdf),
        "image/png" | "image/jpeg" | "image/jpg" | "image/tiff" | "image/webp" => {
            Some(MediaKind::Image)
        }
        _ => None,
    }
}

/// Orchestrates the native-first, OCR-fallback decision tree.
pub struct DocumentExtractor {
    text_layer: Box<dyn PdfTextLayer + Send + Sync>,
    renderer: Box<dyn PdfPageRenderer + Send + Sync>,
    ocr: Box<dyn OcrEngine + Send + Sync>,
}

impl DocumentExtractor {
    pub fn new(
        text_layer: Box<dyn PdfTextLayer + Send + Sync>,
        renderer: Box<dyn PdfPageRenderer + Send + Sync>,
        ocr: Box<dyn OcrEngine + Send + Sync>,
    ) -> Self {
        Self {
            text_layer,
            renderer,
            ocr,
        }
    }

    /// Extract text from an uploaded document. `declared_mime` is the
    /// client's content type; unsupported types are rejected up front.
    pub fn extract(
        &self,
        data: &[u8],
        declared_mime: &str,
    ) -> Result<ExtractionResult, ExtractionError> {
        if data.is_empty() {
            return Err(ExtractionError::EmptyInput);
        }
        match normalize_mime(declared_mime) {
            Some(MediaKind::Pdf) => self.extract_pdf(data),
            Some(MediaKind::Image) => self.extract_image(data),
            None => Err(ExtractionError::UnsupportedType(declared_mime.to_string())),
        }
    }

    fn extract_pdf(&self, data: &[u8]) -> Result<ExtractionResult, ExtractionError> {
        let pages = self.text_layer.extract_pages(data)?;
        if pages.is_empty() {
            return Err(ExtractionError::CorruptDocument(
                "document contains no pages".into(),
            ));
        }
        let page_count = pages.len();

        let mut page_texts: Vec<String> = Vec::with_capacity(page_count);
        let mut ocr_queue: Vec<usize> = Vec::new();

        for (index, page) in pages.iter().enumerate() {
            let stripped = page.trim();
            if stripped.chars().count() >= OCR_FALLBACK_THRESHOLD {
                page_texts.push(stripped.to_string());
            } else {
                page_texts.push(String::new());
                ocr_queue.push(index);
            }
        }

        if ocr_queue.is_empty() {
            return Ok(ExtractionResult {
                text: join_pages(&page_texts),
                method: ExtractionMethod::Native,
                page_count,
            });
        }

        tracing::debug!(
            pages = page_count,
            ocr_pages = ocr_queue.len(),
            "falling back to OCR for thin pages"
        );

        for index in ocr_queue {
            let png = self
                .renderer
                .render_page(data, index, pdfium::OCR_RENDER_DPI)?;
            let gray = preprocess::to_grayscale_png(&png)?;
            let recognized = self.ocr.recognize(&gray)?;
            page_texts[index] = recognized.trim().to_string();
        }

        Ok(ExtractionResult {
            text: join_pages(&page_texts),
            method: ExtractionMethod::OcrDocument,
            page_count,
        })
    }

    fn extract_image(&self, data: &[u8]) -> Result<ExtractionResult, ExtractionError> {
        let gray = preprocess::to_grayscale_png(data)?;
        let recognized = self.ocr.recognize(&gray)?;
        Ok(ExtractionResult {
            text: recognized.trim().to_string(),
            method: ExtractionMethod::OcrImage,
            page_count: 1,
        })
    }
}

fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n\n")
}
