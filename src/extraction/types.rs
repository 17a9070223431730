//! Trait seams and result types for the document extraction pipeline.

use serde::Serialize;

use super::ExtractionError;

/// How the text of a document was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Every page yielded a usable embedded text layer.
    Native,
    /// At least one PDF page went through rendering + OCR.
    OcrDocument,
    /// The upload was a raster image, OCR'd directly.
    OcrImage,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Native => "native",
            ExtractionMethod::OcrDocument => "ocr_document",
            ExtractionMethod::OcrImage => "ocr_image",
        }
    }
}

/// Output of a completed extraction, before sanitization.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub text: String,
    pub method: ExtractionMethod,
    pub page_count: usize,
}

/// Extracts the embedded text layer from a digital PDF, page by page.
pub trait PdfTextLayer {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError>;
}

/// Renders a single PDF page to a PNG image at the given DPI.
pub trait PdfPageRenderer {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError>;

    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_number: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError>;
}

/// Turns a preprocessed page image (PNG bytes) into text.
pub trait OcrEngine {
    fn recognize(&self, png_bytes: &[u8]) -> Result<String, ExtractionError>;
}

// Lets tests keep a handle on a shared mock engine.
impl<T: OcrEngine + ?Sized> OcrEngine for std::sync::Arc<T> {
    fn recognize(&self, png_bytes: &[u8]) -> Result<String, ExtractionError> {
        (**self).recognize(png_bytes)
    }
}
