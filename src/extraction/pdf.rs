use super::types::PdfTextLayer;
use super::ExtractionError;

/// Digital-PDF text layer extractor backed by the pdf-extract crate.
pub struct PdfExtractTextLayer;

impl PdfTextLayer for PdfExtractTextLayer {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
            .map_err(|e| ExtractionError::CorruptDocument(e.to_string()))
    }
}
