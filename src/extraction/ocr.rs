//! OCR engine implementations behind the `OcrEngine` trait.

use super::types::OcrEngine;
use super::ExtractionError;

/// Tesseract-backed OCR engine.
/// Only available when compiled with the `ocr` feature flag.
#[cfg(feature = "ocr")]
pub struct TesseractOcr {
    tessdata_dir: Option<std::path::PathBuf>,
    lang: String,
}

#[cfg(feature = "ocr")]
impl TesseractOcr {
    /// Use the system tessdata location and English.
    pub fn new() -> Self {
        Self {
            tessdata_dir: None,
            lang: "eng".to_string(),
        }
    }

    pub fn with_tessdata_dir(mut self, dir: &std::path::Path) -> Self {
        self.tessdata_dir = Some(dir.to_path_buf());
        self
    }

    /// Set language(s) for OCR (e.g., "eng", "eng+heb")
    pub fn with_languages(mut self, langs: &str) -> Self {
        self.lang = langs.to_string();
        self
    }
}

#[cfg(feature = "ocr")]
impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for TesseractOcr {
    fn recognize(&self, png_bytes: &[u8]) -> Result<String, ExtractionError> {
        let tessdata = match &self.tessdata_dir {
            Some(dir) => Some(dir.to_str().ok_or_else(|| {
                ExtractionError::OcrInit("Invalid tessdata path".into())
            })?),
            None => None,
        };

        let tess = tesseract::Tesseract::new(tessdata, Some(&self.lang))
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?;

        let mut tess = tess
            .set_image_from_mem(png_bytes)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let text = tess
            .get_text()
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        Ok(text)
    }
}

/// Stand-in engine for builds without the `ocr` feature. Native PDF
/// extraction still works; anything that needs OCR gets a clear error.
pub struct NoOcr;

impl OcrEngine for NoOcr {
    fn recognize(&self, _png_bytes: &[u8]) -> Result<String, ExtractionError> {
        Err(ExtractionError::OcrUnavailable(
            "this build has no OCR engine (compile with the `ocr` feature)".into(),
        ))
    }
}

/// Scripted OCR engine for tests. Returns the configured text for every
/// page and counts how many times it ran.
pub struct MockOcrEngine {
    text: String,
    calls: std::sync::atomic::AtomicUsize,
}

impl MockOcrEngine {
    pub fn returning(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl OcrEngine for MockOcrEngine {
    fn recognize(&self, _png_bytes: &[u8]) -> Result<String, ExtractionError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(self.text.clone())
    }
}
