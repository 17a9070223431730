//! Image preprocessing for OCR input.
//!
//! OCR engines work best on lossless grayscale input, so every page image
//! (rendered or uploaded) is normalised to grayscale PNG before recognition.

use std::io::Cursor;

use image::ImageOutputFormat;

use super::ExtractionError;

/// Decode any supported raster format and re-encode as grayscale PNG.
pub fn to_grayscale_png(image_bytes: &[u8]) -> Result<Vec<u8>, ExtractionError> {
    let img = image::load_from_memory(image_bytes)
        .map_err(|e| ExtractionError::CorruptDocument(format!("Cannot decode image: {e}")))?;

    let gray = img.grayscale();

    let mut cursor = Cursor::new(Vec::new());
    gray.write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;

    Ok(cursor.into_inner())
}
