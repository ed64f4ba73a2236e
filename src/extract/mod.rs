//! Document text-extraction boundary.
//!
//! Uploads are believed to be PDFs; extraction either yields plain text or
//! signals [`ExtractError`]. Callers treat a failure as recoverable: the
//! failing document simply contributes no evidence.

use thiserror::Error;

/// A document could not be parsed.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("could not extract text from document: {0}")]
    Parse(String),
}

/// Abstract extraction capability: raw bytes in, plain text out.
pub trait DocumentExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// PDF text extractor backed by the `pdf-extract` crate.
pub struct PdfTextExtractor;

impl DocumentExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_fail_without_panicking() {
        let result = PdfTextExtractor.extract(b"definitely not a pdf");
        assert!(result.is_err());
    }
}
