use anyhow::{anyhow, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use tracing::warn;

use pdfqa_core::traits::TextExtractor;

/// Text layer extraction with `pdf-extract`. Scanned pages have no text layer
/// and come back empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        // pdf-extract panics on some malformed inputs
        match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text(path))) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(anyhow!("{e}")),
            Err(panic) => {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(path = %path.display(), %msg, "pdf parser panicked");
                Err(anyhow!("PDF parser failed: {msg}"))
            }
        }
    }
}
