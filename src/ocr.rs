//! OCR and PDF conversion
//!
//! Both are opaque external services: Tesseract reads image bytes and
//! returns recognized text, pdftoppm rasterizes PDF pages to images.
//! Calls block on child processes, so handlers run them on the
//! blocking thread pool.

use std::io::Write;
use std::process::{Command, Stdio};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct OcrError(pub String);

/// Text recognition over raw image bytes.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &[u8]) -> Result<String, OcrError>;
}

/// Tesseract invoked as a child process, image on stdin, text on
/// stdout.
pub struct TesseractCli {
    command: String,
    lang: String,
}

impl TesseractCli {
    pub fn new(command: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            lang: lang.into(),
        }
    }
}

impl TextRecognizer for TesseractCli {
    fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", &self.lang])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| OcrError(format!("failed to run {}: {e}", self.command)))?;

        child
            .stdin
            .take()
            .ok_or_else(|| OcrError("no stdin handle for OCR process".into()))?
            .write_all(image)
            .map_err(|e| OcrError(format!("failed to feed image to {}: {e}", self.command)))?;

        let output = child
            .wait_with_output()
            .map_err(|e| OcrError(format!("{} did not finish: {e}", self.command)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// PDF-to-image conversion via pdftoppm in a scratch directory.
pub struct PdfConverter {
    command: String,
}

impl PdfConverter {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Rasterize every page to PNG bytes, in page order.
    pub fn convert(&self, pdf: &[u8]) -> Result<Vec<Vec<u8>>, OcrError> {
        let dir = tempfile::tempdir()
            .map_err(|e| OcrError(format!("failed to create scratch directory: {e}")))?;
        let input = dir.path().join("input.pdf");
        std::fs::write(&input, pdf)
            .map_err(|e| OcrError(format!("failed to write PDF to scratch: {e}")))?;

        let output = Command::new(&self.command)
            .arg("-png")
            .arg(&input)
            .arg(dir.path().join("page"))
            .output()
            .map_err(|e| OcrError(format!("failed to run {}: {e}", self.command)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        let mut pages: Vec<_> = std::fs::read_dir(dir.path())
            .map_err(|e| OcrError(format!("failed to list scratch directory: {e}")))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
            .collect();
        pages.sort();

        if pages.is_empty() {
            return Err(OcrError("PDF produced no pages".into()));
        }

        pages
            .into_iter()
            .map(|path| {
                std::fs::read(&path)
                    .map_err(|e| OcrError(format!("failed to read rendered page: {e}")))
            })
            .collect()
    }
}
