use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::ParsingConfig;
use crate::error::ParseError;
use crate::parser::image::ImageParser;
use crate::parser::DocumentParser;

const EXTENSIONS: &[&str] = &["pdf"];

/// PDF extraction strategy: direct text-layer extraction via pdftotext,
/// falling back to a rasterize-then-OCR pipeline for scanned PDFs.
pub struct PdfParser {
    pdftotext_path: PathBuf,
    pdftoppm_path: PathBuf,
    temp_directory: PathBuf,
    dpi: u32,
    /// OCR engine invoked directly on rasterized pages, bypassing the
    /// registry dispatch.
    ocr: ImageParser,
}

impl PdfParser {
    pub fn new(config: &ParsingConfig) -> Self {
        Self {
            pdftotext_path: config.pdftotext_path.clone(),
            pdftoppm_path: config.pdftoppm_path.clone(),
            temp_directory: config.temp_directory.clone(),
            dpi: config.dpi,
            ocr: ImageParser::new(config),
        }
    }

    /// Extract the text layer with pdftotext. A failed run or missing
    /// output file yields an empty string so the caller falls through to
    /// the scanned-PDF path; only a missing binary is fatal.
    fn extract_with_pdftotext(&self, path: &Path) -> Result<String, ParseError> {
        if !self.pdftotext_path.exists() {
            return Err(ParseError::ExternalToolFailure(format!(
                "pdftotext binary not found at: {}",
                self.pdftotext_path.display()
            )));
        }

        std::fs::create_dir_all(&self.temp_directory).map_err(|e| ParseError::Io {
            path: self.temp_directory.clone(),
            source: e,
        })?;

        let output_file = self
            .temp_directory
            .join(format!("pdf_{}.txt", uuid::Uuid::new_v4().simple()));

        let result = Command::new(&self.pdftotext_path)
            .args(["-enc", "UTF-8"])
            .arg(path)
            .arg(&output_file)
            .output();

        let status_ok = match result {
            Ok(output) => output.status.success(),
            Err(e) => {
                tracing::warn!("pdftotext failed to run: {}", e);
                false
            }
        };

        if !status_ok || !output_file.exists() {
            let _ = std::fs::remove_file(&output_file);
            return Ok(String::new());
        }

        let text = std::fs::read_to_string(&output_file).unwrap_or_default();
        let _ = std::fs::remove_file(&output_file);

        Ok(text)
    }

    /// Rasterize every page at the configured DPI and OCR them in
    /// filename order. Page images and per-page text files are removed as
    /// soon as they are consumed; the per-job subfolder is removed last.
    fn ocr_scanned_pdf(&self, path: &Path) -> Result<String, ParseError> {
        // Both binaries are checked before any file I/O happens.
        if !self.pdftoppm_path.exists() {
            return Err(ParseError::ExternalToolFailure(format!(
                "pdftoppm binary not found at: {}",
                self.pdftoppm_path.display()
            )));
        }
        self.ocr.ensure_engine()?;

        let folder = self
            .temp_directory
            .join(format!("pages_{}", uuid::Uuid::new_v4().simple()));
        std::fs::create_dir_all(&folder).map_err(|e| ParseError::Io {
            path: folder.clone(),
            source: e,
        })?;

        let result = self.ocr_rasterized_pages(path, &folder);

        // Cleanup obligation holds on the failure path too.
        if result.is_err() {
            if let Ok(entries) = std::fs::read_dir(&folder) {
                for entry in entries.flatten() {
                    let _ = std::fs::remove_file(entry.path());
                }
            }
        }
        let _ = std::fs::remove_dir(&folder);

        result
    }

    fn ocr_rasterized_pages(&self, path: &Path, folder: &Path) -> Result<String, ParseError> {
        let output_prefix = folder.join("page");
        let result = Command::new(&self.pdftoppm_path)
            .args(["-png", "-r", &self.dpi.to_string()])
            .arg(path)
            .arg(&output_prefix)
            .output();

        match result {
            Ok(output) if !output.status.success() => {
                tracing::warn!(
                    "pdftoppm exited non-zero: {}",
                    String::from_utf8_lossy(&output.stderr)
                );
            }
            Err(e) => {
                tracing::warn!("pdftoppm failed to run: {}", e);
            }
            _ => {}
        }

        let pattern = format!("{}/*.png", folder.display());
        let mut images: Vec<PathBuf> = glob::glob(&pattern)
            .map_err(|e| ParseError::ParseFailure(format!("Invalid glob pattern: {}", e)))?
            .flatten()
            .collect();
        images.sort();

        let mut full_text = String::new();

        for (index, image) in images.iter().enumerate() {
            let page_number = index + 1;
            match self.ocr.ocr_image(image) {
                Ok(page_text) => {
                    full_text.push_str(&page_text);
                    full_text.push('\n');
                }
                Err(e) => {
                    // Partial-result policy: keep going, but leave a
                    // marker so a failed page is never silently dropped.
                    tracing::warn!("OCR failed for page {}: {}", page_number, e);
                    full_text.push_str(&format!("[OCR failed for page {}: {}]", page_number, e));
                    full_text.push('\n');
                }
            }
            let _ = std::fs::remove_file(image);
        }

        Ok(full_text.trim().to_string())
    }
}

/// True when the text layer contains nothing but whitespace and ASCII
/// control characters (0x00-0x1F, 0x7F), i.e. the PDF is scanned.
fn is_effectively_empty(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_whitespace() || c.is_ascii_control())
}

impl DocumentParser for PdfParser {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn parse(&self, path: &Path) -> Result<String, ParseError> {
        if !path.exists() {
            return Err(ParseError::NotFound(path.to_path_buf()));
        }

        let _span = tracing::info_span!("parser.pdf").entered();

        let text = self.extract_with_pdftotext(path)?;

        if is_effectively_empty(&text) {
            let _fallback =
                tracing::info_span!("parser.pdf.ocr_fallback", reason = "no_text_layer").entered();
            return self.ocr_scanned_pdf(path);
        }

        Ok(text.trim().to_string())
    }

    fn extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }
}
