use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::ParsingConfig;
use crate::error::ParseError;
use crate::parser::DocumentParser;

const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "tif", "bmp", "gif"];

/// OCR strategy for raster images, shelling out to the Tesseract binary.
#[derive(Clone)]
pub struct ImageParser {
    tesseract_path: PathBuf,
    temp_directory: PathBuf,
    language: String,
}

impl ImageParser {
    pub fn new(config: &ParsingConfig) -> Self {
        Self {
            tesseract_path: config.tesseract_path.clone(),
            temp_directory: config.temp_directory.clone(),
            language: config.ocr_language.clone(),
        }
    }

    /// Check the OCR engine binary is present, before any file I/O.
    pub(crate) fn ensure_engine(&self) -> Result<(), ParseError> {
        if !self.tesseract_path.exists() {
            return Err(ParseError::ExternalToolFailure(format!(
                "Tesseract binary not found at: {}",
                self.tesseract_path.display()
            )));
        }
        Ok(())
    }

    /// Run the OCR engine against a single image and return its trimmed
    /// output. Also used directly by the scanned-PDF fallback, bypassing
    /// the registry dispatch.
    pub(crate) fn ocr_image(&self, image_path: &Path) -> Result<String, ParseError> {
        self.ensure_engine()?;

        std::fs::create_dir_all(&self.temp_directory).map_err(|e| ParseError::Io {
            path: self.temp_directory.clone(),
            source: e,
        })?;

        // Tesseract appends ".txt" to the output base itself.
        let output_base = self
            .temp_directory
            .join(format!("ocr_{}", uuid::Uuid::new_v4().simple()));
        let output_file = output_base.with_extension("txt");

        let output = Command::new(&self.tesseract_path)
            .arg(image_path)
            .arg(&output_base)
            .args(["-l", &self.language])
            .output()
            .map_err(|e| {
                ParseError::ExternalToolFailure(format!("Failed to run tesseract: {}", e))
            })?;

        if !output.status.success() {
            let _ = std::fs::remove_file(&output_file);
            return Err(ParseError::ExternalToolFailure(format!(
                "Tesseract OCR failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        if !output_file.exists() {
            return Err(ParseError::ExternalToolFailure(
                "Tesseract did not produce an output file".to_string(),
            ));
        }

        let text = std::fs::read_to_string(&output_file).map_err(|e| ParseError::ReadDocument {
            path: output_file.clone(),
            source: e,
        })?;

        let _ = std::fs::remove_file(&output_file);

        Ok(text.trim().to_string())
    }
}

impl DocumentParser for ImageParser {
    fn name(&self) -> &'static str {
        "image"
    }

    fn parse(&self, path: &Path) -> Result<String, ParseError> {
        if !path.exists() {
            return Err(ParseError::NotFound(path.to_path_buf()));
        }

        let _span = tracing::info_span!("parser.image").entered();
        self.ocr_image(path)
    }

    fn extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }
}
