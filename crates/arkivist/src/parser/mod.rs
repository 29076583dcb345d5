pub mod image;
pub mod pdf;
pub mod word;

use std::path::Path;

use crate::config::ParsingConfig;
use crate::error::ParseError;

/// A text-extraction strategy for one family of file formats.
pub trait DocumentParser: Send + Sync {
    fn name(&self) -> &'static str;

    /// Extract the text content of the file at `path`.
    fn parse(&self, path: &Path) -> Result<String, ParseError>;

    /// Extensions this parser handles, lowercase, without the dot.
    fn extensions(&self) -> &'static [&'static str];

    fn supports(&self, extension: &str) -> bool {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        self.extensions().contains(&ext.as_str())
    }
}

/// Ordered collection of parsers. Built once at startup and injected;
/// dispatch is first-match-wins over the registration order.
pub struct ParserRegistry {
    parsers: Vec<Box<dyn DocumentParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Production registry: image OCR, word-processor formats, PDF.
    pub fn from_config(config: &ParsingConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(image::ImageParser::new(config)));
        registry.register(Box::new(word::WordParser::new()));
        registry.register(Box::new(pdf::PdfParser::new(config)));
        registry
    }

    pub fn register(&mut self, parser: Box<dyn DocumentParser>) -> &mut Self {
        self.parsers.push(parser);
        self
    }

    /// Extract text from the file at `path` using the first parser whose
    /// extension set matches.
    pub fn extract(&self, path: &Path) -> Result<String, ParseError> {
        if !path.exists() {
            return Err(ParseError::NotFound(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let parser = self
            .parser_for(&extension)
            .ok_or_else(|| ParseError::UnsupportedFormat(extension.clone()))?;

        let _span = tracing::info_span!("parser.extract", parser = parser.name()).entered();
        parser.parse(path)
    }

    /// First registered parser supporting the extension, if any.
    pub fn parser_for(&self, extension: &str) -> Option<&dyn DocumentParser> {
        self.parsers
            .iter()
            .find(|p| p.supports(extension))
            .map(|p| p.as_ref())
    }

    pub fn can_extract(&self, extension: &str) -> bool {
        self.parser_for(extension).is_some()
    }

    /// Union of all supported extensions, in registration order, deduplicated.
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut extensions = Vec::new();
        for parser in &self.parsers {
            for ext in parser.extensions() {
                if !extensions.contains(ext) {
                    extensions.push(*ext);
                }
            }
        }
        extensions
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StaticParser {
        name: &'static str,
        extensions: &'static [&'static str],
        text: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl DocumentParser for StaticParser {
        fn name(&self) -> &'static str {
            self.name
        }

        fn parse(&self, _path: &Path) -> Result<String, ParseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.to_string())
        }

        fn extensions(&self) -> &'static [&'static str] {
            self.extensions
        }
    }

    fn registry_with(parsers: Vec<StaticParser>) -> ParserRegistry {
        let mut registry = ParserRegistry::new();
        for parser in parsers {
            registry.register(Box::new(parser));
        }
        registry
    }

    #[test]
    fn test_not_found() {
        let registry = ParserRegistry::new();
        let result = registry.extract(Path::new("/nonexistent/file.png"));
        match result {
            Err(ParseError::NotFound(path)) => {
                assert_eq!(path, PathBuf::from("/nonexistent/file.png"));
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.xyz");
        std::fs::write(&path, b"content").unwrap();

        let registry = registry_with(vec![StaticParser {
            name: "static",
            extensions: &["png"],
            text: "text",
            calls: Arc::new(AtomicUsize::new(0)),
        }]);

        match registry.extract(&path) {
            Err(ParseError::UnsupportedFormat(ext)) => assert_eq!(ext, "xyz"),
            other => panic!("Expected UnsupportedFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_no_extension_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noextension");
        std::fs::write(&path, b"content").unwrap();

        let registry = ParserRegistry::new();
        match registry.extract(&path) {
            Err(ParseError::UnsupportedFormat(ext)) => assert_eq!(ext, ""),
            other => panic!("Expected UnsupportedFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_first_match_wins() {
        let first_calls = Arc::new(AtomicUsize::new(0));
        let second_calls = Arc::new(AtomicUsize::new(0));

        let registry = registry_with(vec![
            StaticParser {
                name: "first",
                extensions: &["png", "pdf"],
                text: "from first",
                calls: Arc::clone(&first_calls),
            },
            StaticParser {
                name: "second",
                extensions: &["pdf"],
                text: "from second",
                calls: Arc::clone(&second_calls),
            },
        ]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF").unwrap();

        let text = registry.extract(&path).unwrap();
        assert_eq!(text, "from first");
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_extension_matching_is_case_insensitive() {
        let registry = registry_with(vec![StaticParser {
            name: "static",
            extensions: &["png"],
            text: "ok",
            calls: Arc::new(AtomicUsize::new(0)),
        }]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.PNG");
        std::fs::write(&path, b"fake").unwrap();

        assert_eq!(registry.extract(&path).unwrap(), "ok");
        assert!(registry.can_extract("PNG"));
        assert!(registry.can_extract(".png"));
        assert!(!registry.can_extract("tiff"));
    }

    #[test]
    fn test_supported_extensions_deduplicated() {
        let registry = registry_with(vec![
            StaticParser {
                name: "a",
                extensions: &["png", "jpg"],
                text: "",
                calls: Arc::new(AtomicUsize::new(0)),
            },
            StaticParser {
                name: "b",
                extensions: &["jpg", "pdf"],
                text: "",
                calls: Arc::new(AtomicUsize::new(0)),
            },
        ]);

        assert_eq!(registry.supported_extensions(), vec!["png", "jpg", "pdf"]);
    }

    #[test]
    fn test_production_registry_covers_known_formats() {
        let config = ParsingConfig {
            tesseract_path: "/usr/bin/tesseract".into(),
            pdftotext_path: "/usr/bin/pdftotext".into(),
            pdftoppm_path: "/usr/bin/pdftoppm".into(),
            temp_directory: std::env::temp_dir().join("arkivist_test"),
            ocr_language: "eng".to_string(),
            dpi: 300,
        };
        let registry = ParserRegistry::from_config(&config);

        for ext in [
            "png", "jpg", "jpeg", "tiff", "tif", "bmp", "gif", "docx", "odt", "rtf", "pdf",
        ] {
            assert!(registry.can_extract(ext), "missing parser for {}", ext);
        }
        assert!(!registry.can_extract("xyz"));
    }
}
