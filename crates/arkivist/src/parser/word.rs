use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ParseError;
use crate::parser::DocumentParser;

const EXTENSIONS: &[&str] = &["docx", "odt", "rtf"];

/// Extraction strategy for word-processor documents.
///
/// OOXML (`word/document.xml`) and OpenDocument (`content.xml`) bodies are
/// walked directly; RTF is parsed as plain text with control words and
/// metadata groups stripped. Anything the readers cannot open is a
/// deterministic `ParseFailure`.
pub struct WordParser;

impl WordParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WordParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for WordParser {
    fn name(&self) -> &'static str {
        "word"
    }

    fn parse(&self, path: &Path) -> Result<String, ParseError> {
        if !path.exists() {
            return Err(ParseError::NotFound(path.to_path_buf()));
        }

        let _span = tracing::info_span!("parser.word").entered();

        let is_rtf = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("rtf"))
            .unwrap_or(false);
        if is_rtf {
            let raw = std::fs::read(path).map_err(|e| ParseError::ReadDocument {
                path: path.to_path_buf(),
                source: e,
            })?;
            let content = String::from_utf8_lossy(&raw);
            if !content.trim_start().starts_with("{\\rtf") {
                return Err(ParseError::ParseFailure(
                    "Failed to parse Word document: missing {\\rtf header".to_string(),
                ));
            }
            return Ok(parse_rtf(&content).trim().to_string());
        }

        let file = std::fs::File::open(path).map_err(|e| ParseError::ReadDocument {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut archive = zip::ZipArchive::new(file).map_err(|e| {
            ParseError::ParseFailure(format!("Failed to parse Word document: {}", e))
        })?;

        let text = if let Ok(xml) = read_archive_entry(&mut archive, "word/document.xml") {
            parse_ooxml(&xml?)?
        } else if let Ok(xml) = read_archive_entry(&mut archive, "content.xml") {
            parse_odf(&xml?)?
        } else {
            return Err(ParseError::ParseFailure(
                "No recognizable document body (word/document.xml or content.xml)".to_string(),
            ));
        };

        Ok(text.trim().to_string())
    }

    fn extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }
}

fn read_archive_entry<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> Result<Result<String, ParseError>, zip::result::ZipError> {
    let mut entry = archive.by_name(name)?;
    let mut content = String::new();
    Ok(entry
        .read_to_string(&mut content)
        .map(|_| content)
        .map_err(|e| ParseError::ParseFailure(format!("Failed to read {}: {}", name, e))))
}

/// Walk an OOXML body, concatenating all `w:t` runs. Paragraphs and table
/// rows each contribute one newline, so table cell text stays on its row.
fn parse_ooxml(xml: &str) -> Result<String, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" | b"tr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text_run {
                    let decoded = e.xml_content().unwrap_or_default();
                    text.push_str(&decoded);
                    text.push(' ');
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ParseError::ParseFailure(format!(
                    "XML parsing error: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(text)
}

/// Walk an OpenDocument body. Text lives directly inside `text:p` (and
/// nested spans); table rows end with a newline like the OOXML path.
fn parse_odf(xml: &str) -> Result<String, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut text = String::new();
    let mut paragraph_depth: u32 = 0;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"p" {
                    paragraph_depth += 1;
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"p" => {
                    paragraph_depth = paragraph_depth.saturating_sub(1);
                    text.push('\n');
                }
                b"table-row" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if paragraph_depth > 0 {
                    let decoded = e.xml_content().unwrap_or_default();
                    text.push_str(&decoded);
                    text.push(' ');
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ParseError::ParseFailure(format!(
                    "XML parsing error: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(text)
}

/// Plain-text RTF extraction: control words are dropped (except the ones
/// that map to whitespace), metadata destinations like the font table are
/// skipped wholesale, and `\'hh` escapes are decoded as Latin-1 bytes.
fn parse_rtf(input: &str) -> String {
    let mut chars = input.chars().peekable();
    let mut text = String::new();
    let mut depth: u32 = 0;
    // While set, everything until the group at this depth closes is metadata.
    let mut skip_from: Option<u32> = None;

    while let Some(c) = chars.next() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if skip_from.map_or(false, |d| depth < d) {
                    skip_from = None;
                }
            }
            '\\' => match chars.peek().copied() {
                Some(literal @ ('\\' | '{' | '}')) => {
                    chars.next();
                    if skip_from.is_none() {
                        text.push(literal);
                    }
                }
                Some('\'') => {
                    chars.next();
                    let hex: String = [chars.next(), chars.next()].iter().flatten().collect();
                    if skip_from.is_none() {
                        if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                            text.push(byte as char);
                        }
                    }
                }
                Some('*') => {
                    chars.next();
                    skip_from.get_or_insert(depth);
                }
                Some(w) if w.is_ascii_alphabetic() => {
                    let mut word = String::new();
                    while matches!(chars.peek(), Some(n) if n.is_ascii_alphabetic()) {
                        if let Some(n) = chars.next() {
                            word.push(n);
                        }
                    }
                    if matches!(chars.peek(), Some('-')) {
                        chars.next();
                    }
                    while matches!(chars.peek(), Some(n) if n.is_ascii_digit()) {
                        chars.next();
                    }
                    // A single space after a control word is its delimiter.
                    if matches!(chars.peek(), Some(' ')) {
                        chars.next();
                    }
                    if skip_from.is_none() {
                        match word.as_str() {
                            "par" | "line" | "row" => text.push('\n'),
                            "tab" => text.push('\t'),
                            "cell" => text.push(' '),
                            "fonttbl" | "colortbl" | "stylesheet" | "info" | "pict" => {
                                skip_from = Some(depth);
                            }
                            _ => {}
                        }
                    }
                }
                _ => {
                    chars.next();
                }
            },
            '\r' | '\n' => {}
            _ => {
                if skip_from.is_none() {
                    text.push(c);
                }
            }
        }
    }

    text
}
