//! Content extraction for supported document formats
//!
//! The scoring engine only needs "given a path, produce text or a
//! failure". Office formats (docx/pptx) are zip containers holding XML
//! parts; we pull the text parts and strip markup. Anything else is an
//! explicit `Unsupported` variant, never a silent empty string.

use crate::error::{Result, ShelverError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Read;
use std::path::Path;

/// Closed set of formats the extractor knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocFormat {
    Docx,
    Pptx,
    Pdf,
    PlainText,
    Unsupported,
}

impl DocFormat {
    /// Dispatch on the (lowercased) file extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        match ext.as_deref() {
            Some("docx") => DocFormat::Docx,
            Some("pptx") => DocFormat::Pptx,
            Some("pdf") => DocFormat::Pdf,
            Some("txt") | Some("md") => DocFormat::PlainText,
            _ => DocFormat::Unsupported,
        }
    }
}

/// Produces extracted text for a document, or a failure the pipeline
/// folds into "no content signal".
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String>;
}

/// Extractor for the office formats the service actually sees.
#[derive(Debug, Default)]
pub struct OfficeExtractor;

impl ContentExtractor for OfficeExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        match DocFormat::from_path(path) {
            DocFormat::Docx => extract_docx(path),
            DocFormat::Pptx => extract_pptx(path),
            DocFormat::PlainText => {
                std::fs::read_to_string(path).map_err(|e| ShelverError::Extraction {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
            // Native PDF text extraction needs a renderer we do not carry;
            // the classifier falls back to filename and device signals.
            DocFormat::Pdf => Err(ShelverError::UnsupportedFormat("pdf".to_string())),
            DocFormat::Unsupported => Err(ShelverError::UnsupportedFormat(
                path.extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("<none>")
                    .to_string(),
            )),
        }
    }
}

fn extract_docx(path: &Path) -> Result<String> {
    let xml = read_zip_member(path, "word/document.xml")?;
    Ok(strip_xml(&xml))
}

fn extract_pptx(path: &Path) -> Result<String> {
    static SLIDE_NAME: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^ppt/slides/slide\d+\.xml$").unwrap());

    let file = std::fs::File::open(path).map_err(|e| extraction_err(path, &e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| extraction_err(path, &e))?;

    let mut slides: Vec<(String, String)> = Vec::new();
    for index in 0..archive.len() {
        let mut member = archive.by_index(index).map_err(|e| extraction_err(path, &e))?;
        if !SLIDE_NAME.is_match(member.name()) {
            continue;
        }
        let name = member.name().to_string();
        let mut xml = String::new();
        member
            .read_to_string(&mut xml)
            .map_err(|e| extraction_err(path, &e))?;
        slides.push((name, strip_xml(&xml)));
    }

    // Zip member order is arbitrary; keep slide order for the reader.
    slides.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(slides
        .into_iter()
        .map(|(_, text)| text)
        .collect::<Vec<_>>()
        .join("\n"))
}

fn read_zip_member(path: &Path, member: &str) -> Result<String> {
    let file = std::fs::File::open(path).map_err(|e| extraction_err(path, &e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| extraction_err(path, &e))?;
    let mut entry = archive
        .by_name(member)
        .map_err(|e| extraction_err(path, &e))?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| extraction_err(path, &e))?;
    Ok(xml)
}

fn extraction_err(path: &Path, err: &dyn std::fmt::Display) -> ShelverError {
    ShelverError::Extraction {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

/// Strip XML markup, keeping element text with spaces between runs.
fn strip_xml(xml: &str) -> String {
    static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

    let text = TAG.replace_all(xml, " ");
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}
