//! Document text extraction for FinBot.
//!
//! Ingestion treats extraction as a black box that turns a file into plain
//! UTF-8 text. Failures are per-document: a corrupt PDF never aborts a
//! batch, it is reported and skipped.

use crate::error::{FinbotError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// File extensions the ingestion pipeline understands.
const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "html", "htm", "txt", "md"];

/// Extract plain text from a document file.
///
/// Supports PDF, HTML, and plain text/markdown. Unsupported or corrupt
/// input fails with `FinbotError::Extraction`.
pub fn extract_text(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let text = match extension.as_str() {
        "pdf" => extract_pdf(path)?,
        "html" | "htm" => extract_html(path)?,
        "txt" | "md" => std::fs::read_to_string(path)
            .map_err(|e| FinbotError::Extraction(format!("{}: {}", path.display(), e)))?,
        other => {
            return Err(FinbotError::Extraction(format!(
                "unsupported file type '{}': {}",
                other,
                path.display()
            )))
        }
    };

    debug!("Extracted {} chars from {}", text.chars().count(), path.display());
    Ok(text)
}

/// Extract text from a PDF file.
fn extract_pdf(path: &Path) -> Result<String> {
    pdf_extract::extract_text(path)
        .map_err(|e| FinbotError::Extraction(format!("{}: {}", path.display(), e)))
}

/// Extract text from an HTML file, stripping scripts, styles, and markup.
fn extract_html(path: &Path) -> Result<String> {
    let html = std::fs::read_to_string(path)
        .map_err(|e| FinbotError::Extraction(format!("{}: {}", path.display(), e)))?;
    Ok(strip_html(&html))
}

/// Strip HTML markup down to readable text.
fn strip_html(html: &str) -> String {
    // unwrap: patterns are compile-time constants
    let script = Regex::new(r"(?is)<script\b[^>]*>.*?</script>").unwrap();
    let style = Regex::new(r"(?is)<style\b[^>]*>.*?</style>").unwrap();
    let comment = Regex::new(r"(?s)<!--.*?-->").unwrap();
    let tag = Regex::new(r"(?s)<[^>]+>").unwrap();
    let blank_lines = Regex::new(r"\n{3,}").unwrap();

    let text = script.replace_all(html, "");
    let text = style.replace_all(&text, "");
    let text = comment.replace_all(&text, "");
    let text = tag.replace_all(&text, "\n");

    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    let text: String = text
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");

    blank_lines.replace_all(&text, "\n\n").trim().to_string()
}

/// List all supported document files under a directory, recursively.
///
/// Paths are returned sorted for a stable ingestion order.
pub fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(FinbotError::InvalidInput(format!(
            "directory does not exist: {}",
            dir.display()
        )));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html_removes_scripts_and_tags() {
        let html = r#"<html><head><style>body { color: red; }</style>
<script>alert("hi");</script></head>
<body><h1>TFSA Guide</h1><p>The 2024 limit is &#39;$7,000&#39;.</p></body></html>"#;

        let text = strip_html(html);
        assert!(text.contains("TFSA Guide"));
        assert!(text.contains("The 2024 limit is '$7,000'."));
        assert!(!text.contains("alert"));
        assert!(!text.contains("color: red"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_strip_html_decodes_entities() {
        let text = strip_html("<p>RRSP &amp; TFSA &lt;limits&gt;</p>");
        assert_eq!(text, "RRSP & TFSA <limits>");
    }

    #[test]
    fn test_extract_unsupported_extension() {
        let err = extract_text(Path::new("statement.docx")).unwrap_err();
        assert!(matches!(err, FinbotError::Extraction(_)));
    }

    #[test]
    fn test_list_documents_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.html"), "<p>a</p>").unwrap();
        std::fs::write(dir.path().join("ignore.docx"), "x").unwrap();

        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(nested.join("c.md"), "c").unwrap();

        let paths = list_documents(dir.path()).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.html", "b.txt", "c.md"]);
    }

    #[test]
    fn test_list_documents_missing_dir_is_error() {
        let err = list_documents(Path::new("/nonexistent/finbot-test")).unwrap_err();
        assert!(matches!(err, FinbotError::InvalidInput(_)));
    }
}
