//! Acceptance predicates for loaders and processors.
//!
//! Predicates are deliberately cheap: path suffix, URL scheme, or a
//! single `stat`. Decoding happens in the loader body.

use llmctx_core::Artifact;
use std::path::Path;

/// Extensions the image loader accepts.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "heic", "heif",
];

/// Extensions treated as plain text by the text loader.
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "log", "json", "py", "rs", "toml", "yaml", "yml",
];

/// Binary document suffixes a URL is downloaded (not rendered) for.
pub const BINARY_URL_EXTENSIONS: &[&str] = &[
    "pdf", "docx", "doc", "pptx", "ppt", "xlsx", "xls", "zip", "png", "jpg", "jpeg", "gif",
    "bmp", "webp",
];

fn extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
}

fn has_extension(path: &str, set: &[&str]) -> bool {
    extension(path).is_some_and(|ext| set.contains(&ext.as_str()))
}

/// `http://` or `https://` locator.
pub fn url_match(att: &Artifact) -> bool {
    att.path().starts_with("http://") || att.path().starts_with("https://")
}

/// URL whose path suffix names a known binary document type.
pub fn binary_url_match(att: &Artifact) -> bool {
    url_match(att) && url_suffix(att.path()).is_some_and(|ext| BINARY_URL_EXTENSIONS.contains(&ext.as_str()))
}

/// URL best treated as a webpage.
pub fn webpage_url_match(att: &Artifact) -> bool {
    url_match(att) && !binary_url_match(att)
}

/// Extension of a URL's path component, query and fragment stripped.
pub fn url_suffix(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    extension(without_query)
}

/// PDF file.
pub fn pdf_match(att: &Artifact) -> bool {
    !url_match(att) && has_extension(att.path(), &["pdf"])
}

/// CSV file.
pub fn csv_match(att: &Artifact) -> bool {
    !url_match(att) && has_extension(att.path(), &["csv"])
}

/// Word document.
pub fn docx_match(att: &Artifact) -> bool {
    !url_match(att) && has_extension(att.path(), &["docx"])
}

/// PowerPoint deck.
pub fn pptx_match(att: &Artifact) -> bool {
    !url_match(att) && has_extension(att.path(), &["pptx", "ppt"])
}

/// Excel workbook.
pub fn xlsx_match(att: &Artifact) -> bool {
    !url_match(att) && has_extension(att.path(), &["xlsx"])
}

/// Raster image file.
pub fn image_match(att: &Artifact) -> bool {
    !url_match(att) && has_extension(att.path(), IMAGE_EXTENSIONS)
}

/// Plain-text file.
pub fn text_match(att: &Artifact) -> bool {
    !url_match(att) && has_extension(att.path(), TEXT_EXTENSIONS)
}

/// Local HTML file.
pub fn html_match(att: &Artifact) -> bool {
    !url_match(att) && has_extension(att.path(), &["html", "htm"])
}

/// ZIP archive.
pub fn zip_match(att: &Artifact) -> bool {
    !url_match(att) && has_extension(att.path(), &["zip"])
}

/// Whether the path carries shell glob metacharacters.
pub fn glob_pattern_match(att: &Artifact) -> bool {
    !url_match(att) && att.path().contains(['*', '?'])
}

/// Existing directory, or a glob pattern expanding over one.
pub fn directory_match(att: &Artifact) -> bool {
    if url_match(att) {
        return false;
    }
    glob_pattern_match(att) || Path::new(att.path()).is_dir()
}

/// Directory carrying a `.git` marker.
pub fn git_repo_match(att: &Artifact) -> bool {
    if url_match(att) {
        return false;
    }
    let path = Path::new(att.path());
    path.is_dir() && path.join(".git").exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_matchers() {
        assert!(pdf_match(&Artifact::new("report.PDF")));
        assert!(csv_match(&Artifact::new("data.csv")));
        assert!(image_match(&Artifact::new("photo.HEIC")));
        assert!(text_match(&Artifact::new("notes.md")));
        assert!(zip_match(&Artifact::new("bundle.zip")));
        assert!(!pdf_match(&Artifact::new("report.pdf.bak")));
    }

    #[test]
    fn test_url_matchers() {
        assert!(url_match(&Artifact::new("https://example.test/page")));
        assert!(!url_match(&Artifact::new("ftp://example.test/x")));
        assert!(binary_url_match(&Artifact::new(
            "https://example.test/files/doc.pdf?dl=1"
        )));
        assert!(webpage_url_match(&Artifact::new("https://example.test/doc")));
        // A URL never matches the local PDF loader.
        assert!(!pdf_match(&Artifact::new("https://example.test/doc.pdf")));
    }

    #[test]
    fn test_directory_and_glob() {
        assert!(glob_pattern_match(&Artifact::new("src/*.rs")));
        let dir = tempfile::tempdir().unwrap();
        assert!(directory_match(&Artifact::new(dir.path().to_str().unwrap())));
        assert!(!git_repo_match(&Artifact::new(dir.path().to_str().unwrap())));
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        assert!(git_repo_match(&Artifact::new(dir.path().to_str().unwrap())));
    }
}
