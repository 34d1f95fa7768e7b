//! Collaborator contracts consumed by the runtime.
//!
//! Everything that needs a network, a native library, or an external
//! process sits behind one of these traits. Bindings are swappable on
//! the runtime builder; a missing binding degrades the consuming verb
//! (it records a `<name>_error` metadatum) instead of failing the
//! pipeline.

use crate::error::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Response from an HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Response body.
    pub bytes: Vec<u8>,
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header, when present.
    pub content_type: Option<String>,
    /// `Content-Length` header, when present.
    pub content_length: Option<u64>,
}

/// Blocking HTTP client.
pub trait HttpClient: Send + Sync {
    /// Fetch a URL with a per-request timeout.
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse>;
}

/// Renders single PDF pages to PNG.
pub trait PdfRasterizer: Send + Sync {
    /// Render the 0-based `page_index` of `doc_bytes` at `scale` (1.0 =
    /// natural size) and return PNG bytes.
    fn render_png(&self, doc_bytes: &[u8], page_index: usize, scale: f32) -> Result<Vec<u8>>;
}

/// Converts office documents (DOCX/PPTX/XLSX) to PDF via an external
/// renderer.
pub trait OfficeConverter: Send + Sync {
    /// Convert `input` into a PDF inside `out_dir`; returns the PDF
    /// path. Implementations must enforce `timeout` as a hard limit.
    fn to_pdf(&self, input: &Path, out_dir: &Path, timeout: Duration) -> Result<PathBuf>;
}

/// Screenshot request for a headless browser.
#[derive(Debug, Clone)]
pub struct ScreenshotRequest {
    /// URL to render.
    pub url: String,
    /// Viewport `(width, height)`.
    pub viewport: (u32, u32),
    /// Settle time after load, in milliseconds (not a deadline).
    pub wait_ms: u64,
    /// Capture the full page height instead of the viewport only.
    pub full_page: bool,
    /// CSS selector to highlight and scroll into view, when present.
    pub highlight_selector: Option<String>,
}

/// Screenshot result.
#[derive(Debug, Clone)]
pub struct ScreenshotResult {
    /// PNG bytes of the capture.
    pub png: Vec<u8>,
    /// Number of elements the highlight selector matched.
    pub highlighted_elements: usize,
}

/// Headless browser capable of rendering a page to PNG.
pub trait HeadlessBrowser: Send + Sync {
    /// Render and capture a page.
    fn screenshot(&self, request: &ScreenshotRequest) -> Result<ScreenshotResult>;
}

/// Optical character recognition over a PNG image.
pub trait OcrEngine: Send + Sync {
    /// Recognize text in `png` using `lang` (e.g. `eng`).
    fn image_to_string(&self, png: &[u8], lang: &str) -> Result<String>;
}

/// Approximate token counter used by split verbs.
pub trait TokenEstimator: Send + Sync {
    /// Estimate the token count of `text`. Must be deterministic.
    fn estimate(&self, text: &str) -> usize;
}
