//! Default collaborator bindings.
//!
//! Only collaborators that work without native libraries ship a
//! binding; PDF rasterization, browser screenshots and OCR stay
//! pluggable and the consuming presenters degrade when they are absent.

use llmctx_core::collab::{HttpClient, HttpResponse, OfficeConverter, TokenEstimator};
use llmctx_core::{LlmctxError, Result};
use log::debug;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Blocking HTTP client backed by `reqwest`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestClient;

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmctxError::collaborator("http", e.to_string()))?;
        let response = client
            .get(url)
            .send()
            .map_err(|e| LlmctxError::collaborator("http", format!("GET {url}: {e}")))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response.content_length();
        let bytes = response
            .bytes()
            .map_err(|e| LlmctxError::collaborator("http", format!("GET {url}: {e}")))?
            .to_vec();

        debug!("GET {url} -> {status} ({} bytes)", bytes.len());
        Ok(HttpResponse {
            bytes,
            status,
            content_type,
            content_length,
        })
    }
}

/// Office-to-PDF conversion through a headless LibreOffice process.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    binary: String,
}

impl Default for SofficeConverter {
    fn default() -> Self {
        Self {
            binary: "soffice".to_string(),
        }
    }
}

impl SofficeConverter {
    /// Use a specific LibreOffice binary.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl OfficeConverter for SofficeConverter {
    fn to_pdf(&self, input: &Path, out_dir: &Path, timeout: Duration) -> Result<PathBuf> {
        let mut child = Command::new(&self.binary)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(input)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                LlmctxError::collaborator(
                    "office",
                    format!("cannot spawn {}: {e} (is LibreOffice installed?)", self.binary),
                )
            })?;

        // Hard timeout: poll, then kill.
        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    if !status.success() {
                        return Err(LlmctxError::collaborator(
                            "office",
                            format!("converter exited with {status}"),
                        ));
                    }
                    break;
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(LlmctxError::collaborator(
                            "office",
                            format!("conversion timed out after {}s", timeout.as_secs()),
                        ));
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(LlmctxError::collaborator("office", e.to_string()));
                }
            }
        }

        let stem = input
            .file_stem()
            .ok_or_else(|| LlmctxError::collaborator("office", "input has no file name"))?;
        let pdf = out_dir.join(stem).with_extension("pdf");
        if pdf.exists() {
            Ok(pdf)
        } else {
            Err(LlmctxError::collaborator(
                "office",
                "converter finished but produced no PDF",
            ))
        }
    }
}

/// Deterministic token estimator: whitespace word count scaled by 4/3.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCountEstimator;

impl TokenEstimator for WordCountEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.split_whitespace().count() * 4 / 3
    }
}

/// Standalone estimate used when no estimator is bound.
pub fn estimate_tokens(text: &str) -> usize {
    WordCountEstimator.estimate(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count_estimator_is_deterministic() {
        let text = "one two three four five six";
        assert_eq!(WordCountEstimator.estimate(text), 8);
        assert_eq!(WordCountEstimator.estimate(text), estimate_tokens(text));
        assert_eq!(WordCountEstimator.estimate(""), 0);
    }

    #[test]
    fn test_soffice_missing_binary_is_collaborator_error() {
        let converter = SofficeConverter::with_binary("soffice-definitely-not-installed");
        let dir = tempfile::tempdir().unwrap();
        let err = converter
            .to_pdf(Path::new("x.docx"), dir.path(), Duration::from_secs(1))
            .unwrap_err();
        match err {
            LlmctxError::Collaborator { name, .. } => assert_eq!(name, "office"),
            other => panic!("expected collaborator error, got {other}"),
        }
    }
}
