//! The `[key:value]` command grammar embedded in input locators.
//!
//! A locator like `report.pdf[pages:1-3][format:plain]` carries both the
//! path and a set of steering commands. The scanner extracts every
//! well-formed command wherever it appears and leaves malformed bracket
//! runs in the path verbatim; parsing is total and never fails.

use crate::error::{LlmctxError, Result};
use std::collections::BTreeMap;

/// Preferred text rendition selected by the `format` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextFormat {
    /// `plain`, `text`, `txt`
    Plain,
    /// `markdown`, `md` (the default)
    Markdown,
    /// `code`, `structured`, `html`, `xml`, `json` — a named structural
    /// rendition; the payload decides what "structured" means.
    Structured(String),
}

impl TextFormat {
    /// Presenter name the smart filter prefers for this format.
    pub fn preferred_presenter(&self) -> &str {
        match self {
            Self::Plain => "text",
            Self::Markdown => "markdown",
            Self::Structured(name) => name,
        }
    }
}

/// Parsed command set for one artifact.
///
/// Keys are unique and insertion order is irrelevant; the *last*
/// occurrence of a duplicated key in the locator wins. Unknown keys are
/// preserved untouched for future verbs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandMap {
    entries: BTreeMap<String, String>,
}

impl CommandMap {
    /// Empty command set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a command value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Whether a command is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or overwrite a command.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Reconstruct a locator string that re-parses to `(path, self)`.
    pub fn to_locator(&self, path: &str) -> String {
        let mut out = String::from(path);
        for (key, value) in &self.entries {
            out.push('[');
            out.push_str(key);
            out.push(':');
            out.push_str(value);
            out.push(']');
        }
        out
    }

    // --- normalized accessors -------------------------------------------

    /// Normalized `format` command; defaults to markdown. Unknown format
    /// names also fall back to markdown so the user always gets text.
    pub fn format(&self) -> TextFormat {
        match self.get("format").unwrap_or("markdown") {
            "plain" | "text" | "txt" => TextFormat::Plain,
            "markdown" | "md" => TextFormat::Markdown,
            "code" | "structured" => TextFormat::Structured("html".into()),
            name @ ("html" | "xml" | "json" | "csv") => TextFormat::Structured(name.into()),
            _ => TextFormat::Markdown,
        }
    }

    /// `images` gate; defaults to true.
    pub fn images_enabled(&self) -> bool {
        self.get("images") != Some("false")
    }

    /// `resize_images` with `resize` as a synonym.
    pub fn resize_spec(&self) -> Option<&str> {
        self.get("resize_images").or_else(|| self.get("resize"))
    }

    /// `mode` for directory/repo presentation; defaults to `files`.
    pub fn mode(&self) -> &str {
        self.get("mode").unwrap_or("files")
    }

    /// `ocr` policy; defaults to `auto`.
    pub fn ocr(&self) -> &str {
        self.get("ocr").unwrap_or("auto")
    }

    /// `viewport` as `(width, height)`; defaults to 1280x720.
    pub fn viewport(&self) -> (u32, u32) {
        self.get("viewport")
            .and_then(parse_dimensions)
            .unwrap_or((1280, 720))
    }

    /// `fullpage` screenshot flag; defaults to true.
    pub fn fullpage(&self) -> bool {
        self.get("fullpage") != Some("false")
    }

    /// `wait` settle time in milliseconds; defaults to 200.
    pub fn wait_ms(&self) -> u64 {
        self.get("wait")
            .and_then(|v| v.parse().ok())
            .unwrap_or(200)
    }

    /// `recursive` directory walk flag; defaults to true.
    pub fn recursive(&self) -> bool {
        self.get("recursive") != Some("false")
    }

    /// `max_files` bound for directory collection; defaults to 1000.
    pub fn max_files(&self) -> usize {
        self.get("max_files")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1000)
    }

    /// `truncate` character budget, when present and numeric.
    pub fn truncate_budget(&self) -> Option<usize> {
        self.get("truncate").and_then(|v| v.parse().ok())
    }
}

impl FromIterator<(String, String)> for CommandMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Parse `WxH` into a pair.
pub fn parse_dimensions(spec: &str) -> Option<(u32, u32)> {
    let (w, h) = spec.split_once(['x', 'X'])?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

/// Scan a locator, extracting every `[key:value]` command.
///
/// Returns the remaining path (surrounding whitespace trimmed) and the
/// command set. Malformed bracket runs — a missing colon, a key that is
/// not `[A-Za-z_][A-Za-z0-9_]*`, an unclosed bracket — stay in the path
/// verbatim. Later duplicates override earlier ones.
pub fn parse_locator(input: &str) -> (String, CommandMap) {
    let mut path = String::with_capacity(input.len());
    let mut commands = CommandMap::new();
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'[' {
            if let Some((key, value, end)) = scan_command(input, i) {
                commands.set(key, value);
                i = end;
                continue;
            }
        }
        let ch = input[i..].chars().next().unwrap_or('\u{FFFD}');
        path.push(ch);
        i += ch.len_utf8();
    }

    (path.trim().to_string(), commands)
}

/// Try to read one `[key:value]` starting at `start` (which indexes a
/// `[`). Returns the key, value and the byte offset just past the `]`.
fn scan_command(input: &str, start: usize) -> Option<(&str, &str, usize)> {
    let bytes = input.as_bytes();
    let mut i = start + 1;

    let key_start = i;
    if i >= bytes.len() || !(bytes[i].is_ascii_alphabetic() || bytes[i] == b'_') {
        return None;
    }
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    if i >= bytes.len() || bytes[i] != b':' {
        return None;
    }
    let key_end = i;
    i += 1;

    let value_start = i;
    while i < bytes.len() && bytes[i] != b']' {
        i += 1;
    }
    if i >= bytes.len() {
        return None;
    }
    Some((&input[key_start..key_end], &input[value_start..i], i + 1))
}

/// Parse a page/slide/sheet selection spec against a 1-based index space.
///
/// Accepts a comma list of `N` and `A-B` ranges; the token `-1` selects
/// the last index. Out-of-range indices are dropped silently; `-1`
/// against an empty document yields no selection and no error.
pub fn parse_index_spec(key: &str, spec: &str, total: usize) -> Result<Vec<usize>> {
    let mut selected = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if part == "-1" {
            if total > 0 {
                selected.push(total);
            }
            continue;
        }
        if let Some((a, b)) = part.split_once('-') {
            if !a.is_empty() {
                let start: usize = parse_index(key, spec, a)?;
                let end: usize = parse_index(key, spec, b)?;
                for n in start..=end {
                    if n >= 1 && n <= total {
                        selected.push(n);
                    }
                }
                continue;
            }
        }
        let n = parse_index(key, spec, part)?;
        if n >= 1 && n <= total {
            selected.push(n);
        }
    }
    Ok(selected)
}

fn parse_index(key: &str, spec: &str, token: &str) -> Result<usize> {
    token
        .trim()
        .parse()
        .map_err(|_| LlmctxError::invalid_value(key, spec, format!("'{token}' is not an index")))
}
