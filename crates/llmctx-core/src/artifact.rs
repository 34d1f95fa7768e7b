//! The central in-memory record: [`Artifact`] and [`ArtifactSet`].

use crate::commands::{parse_locator, CommandMap};
use crate::payload::Payload;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Suffix marking an image entry that stands in for content a back-end
/// could not produce; adapters and accessors skip these.
pub const PLACEHOLDER_SUFFIX: &str = "_placeholder";

/// Whether an image entry is a placeholder rather than real base64.
pub fn is_placeholder_image(entry: &str) -> bool {
    entry.ends_with(PLACEHOLDER_SUFFIX)
}

/// Scoped resource list shared by an artifact and its clones.
///
/// Clones created for fallback retries share the scope, so temporary
/// files live until the last holder is dropped — or until an explicit
/// [`ResourceScope::release`], which is idempotent. Cleanup failures are
/// ignored; cleanup runs in LIFO order.
#[derive(Debug, Clone, Default)]
pub struct ResourceScope {
    inner: Arc<ScopeInner>,
}

#[derive(Debug, Default)]
struct ScopeInner {
    temp_files: Mutex<Vec<PathBuf>>,
}

impl ResourceScope {
    /// Take ownership of a temporary file; it is deleted on teardown.
    pub fn adopt_temp_file(&self, path: PathBuf) {
        if let Ok(mut files) = self.temp_files_locked() {
            files.push(path);
        }
    }

    /// Delete all owned temporary files, newest first. Idempotent.
    pub fn release(&self) {
        if let Ok(mut files) = self.temp_files_locked() {
            while let Some(path) = files.pop() {
                if let Err(e) = std::fs::remove_file(&path) {
                    debug!("temp file cleanup skipped for {}: {e}", path.display());
                }
            }
        }
    }

    /// Paths currently owned (for tests and diagnostics).
    pub fn temp_files(&self) -> Vec<PathBuf> {
        self.temp_files_locked()
            .map(|files| files.clone())
            .unwrap_or_default()
    }

    fn temp_files_locked(&self) -> Result<std::sync::MutexGuard<'_, Vec<PathBuf>>, ()> {
        self.inner.temp_files.lock().map_err(|_| ())
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        let files = self.temp_files.get_mut().map(std::mem::take);
        if let Ok(mut files) = files {
            while let Some(path) = files.pop() {
                let _ = std::fs::remove_file(&path);
            }
        }
    }
}

/// The uniform in-memory record every pipeline operates on.
///
/// Construction parses the embedded DSL and performs no I/O. Text and
/// image buffers grow monotonically through the pipeline; metadata
/// accumulates diagnostics; the trace records each successfully applied
/// verb.
#[derive(Debug, Clone)]
pub struct Artifact {
    path: String,
    /// Parsed DSL commands; mutable by modifiers and partial application.
    pub commands: CommandMap,
    /// Decoded payload set by loaders.
    pub payload: Payload,
    /// Accumulated presented text.
    pub text: String,
    /// Base64 PNG strings or `data:image/png;base64,…` data-URLs.
    pub images: Vec<String>,
    /// Base64 audio entries (reserved for audio presenters).
    pub audio: Vec<String>,
    /// Diagnostic, structural and error information.
    pub metadata: Map<String, Value>,
    trace: Vec<String>,
    resources: ResourceScope,
}

impl Artifact {
    /// Parse a locator (path plus optional `[key:value]` commands).
    /// Never fails; malformed commands stay in the path verbatim.
    pub fn new(locator: &str) -> Self {
        let (path, commands) = parse_locator(locator);
        Self::with_commands(path, commands)
    }

    /// Build an artifact for `path` with an already-parsed command set
    /// (used when expansions propagate a parent's commands).
    pub fn with_commands(path: impl Into<String>, commands: CommandMap) -> Self {
        Self {
            path: path.into(),
            commands,
            payload: Payload::None,
            text: String::new(),
            images: Vec::new(),
            audio: Vec::new(),
            metadata: Map::new(),
            trace: Vec::new(),
            resources: ResourceScope::default(),
        }
    }

    /// Original input locator after DSL stripping. Immutable.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Append presented text.
    pub fn append_text(&mut self, s: &str) {
        self.text.push_str(s);
    }

    /// Append an image entry (raw base64 or data-URL).
    pub fn append_image(&mut self, entry: impl Into<String>) {
        self.images.push(entry.into());
    }

    /// Set the decoded payload.
    pub fn set_payload(&mut self, payload: Payload) {
        self.payload = payload;
    }

    /// Insert a metadata entry.
    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Record a verb failure under `<name>_error` without disturbing the
    /// artifact's buffers.
    pub fn record_error(&mut self, verb: &str, message: impl Into<String>) {
        let message = message.into();
        warn!("{verb} failed on '{}': {message}", self.path);
        self.metadata.insert(format!("{verb}_error"), Value::String(message));
    }

    /// Verb names applied to this artifact, in order.
    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    /// Record a successfully applied verb.
    pub fn push_trace(&mut self, verb: &str) {
        self.trace.push(verb.to_string());
    }

    /// Scoped resources owned by this artifact.
    pub fn resources(&self) -> &ResourceScope {
        &self.resources
    }

    /// Hand a temporary file to this artifact's scope.
    pub fn adopt_temp_file(&self, path: impl Into<PathBuf>) {
        self.resources.adopt_temp_file(path.into());
    }

    /// Release scoped resources now. Idempotent; also runs on drop of
    /// the last clone.
    pub fn close(&mut self) {
        self.resources.release();
    }

    /// Images with placeholders filtered out.
    pub fn real_images(&self) -> impl Iterator<Item = &str> {
        self.images
            .iter()
            .map(String::as_str)
            .filter(|img| !is_placeholder_image(img))
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Artifact(path='{}', text={} chars, images={}",
            self.path,
            self.text.len(),
            self.images.len()
        )?;
        if let Some(img) = self.real_images().next() {
            if img.len() > 40 {
                write!(f, ", img={}...{}", &img[..30], &img[img.len() - 10..])?;
            } else {
                write!(f, ", img={img}")?;
            }
        }
        write!(f, ", pipeline={:?})", self.trace)
    }
}

/// An ordered collection of artifacts with vectorized semantics.
///
/// Sets come from archive expansion, directory expansion in `files`
/// mode, split verbs, or explicit construction. The set owns no state
/// beyond the sequence; order is preserved through every elementwise
/// operation.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    items: Vec<Artifact>,
}

impl ArtifactSet {
    /// Build a set from artifacts, preserving order.
    pub fn new(items: Vec<Artifact>) -> Self {
        Self { items }
    }

    /// Number of artifacts.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Borrow an element.
    pub fn get(&self, index: usize) -> Option<&Artifact> {
        self.items.get(index)
    }

    /// Iterate elements in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Artifact> {
        self.items.iter()
    }

    /// Append one artifact.
    pub fn push(&mut self, artifact: Artifact) {
        self.items.push(artifact);
    }

    /// Append all artifacts of another set.
    pub fn extend(&mut self, other: ArtifactSet) {
        self.items.extend(other.items);
    }

    /// Consume into the element vector.
    pub fn into_items(self) -> Vec<Artifact> {
        self.items
    }

    /// Fold the set into a single artifact: text fields joined by a
    /// blank line, images and audio concatenated, metadata reduced to
    /// `{collection_size, combined_from}`, empty path.
    pub fn fold(&self) -> Artifact {
        let mut combined = Artifact::new("");
        combined.text = self
            .items
            .iter()
            .filter(|a| !a.text.is_empty())
            .map(|a| a.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        combined.images = self.items.iter().flat_map(|a| a.images.clone()).collect();
        combined.audio = self.items.iter().flat_map(|a| a.audio.clone()).collect();
        combined.set_meta("collection_size", self.items.len());
        combined.set_meta(
            "combined_from",
            Value::Array(
                self.items
                    .iter()
                    .map(|a| Value::String(a.path().to_string()))
                    .collect(),
            ),
        );
        combined
    }
}

impl IntoIterator for ArtifactSet {
    type Item = Artifact;
    type IntoIter = std::vec::IntoIter<Artifact>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl FromIterator<Artifact> for ArtifactSet {
    fn from_iter<T: IntoIterator<Item = Artifact>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Create an artifact from a locator (convenience constructor).
pub fn attach(locator: &str) -> Artifact {
    Artifact::new(locator)
}

/// Record a best-effort file size metadatum for a path.
pub fn record_file_size(artifact: &mut Artifact, path: &Path) {
    if let Ok(meta) = std::fs::metadata(path) {
        artifact.set_meta("file_size", meta.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_constructor_parses_dsl_without_io() {
        let att = Artifact::new("missing/dir/report.pdf[pages:1-3]");
        assert_eq!(att.path(), "missing/dir/report.pdf");
        assert_eq!(att.commands.get("pages"), Some("1-3"));
        assert!(att.text.is_empty());
        assert!(att.images.is_empty());
        assert!(!att.payload.is_set());
    }

    #[test]
    fn test_monotonic_mutators() {
        let mut att = Artifact::new("x.txt");
        att.append_text("hello");
        att.append_text(" world");
        att.append_image("aGVsbG8=");
        assert_eq!(att.text, "hello world");
        assert_eq!(att.images.len(), 1);
    }

    #[test]
    fn test_record_error_keeps_structure() {
        let mut att = Artifact::new("x.pdf");
        att.append_text("existing");
        att.record_error("images", "rasterizer unavailable");
        assert_eq!(att.text, "existing");
        assert_eq!(
            att.metadata.get("images_error").and_then(|v| v.as_str()),
            Some("rasterizer unavailable")
        );
    }

    #[test]
    fn test_repr_previews_image_without_dumping() {
        let mut att = Artifact::new("photo.png");
        let long = "A".repeat(80) + "ZZZZZZZZZZ";
        att.append_image(long);
        att.push_trace("image_file");
        att.push_trace("images");
        let repr = format!("{att}");
        assert!(repr.contains("images=1"));
        assert!(repr.contains(&format!("img={}...ZZZZZZZZZZ", "A".repeat(30))));
        assert!(repr.contains("pipeline=[\"image_file\", \"images\"]"));
        assert!(repr.len() < 200);
    }

    #[test]
    fn test_repr_skips_placeholder_images() {
        let mut att = Artifact::new("doc.pdf");
        att.append_image("pdf_page_1_placeholder");
        assert!(!format!("{att}").contains("img="));
    }

    #[test]
    fn test_close_deletes_temp_files_lifo_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let file_a = dir.path().join("a.tmp");
        let file_b = dir.path().join("b.tmp");
        for p in [&file_a, &file_b] {
            std::fs::File::create(p).unwrap().write_all(b"x").unwrap();
        }

        let mut att = Artifact::new("x");
        att.adopt_temp_file(&file_a);
        att.adopt_temp_file(&file_b);
        att.close();
        assert!(!file_a.exists());
        assert!(!file_b.exists());
        att.close();
    }

    #[test]
    fn test_drop_releases_resources() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("scoped.tmp");
        std::fs::File::create(&file).unwrap().write_all(b"x").unwrap();
        {
            let att = Artifact::new("x");
            att.adopt_temp_file(&file);
            // A clone shares the scope; dropping it must not delete yet.
            let clone = att.clone();
            drop(clone);
            assert!(file.exists());
        }
        assert!(!file.exists());
    }

    #[test]
    fn test_fold_combines_content() {
        let mut a = Artifact::new("a.txt");
        a.append_text("alpha");
        a.append_image("imgA");
        let mut b = Artifact::new("b.txt");
        b.append_text("beta");
        let c = Artifact::new("c.txt"); // empty text is skipped in the join

        let set = ArtifactSet::new(vec![a, b, c]);
        let folded = set.fold();
        assert_eq!(folded.text, "alpha\n\nbeta");
        assert_eq!(folded.images, vec!["imgA".to_string()]);
        assert_eq!(folded.path(), "");
        assert_eq!(
            folded.metadata.get("collection_size").and_then(|v| v.as_u64()),
            Some(3)
        );
        let combined_from: Vec<&str> = folded.metadata["combined_from"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(combined_from, vec!["a.txt", "b.txt", "c.txt"]);
    }
}
