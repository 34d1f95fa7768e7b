//! The high-level one-call API: locators in, LLM-ready context out.
//!
//! Each input goes through processor discovery (universal fallback
//! otherwise). Directory results in `files` mode expand into a
//! directory-map artifact followed by one artifact per collected file;
//! archive results splice their sets in. A failing input becomes a
//! readable error artifact instead of failing the construction.

use crate::universal::universal;
use llmctx_core::{Artifact, LlmctxError, Payload, Result};
use llmctx_engine::{run_primary, AdapterParams, PipeValue, Runtime};
use log::debug;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

/// Processed context for one or more input locators.
pub struct Attachments {
    runtime: Arc<Runtime>,
    items: Vec<Artifact>,
}

impl Attachments {
    /// Process locators against the process-wide standard runtime.
    pub fn new(locators: &[&str]) -> Self {
        Self::with_runtime(crate::runtime(), locators)
    }

    /// Process locators against a specific runtime.
    pub fn with_runtime(runtime: Arc<Runtime>, locators: &[&str]) -> Self {
        let mut items = Vec::new();
        for locator in locators {
            process_one(&runtime, locator, &mut items);
        }
        Self { runtime, items }
    }

    /// Number of processed artifacts.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing was processed.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Borrow one artifact.
    pub fn get(&self, index: usize) -> Option<&Artifact> {
        self.items.get(index)
    }

    /// Iterate the artifacts in input order.
    pub fn iter(&self) -> std::slice::Iter<'_, Artifact> {
        self.items.iter()
    }

    /// Combined, prompt-engineered text: per-file sections separated by
    /// `---` rules, headers added where a presenter did not, and a
    /// processing summary when several files went in.
    pub fn text(&self) -> String {
        let mut sections = Vec::new();
        for att in &self.items {
            if att.text.is_empty() {
                continue;
            }
            if self.items.len() > 1 && !has_heading(&att.text) {
                sections.push(format!("## {}\n\n{}", att.path(), att.text));
            } else {
                sections.push(att.text.clone());
            }
        }
        let combined = sections.join("\n\n---\n\n");

        if self.items.len() > 1 {
            let image_count = self.images().len();
            let mut summary = format!(
                "📄 Processing Summary: {} files processed",
                self.items.len()
            );
            if image_count > 0 {
                summary.push_str(&format!(", {image_count} images extracted"));
            }
            format!("{summary}\n\n{combined}")
        } else {
            combined
        }
    }

    /// Every real (non-placeholder) image across the artifacts.
    pub fn images(&self) -> Vec<String> {
        self.items
            .iter()
            .flat_map(|att| att.real_images().map(str::to_string))
            .collect()
    }

    /// Combined metadata: per-file entries plus totals.
    pub fn metadata(&self) -> Value {
        let files: Vec<Value> = self
            .items
            .iter()
            .map(|att| {
                json!({
                    "path": att.path(),
                    "text_length": att.text.len(),
                    "image_count": att.real_images().count(),
                    "metadata": Value::Object(att.metadata.clone()),
                })
            })
            .collect();
        json!({
            "file_count": self.items.len(),
            "image_count": self.images().len(),
            "files": files,
        })
    }

    /// Fold everything into a single artifact (adapter input).
    fn folded(&self) -> Artifact {
        let mut combined = Artifact::new("");
        combined.text = self.text();
        combined.images = self.images();
        combined
    }

    /// Run a registered adapter over the combined content.
    pub fn adapt(&self, name: &str, params: &AdapterParams) -> Result<Value> {
        let entry = self
            .runtime
            .registries()
            .adapter(name)
            .ok_or_else(|| LlmctxError::UnknownVerb(name.to_string()))?;
        (entry.run)(&self.runtime, &self.folded(), params)
    }

    /// Claude-shaped messages over the combined content.
    pub fn claude(&self, prompt: &str) -> Result<Value> {
        self.adapt("claude", &AdapterParams::with_prompt(prompt))
    }

    /// OpenAI-chat-shaped messages over the combined content.
    pub fn openai_chat(&self, prompt: &str) -> Result<Value> {
        self.adapt("openai_chat", &AdapterParams::with_prompt(prompt))
    }

    /// OpenAI-responses-shaped messages over the combined content.
    pub fn openai_response(&self, prompt: &str) -> Result<Value> {
        self.adapt("openai_response", &AdapterParams::with_prompt(prompt))
    }
}

impl std::fmt::Display for Attachments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.items.is_empty() {
            return write!(f, "Attachments(empty)");
        }
        let parts: Vec<String> = self
            .items
            .iter()
            .map(|att| {
                format!(
                    "{}({} chars, {} imgs)",
                    Path::new(att.path())
                        .extension()
                        .and_then(|e| e.to_str())
                        .unwrap_or("unknown"),
                    att.text.len(),
                    att.real_images().count()
                )
            })
            .collect();
        write!(f, "Attachments([{}])", parts.join(", "))
    }
}

impl<'a> IntoIterator for &'a Attachments {
    type Item = &'a Artifact;
    type IntoIter = std::slice::Iter<'a, Artifact>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Convenience constructor mirroring `Attachments::new`.
pub fn process(locators: &[&str]) -> Attachments {
    Attachments::new(locators)
}

fn has_heading(text: &str) -> bool {
    let first_line = text.lines().next().unwrap_or("");
    first_line.starts_with('#')
        || first_line.starts_with("PDF Document:")
        || first_line.starts_with("Data from")
        || first_line.starts_with("Sheet:")
}

fn discover_or_universal(rt: &Runtime, att: Artifact) -> Result<PipeValue> {
    match run_primary(rt, att.clone()) {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => {
            // A failing specialized processor falls back to the
            // universal pipeline.
            debug!("processor failed on '{}': {e}, trying universal", att.path());
            universal(rt, att)
        }
        None => universal(rt, att),
    }
}

fn process_one(rt: &Runtime, locator: &str, items: &mut Vec<Artifact>) {
    let att = Artifact::new(locator);
    let path = att.path().to_string();
    match discover_or_universal(rt, att) {
        Ok(PipeValue::One(result)) => {
            if wants_expansion(&result) {
                expand_directory(rt, result, items);
            } else {
                items.push(result);
            }
        }
        Ok(PipeValue::Many(set)) => items.extend(set),
        Ok(PipeValue::Adapted(_)) => {
            items.push(error_artifact(&path, "processor returned adapter output"));
        }
        Err(e) => items.push(error_artifact(&path, &e.to_string())),
    }
}

fn wants_expansion(att: &Artifact) -> bool {
    att.metadata
        .get("expand_files")
        .and_then(Value::as_bool)
        .unwrap_or(false)
        && matches!(att.payload, Payload::Structure(_))
}

/// `files`-mode expansion: the directory map leads, then one artifact
/// per collected file, each re-dispatched through discovery and tagged
/// with its origin.
fn expand_directory(rt: &Runtime, map_artifact: Artifact, items: &mut Vec<Artifact>) {
    let (files, root, is_repo) = {
        let Payload::Structure(record) = &map_artifact.payload else {
            items.push(map_artifact);
            return;
        };
        (
            record.files.clone(),
            record.root.clone(),
            record.kind == llmctx_core::StructureKind::GitRepository,
        )
    };
    items.push(map_artifact);

    for file in files {
        let locator = file.to_string_lossy().into_owned();
        match discover_or_universal(rt, Artifact::new(&locator)) {
            Ok(PipeValue::One(mut result)) => {
                let relative = file
                    .strip_prefix(&root)
                    .unwrap_or(&file)
                    .to_string_lossy()
                    .into_owned();
                if is_repo {
                    result.set_meta("from_repo", true);
                    result.set_meta("repo_path", root.to_string_lossy().into_owned());
                } else {
                    result.set_meta("from_directory", true);
                    result.set_meta("directory_path", root.to_string_lossy().into_owned());
                }
                result.set_meta("relative_path", relative);
                items.push(result);
            }
            Ok(PipeValue::Many(set)) => items.extend(set),
            Ok(PipeValue::Adapted(_)) => {
                items.push(error_artifact(&locator, "processor returned adapter output"));
            }
            Err(e) => items.push(error_artifact(&locator, &e.to_string())),
        }
    }
}

fn error_artifact(path: &str, reason: &str) -> Artifact {
    let mut att = Artifact::new(path);
    att.text = format!("⚠️ Could not process {path}: {reason}");
    att.set_meta("error", reason);
    att.set_meta("path", path);
    att
}
