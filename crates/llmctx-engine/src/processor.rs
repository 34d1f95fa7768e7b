//! Processor discovery: top-level pipelines selected per input.

use crate::pipeline::PipeValue;
use crate::registry::Runtime;
use llmctx_core::{Artifact, LlmctxError, Result};
use log::debug;

/// Run the first primary processor whose predicate accepts the
/// artifact. Returns `None` when no primary matches (the universal
/// fallback should run instead).
pub fn run_primary(rt: &Runtime, artifact: Artifact) -> Option<Result<PipeValue>> {
    let entry = rt.registries().find_primary_processor(&artifact)?;
    debug!("processor '{}' selected for '{}'", entry.description, artifact.path());
    Some((entry.run)(rt, artifact))
}

/// Run a named processor. Named processors are never auto-selected.
pub fn run_named(rt: &Runtime, name: &str, artifact: Artifact) -> Result<PipeValue> {
    let entry = rt
        .registries()
        .named_processor(name)
        .ok_or_else(|| LlmctxError::UnknownVerb(name.to_string()))?;
    (entry.run)(rt, artifact)
}
