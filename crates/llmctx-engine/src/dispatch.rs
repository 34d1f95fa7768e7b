//! Type-dispatched verb invocation.
//!
//! Loaders get the tolerant three-valued treatment (no-op when the
//! payload is already set, pass-through on predicate mismatch, errors
//! propagate to the fallback machinery). Presenters and refiners are
//! sandwiched by the swallow-into-metadata policy; modifier and adapter
//! errors travel.

use crate::filter::presenter_allowed;
use crate::pipeline::{PipeValue, Step, Verb, VerbKind};
use crate::registry::{select_handler, Loaded, Runtime};
use crate::vectorize::apply_step_to_set;
use llmctx_core::{Artifact, LlmctxError, Result};
use log::debug;

/// Apply one step to the value flowing through a pipeline.
pub fn apply_step(rt: &Runtime, value: PipeValue, step: &Step) -> Result<PipeValue> {
    match value {
        PipeValue::One(att) => match step {
            Step::One(verb) => apply_verb(rt, att, verb),
            Step::Additive(verbs) => apply_additive(rt, att, verbs).map(PipeValue::One),
        },
        PipeValue::Many(set) => apply_step_to_set(rt, set, step),
        PipeValue::Adapted(value) => Ok(PipeValue::Adapted(value)),
    }
}

/// Apply an additive group: every verb runs on the same artifact, each
/// appending to its buffers.
pub fn apply_additive(rt: &Runtime, mut att: Artifact, verbs: &[Verb]) -> Result<Artifact> {
    for verb in verbs {
        match apply_verb(rt, att, verb)? {
            PipeValue::One(next) => att = next,
            _ => {
                return Err(LlmctxError::Pipeline(format!(
                    "additive step '{}' must preserve the artifact",
                    verb.name()
                )))
            }
        }
    }
    Ok(att)
}

/// Apply a single verb to a single artifact.
pub fn apply_verb(rt: &Runtime, mut att: Artifact, verb: &Verb) -> Result<PipeValue> {
    if let Some(arg) = &verb.arg {
        att.commands.set(verb.name.clone(), arg.clone());
    }

    match verb.kind {
        VerbKind::Load => apply_loader(rt, att, verb),
        VerbKind::Modify => apply_modifier(rt, att, verb).map(PipeValue::One),
        VerbKind::Present => apply_presenter(rt, att, verb).map(PipeValue::One),
        VerbKind::Refine => apply_refiner(rt, att, verb).map(PipeValue::One),
        VerbKind::Split => apply_splitter(rt, att, verb),
        VerbKind::Adapt => apply_adapter(rt, att, verb),
    }
}

fn apply_loader(rt: &Runtime, att: Artifact, verb: &Verb) -> Result<PipeValue> {
    let entry = rt
        .registries()
        .loader(&verb.name)
        .ok_or_else(|| LlmctxError::UnknownVerb(verb.name.clone()))?;

    // Already loaded: later loaders in a chain are no-ops.
    if att.payload.is_set() {
        return Ok(PipeValue::One(att));
    }
    // Predicate mismatch: pass through unchanged, enabling tolerant
    // chains.
    if !(entry.matches)(&att) {
        return Ok(PipeValue::One(att));
    }

    debug!("loader {} accepts '{}'", entry.name, att.path());
    match (entry.run)(rt, att)? {
        Loaded::One(mut loaded) => {
            loaded.push_trace(&entry.name);
            Ok(PipeValue::One(loaded))
        }
        Loaded::Many(set) => {
            let mut out = llmctx_core::ArtifactSet::default();
            for mut member in set {
                member.push_trace(&entry.name);
                out.push(member);
            }
            Ok(PipeValue::Many(out))
        }
    }
}

fn apply_modifier(rt: &Runtime, att: Artifact, verb: &Verb) -> Result<Artifact> {
    let entry = rt
        .registries()
        .modifier(&verb.name)
        .ok_or_else(|| LlmctxError::UnknownVerb(verb.name.clone()))?;

    match select_handler(&entry.handlers, &att.payload) {
        Some(handler) => {
            let mut out = (handler.run)(rt, att)?;
            out.push_trace(&entry.name);
            Ok(out)
        }
        None => Ok(att),
    }
}

fn apply_presenter(rt: &Runtime, att: Artifact, verb: &Verb) -> Result<Artifact> {
    let entry = rt
        .registries()
        .presenter(&verb.name)
        .ok_or_else(|| LlmctxError::UnknownVerb(verb.name.clone()))?;

    // The smart filter gate: wrong modality or format for this
    // artifact means the presenter silently steps aside.
    if !presenter_allowed(rt, &att, entry) {
        debug!("presenter {} gated off for '{}'", entry.name, att.path());
        return Ok(att);
    }

    let Some(handler) = select_handler(&entry.handlers, &att.payload) else {
        return Ok(att);
    };

    // Presenter failures are swallowed into metadata; the artifact
    // keeps its structure.
    let backup = att.clone();
    match (handler.run)(rt, att) {
        Ok(mut out) => {
            out.push_trace(&entry.name);
            Ok(out)
        }
        Err(e) => {
            let mut out = backup;
            out.record_error(&entry.name, e.to_string());
            Ok(out)
        }
    }
}

fn apply_refiner(rt: &Runtime, att: Artifact, verb: &Verb) -> Result<Artifact> {
    let entry = rt
        .registries()
        .refiner(&verb.name)
        .ok_or_else(|| LlmctxError::UnknownVerb(verb.name.clone()))?;

    let backup = att.clone();
    match (entry.run)(rt, att) {
        Ok(mut out) => {
            out.push_trace(&entry.name);
            Ok(out)
        }
        Err(e) => {
            let mut out = backup;
            out.record_error(&entry.name, e.to_string());
            Ok(out)
        }
    }
}

fn apply_splitter(rt: &Runtime, att: Artifact, verb: &Verb) -> Result<PipeValue> {
    let entry = rt
        .registries()
        .splitter(&verb.name)
        .ok_or_else(|| LlmctxError::UnknownVerb(verb.name.clone()))?;

    let set = (entry.run)(rt, att)?;
    let mut out = llmctx_core::ArtifactSet::default();
    for mut chunk in set {
        chunk.push_trace(&entry.name);
        out.push(chunk);
    }
    Ok(PipeValue::Many(out))
}

fn apply_adapter(rt: &Runtime, att: Artifact, verb: &Verb) -> Result<PipeValue> {
    let entry = rt
        .registries()
        .adapter(&verb.name)
        .ok_or_else(|| LlmctxError::UnknownVerb(verb.name.clone()))?;

    // Adapters do not catch: a malformed artifact at adapter time is a
    // caller-side bug.
    let value = (entry.run)(rt, &att, &verb.params)?;
    Ok(PipeValue::Adapted(value))
}
