//! Single-image processor.
//!
//! Modifiers `crop`, `rotate` and `resize` act only when their command
//! is present; the presenter emits PNG base64 (flattened to RGB) plus
//! a small markdown card.

use crate::universal::smart_text_presenter;
use llmctx_core::{Artifact, LlmctxError, Result};
use llmctx_engine::{load, modify, present, PipeValue, Pipeline, Runtime};

pub fn run(rt: &Runtime, att: Artifact) -> Result<PipeValue> {
    let loaded = Pipeline::new()
        .then(load("image_file"))
        .then(modify("crop"))
        .then(modify("rotate"))
        .then(modify("resize"))
        .run(rt, att)?;
    let PipeValue::One(loaded) = loaded else {
        return Err(LlmctxError::Pipeline("image loader produced a set".into()));
    };

    let text_verb = smart_text_presenter(rt, &loaded);
    Pipeline::new()
        .then(text_verb.also(present("images")))
        .run(rt, loaded)
}
