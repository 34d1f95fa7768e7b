//! Presentation processor.
//!
//! `pages` selects 1-based slide numbers; `format` picks shape text,
//! `## Slide N` markdown (default), or raw slide XML.

use crate::universal::smart_text_presenter;
use llmctx_core::{Artifact, LlmctxError, Result};
use llmctx_engine::{load, modify, present, refine, PipeValue, Pipeline, Runtime};

pub fn run(rt: &Runtime, att: Artifact) -> Result<PipeValue> {
    let loaded = Pipeline::new()
        .then(load("pptx_document"))
        .then(modify("pages"))
        .run(rt, att)?;
    let PipeValue::One(loaded) = loaded else {
        return Err(LlmctxError::Pipeline("PPTX loader produced a set".into()));
    };

    let text_verb = smart_text_presenter(rt, &loaded);
    Pipeline::new()
        .then(text_verb.also(present("images")))
        .then(refine("resize_images"))
        .run(rt, loaded)
}
