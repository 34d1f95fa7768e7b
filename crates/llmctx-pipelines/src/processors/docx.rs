//! Word document processor.
//!
//! `format` selects plain paragraphs, markdown with heading promotion
//! (default), or the raw XML members. Images go through office-to-PDF
//! conversion and degrade gracefully when the converter or rasterizer
//! is absent.

use crate::universal::smart_text_presenter;
use llmctx_core::{Artifact, LlmctxError, Result};
use llmctx_engine::{load, present, refine, PipeValue, Pipeline, Runtime};

pub fn run(rt: &Runtime, att: Artifact) -> Result<PipeValue> {
    let loaded = Pipeline::new().then(load("docx_document")).run(rt, att)?;
    let PipeValue::One(loaded) = loaded else {
        return Err(LlmctxError::Pipeline("DOCX loader produced a set".into()));
    };

    let text_verb = smart_text_presenter(rt, &loaded);
    Pipeline::new()
        .then(text_verb.also(present("images")).also(present("metadata")))
        .then(refine("resize_images"))
        .run(rt, loaded)
}
