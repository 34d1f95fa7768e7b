//! Webpage processor.
//!
//! GET (10 s) → parse → optional CSS `select` subsetting → smart text
//! presenter plus screenshot. Without a browser binding the screenshot
//! presenter degrades to text-only, recording `screenshot_error`.

use crate::universal::smart_text_presenter;
use llmctx_core::{Artifact, LlmctxError, Result};
use llmctx_engine::{load, modify, present, refine, PipeValue, Pipeline, Runtime};

pub fn run(rt: &Runtime, att: Artifact) -> Result<PipeValue> {
    let loaded = Pipeline::new()
        .then(load("url_page"))
        .then(modify("select"))
        .run(rt, att)?;
    let PipeValue::One(loaded) = loaded else {
        return Err(LlmctxError::Pipeline("URL loader produced a set".into()));
    };

    let text_verb = smart_text_presenter(rt, &loaded);
    Pipeline::new()
        .then(
            text_verb
                .also(present("screenshot"))
                .also(present("metadata")),
        )
        .then(refine("add_headers"))
        .run(rt, loaded)
}
