//! PDF processor.
//!
//! Commands consumed: `pages`, `format`, `images`, `resize_images`,
//! `tile`, `ocr`. The `ocr` policy: `true` always runs the OCR
//! presenter, `false` never, `auto` (default) runs it only when the
//! scanned-document heuristic flags poor or limited extraction.

use crate::universal::smart_text_presenter;
use llmctx_core::{Artifact, LlmctxError, Result};
use llmctx_engine::{load, modify, present, refine, PipeValue, Pipeline, Runtime};

pub fn run(rt: &Runtime, att: Artifact) -> Result<PipeValue> {
    let ocr_policy = att.commands.ocr().to_lowercase();

    let loaded = Pipeline::new()
        .then(load("pdf_document"))
        .then(modify("pages"))
        .run(rt, att)?;
    let PipeValue::One(loaded) = loaded else {
        return Err(LlmctxError::Pipeline("PDF loader produced a set".into()));
    };

    let text_verb = smart_text_presenter(rt, &loaded);
    let mut presentation = text_verb.also(present("images"));
    if ocr_policy == "true" {
        presentation = presentation.also(present("ocr"));
    }

    let processed = Pipeline::new()
        .then(presentation)
        .then(refine("tile_images"))
        .then(refine("resize_images"))
        .run(rt, loaded)?;

    // Auto mode: add OCR only for likely-scanned documents with weak
    // extraction.
    if ocr_policy != "true" && ocr_policy != "false" {
        if let PipeValue::One(att) = &processed {
            let scanned = att
                .metadata
                .get("is_likely_scanned")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            let weak = matches!(
                att.metadata
                    .get("text_extraction_quality")
                    .and_then(serde_json::Value::as_str),
                Some("poor" | "limited")
            );
            if scanned && weak {
                return Pipeline::new().then(present("ocr")).run(rt, att.clone());
            }
        }
    }
    Ok(processed)
}
