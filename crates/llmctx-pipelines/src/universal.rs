//! The universal fallback pipeline.
//!
//! Runs when no primary processor claims an input: a tolerant loader
//! chain, a best-effort text read, and finally a readable error. Loaded
//! artifacts get the smart text presenter, images and metadata
//! additively, a header, and a truncation pass for very long text.

use llmctx_core::{Artifact, Payload, Result};
use llmctx_engine::{load, present, refine, PipeValue, Pipeline, Runtime, Verb};
use log::debug;

/// Text length above which the universal pipeline truncates to 3000.
const TRUNCATE_THRESHOLD: usize = 5000;

/// Pick the text presenter the `format` command prefers, falling back
/// to markdown when the preferred one cannot present this payload.
pub fn smart_text_presenter(rt: &Runtime, att: &Artifact) -> Verb {
    let preferred = att.commands.format().preferred_presenter().to_string();
    let usable = rt
        .registries()
        .presenter(&preferred)
        .is_some_and(|entry| entry.handles(&att.payload));
    if usable {
        present(&preferred)
    } else {
        present("markdown")
    }
}

/// The tolerant loader chain, most specific loaders first.
fn loader_chain() -> Pipeline {
    Pipeline::new()
        .then(load("git_repo_structure"))
        .then(load("directory_structure"))
        .then(load("pdf_document"))
        .then(load("csv_table"))
        .then(load("image_file"))
        .then(load("html_file"))
        .then(load("url_page"))
        .then(load("url_download"))
        .then(load("text_file"))
        .then(load("archive_images"))
}

/// Best-effort terminal state: raw text when the path is readable, a
/// readable error line otherwise.
fn best_effort(att: &Artifact, error: Option<String>) -> Artifact {
    let mut fallback = att.clone();
    match std::fs::read_to_string(att.path()) {
        Ok(content) => {
            // The text presenter renders the payload; setting `text`
            // here would present the content twice.
            fallback.set_payload(Payload::Text(content));
        }
        Err(_) => {
            fallback.text = format!("Could not read file: {}", att.path());
        }
    }
    if let Some(error) = error {
        fallback.set_meta("load_error", error);
    }
    fallback
}

/// Run the universal fallback pipeline on one artifact.
pub fn universal(rt: &Runtime, att: Artifact) -> Result<PipeValue> {
    let loaded = match loader_chain().run(rt, att.clone()) {
        Ok(PipeValue::One(loaded)) if !loaded.payload.is_set() => {
            debug!("no loader matched '{}', best-effort read", att.path());
            PipeValue::One(best_effort(&loaded, None))
        }
        Ok(value) => value,
        Err(e) => {
            debug!("loader chain failed on '{}': {e}", att.path());
            PipeValue::One(best_effort(&att, Some(e.to_string())))
        }
    };

    match loaded {
        PipeValue::Many(set) => Pipeline::new()
            .then(present("images").also(present("metadata")))
            .then(refine("add_headers"))
            .run(rt, set),
        PipeValue::One(loaded) => {
            if let Payload::Structure(_) = &loaded.payload {
                let presenter = match loaded.commands.mode() {
                    "structure" => present("structure"),
                    "metadata" => present("metadata"),
                    _ => present("files"),
                };
                return Pipeline::new().then(presenter).run(rt, loaded);
            }

            let text_verb = smart_text_presenter(rt, &loaded);
            let presented = Pipeline::new()
                .then(text_verb.also(present("images")).also(present("metadata")))
                .then(refine("add_headers"))
                .run(rt, loaded)?;

            match presented {
                PipeValue::One(att) if att.text.len() > TRUNCATE_THRESHOLD => {
                    Pipeline::new().then(refine("truncate").with("3000")).run(rt, att)
                }
                other => Ok(other),
            }
        }
        adapted @ PipeValue::Adapted(_) => Ok(adapted),
    }
}
