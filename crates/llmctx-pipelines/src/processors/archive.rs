//! ZIP archive processor.
//!
//! Expands image members into an artifact set (commands inherited),
//! presents each member, and applies the resize refiner elementwise.

use llmctx_core::{Artifact, Result};
use llmctx_engine::{load, present, refine, PipeValue, Pipeline, Runtime};

pub fn run(rt: &Runtime, att: Artifact) -> Result<PipeValue> {
    Pipeline::new()
        .then(load("archive_images"))
        .then(present("images").also(present("metadata")))
        .then(refine("resize_images"))
        .run(rt, att)
}
