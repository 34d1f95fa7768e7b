//! Directory / repository processor.
//!
//! Loads the structure record and presents it per `mode`: a tree view
//! (`structure`), tree plus repo/dir info (`metadata`), or the
//! directory map marked for per-file expansion (`files`, the default —
//! the expansion itself is the orchestrator's job).

use llmctx_core::{Artifact, Result};
use llmctx_engine::{load, present, PipeValue, Pipeline, Runtime};

pub fn run(rt: &Runtime, att: Artifact) -> Result<PipeValue> {
    let presenter = match att.commands.mode() {
        "structure" => present("structure"),
        "metadata" => present("metadata"),
        _ => present("files"),
    };
    Pipeline::new()
        .then(load("git_repo_structure"))
        .then(load("directory_structure"))
        .then(presenter)
        .run(rt, att)
}
