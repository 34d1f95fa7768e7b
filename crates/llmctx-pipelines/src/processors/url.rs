//! Generic URL processor for binary document URLs.
//!
//! Downloads to a temp file (30 s timeout), records the download
//! metadata, then delegates the temp file to whichever format
//! processor claims it (universal fallback otherwise). The temp file
//! belongs to the downloaded artifact's resource scope.

use crate::universal::universal;
use llmctx_core::{Artifact, Result};
use llmctx_engine::{run_primary, PipeValue, Runtime};
use llmctx_verbs::load::download_url_to_temp;
use log::debug;

pub fn run(rt: &Runtime, att: Artifact) -> Result<PipeValue> {
    let downloaded = download_url_to_temp(rt, &att)?;
    debug!(
        "downloaded '{}' to '{}'",
        att.path(),
        downloaded.path()
    );
    match run_primary(rt, downloaded.clone()) {
        Some(result) => result,
        None => universal(rt, downloaded),
    }
}
