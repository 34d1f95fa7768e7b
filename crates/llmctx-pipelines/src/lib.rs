//! # llmctx-pipelines — processors, fallback and the one-call API
//!
//! Assembles the standard runtime (every verb, every processor, the
//! default collaborator bindings), provides the universal fallback
//! pipeline, and exposes the high-level [`Attachments`] API.
//!
//! ```rust,no_run
//! use llmctx_pipelines::Attachments;
//!
//! # fn main() -> llmctx_core::Result<()> {
//! let ctx = Attachments::new(&["report.pdf[pages:1-3]", "photo.jpg[rotate:90]"]);
//! let text = ctx.text();
//! let images = ctx.images();
//! let messages = ctx.claude("Summarize these documents.")?;
//! # Ok(())
//! # }
//! ```

pub mod attachments;
pub mod processors;
pub mod universal;

pub use attachments::{process, Attachments};
pub use processors::register_standard_processors;
pub use universal::{smart_text_presenter, universal};

use llmctx_engine::{install_runtime, Runtime, RuntimeBuilder};
use llmctx_verbs::collab::{ReqwestClient, SofficeConverter, WordCountEstimator};
use llmctx_verbs::register_standard_verbs;
use std::sync::Arc;

/// Builder pre-loaded with the standard verbs, processors and default
/// collaborator bindings. Plugins can add their own verbs before
/// freezing.
pub fn standard_builder() -> RuntimeBuilder {
    let builder = register_standard_verbs(RuntimeBuilder::new());
    let builder = register_standard_processors(builder);
    builder
        .http(Box::new(ReqwestClient))
        .office_converter(Box::new(SofficeConverter::default()))
        .token_estimator(Box::new(WordCountEstimator))
}

/// Build a fresh standard runtime.
pub fn standard_runtime() -> Arc<Runtime> {
    Arc::new(standard_builder().build())
}

/// The process-wide runtime: installs the standard runtime on first
/// use, then serves the installed one forever.
pub fn runtime() -> Arc<Runtime> {
    if let Some(installed) = llmctx_engine::installed_runtime() {
        return installed;
    }
    install_runtime(standard_runtime())
}
