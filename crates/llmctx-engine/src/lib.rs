//! # llmctx-engine — the processing-graph runtime
//!
//! The registry-based, type-dispatched verb system: five verb
//! registries plus splitters and processors inside a frozen
//! [`Runtime`], the pipeline algebra (sequential, additive, fallback),
//! vectorization over artifact sets, and the smart presenter filter.
//!
//! ```rust
//! use llmctx_engine::{load, modify, present, refine, Pipeline};
//!
//! // Build-time composition is pure data; resolution happens against
//! // the frozen runtime when the pipeline runs.
//! let pipe = Pipeline::new()
//!     .then(load("pdf_document"))
//!     .then(modify("pages"))
//!     .then(present("markdown").also(present("images")))
//!     .then(refine("tile_images"))
//!     .then(refine("resize_images"));
//! assert_eq!(pipe.steps().len(), 5);
//! ```

pub mod dispatch;
pub mod filter;
pub mod pipeline;
pub mod processor;
pub mod registry;
pub mod vectorize;

pub use dispatch::{apply_step, apply_verb};
pub use filter::detect_modality;
pub use pipeline::{
    adapt, load, modify, present, refine, split, Additive, PipeInput, PipeValue, Pipeline, Step,
    Verb, VerbKind,
};
pub use processor::{run_named, run_primary};
pub use registry::{
    install_runtime, installed_runtime, AdapterParams, Loaded, Modality, Registries, Runtime,
    RuntimeBuilder, TypeKey,
};
pub use vectorize::{is_reducer, REDUCER_REFINERS};
