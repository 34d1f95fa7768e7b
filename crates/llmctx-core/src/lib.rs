//! # llmctx-core — artifact model and DSL grammar
//!
//! The data layer of llmctx: the [`Artifact`] record every pipeline
//! operates on, the ordered [`ArtifactSet`] with vectorized semantics,
//! the `[key:value]` command grammar embedded in input locators, the
//! tagged [`Payload`] variant set, and the collaborator contracts for
//! everything that needs a network, a native library, or an external
//! process.
//!
//! ```rust
//! use llmctx_core::Artifact;
//!
//! let att = Artifact::new("report.pdf[pages:1-3][format:plain]");
//! assert_eq!(att.path(), "report.pdf");
//! assert_eq!(att.commands.get("pages"), Some("1-3"));
//! ```

pub mod artifact;
pub mod collab;
pub mod commands;
pub mod error;
pub mod payload;

pub use artifact::{attach, is_placeholder_image, Artifact, ArtifactSet, ResourceScope};
pub use commands::{parse_index_spec, parse_locator, CommandMap, TextFormat};
pub use error::{LlmctxError, Result};
pub use payload::{
    DataTable, DocxFile, DocxParagraph, FileNode, HtmlDom, ImageData, Payload, PayloadKind,
    PdfFile, PptxFile, PptxSlide, SheetData, StructureKind, StructureRecord, WorkbookData,
};
