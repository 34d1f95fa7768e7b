//! The standard primary processors, one short recipe per input family.
//!
//! Discovery order matters: the first primary processor whose predicate
//! accepts an artifact wins. Binary URLs are claimed before webpages,
//! and directories after every suffix-based format.

mod archive;
mod docx;
mod image;
mod pdf;
mod pptx;
mod repo;
mod url;
mod webpage;
mod xlsx;

use llmctx_engine::RuntimeBuilder;
use llmctx_verbs::matchers;

/// Register the nine standard primary processors.
pub fn register_standard_processors(builder: RuntimeBuilder) -> RuntimeBuilder {
    builder
        .processor("PDF to LLM context", matchers::pdf_match, pdf::run)
        .processor("Word document to LLM context", matchers::docx_match, docx::run)
        .processor("Presentation to LLM context", matchers::pptx_match, pptx::run)
        .processor("Workbook to LLM context", matchers::xlsx_match, xlsx::run)
        .processor("Single image to LLM context", matchers::image_match, image::run)
        .processor("ZIP archive to image set", matchers::zip_match, archive::run)
        .processor(
            "Binary URL download and delegation",
            matchers::binary_url_match,
            url::run,
        )
        .processor("Webpage to LLM context", matchers::webpage_url_match, webpage::run)
        .processor(
            "Directory or repository to LLM context",
            matchers::directory_match,
            repo::run,
        )
}
