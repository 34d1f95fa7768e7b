//! # llmctx-verbs — the standard verb library
//!
//! Loaders, modifiers, presenters, refiners, adapters and splitters for
//! the llmctx runtime, plus the default collaborator bindings (HTTP,
//! office conversion, token estimation) and the `git`-binary metadata
//! probe. [`register_standard_verbs`] wires the whole library into a
//! [`RuntimeBuilder`].

pub mod adapt;
pub mod collab;
pub mod encode;
pub mod git;
pub mod load;
pub mod matchers;
pub mod modify;
pub mod present;
pub mod refine;
pub mod split;

use llmctx_core::PayloadKind;
use llmctx_engine::TypeKey::Kind;
use llmctx_engine::{Modality, RuntimeBuilder};

/// Register every standard verb. Loaders keep their chain-friendly
/// registration order; modifier/presenter handler order is the dispatch
/// tie-break.
pub fn register_standard_verbs(builder: RuntimeBuilder) -> RuntimeBuilder {
    builder
        // Loaders, most specific first.
        .loader("git_repo_structure", matchers::git_repo_match, load::load_structure)
        .loader("directory_structure", matchers::directory_match, load::load_structure)
        .loader("pdf_document", matchers::pdf_match, load::pdf_document)
        .loader("csv_table", matchers::csv_match, load::csv_table)
        .loader("docx_document", matchers::docx_match, load::docx_document)
        .loader("pptx_document", matchers::pptx_match, load::pptx_document)
        .loader("xlsx_workbook", matchers::xlsx_match, load::xlsx_workbook)
        .loader("image_file", matchers::image_match, load::image_file)
        .loader("html_file", matchers::html_match, load::html_file)
        .loader("url_page", matchers::webpage_url_match, load::url_page)
        .loader("url_download", matchers::binary_url_match, load::url_download)
        .loader("text_file", matchers::text_match, load::text_file)
        .loader("archive_images", matchers::zip_match, load::archive_images)
        // Modifiers.
        .modifier("pages", Some(Kind(PayloadKind::Pdf)), modify::pages_pdf)
        .modifier("pages", Some(Kind(PayloadKind::Pptx)), modify::pages_pptx)
        .modifier("pages", Some(Kind(PayloadKind::Xlsx)), modify::pages_xlsx)
        .modifier("limit", Some(Kind(PayloadKind::Tabular)), modify::limit_table)
        .modifier("select", Some(Kind(PayloadKind::Tabular)), modify::select_columns)
        .modifier("select", Some(Kind(PayloadKind::Html)), modify::select_css)
        .modifier("crop", Some(Kind(PayloadKind::Image)), modify::crop_image)
        .modifier("rotate", Some(Kind(PayloadKind::Image)), modify::rotate_image)
        .modifier("resize", Some(Kind(PayloadKind::Image)), modify::resize_image)
        // Text presenters.
        .presenter("text", Some(Kind(PayloadKind::Pdf)), present::text_pdf)
        .presenter("text", Some(Kind(PayloadKind::Tabular)), present::text_tabular)
        .presenter("text", Some(Kind(PayloadKind::Docx)), present::text_docx)
        .presenter("text", Some(Kind(PayloadKind::Pptx)), present::text_pptx)
        .presenter("text", Some(Kind(PayloadKind::Xlsx)), present::text_xlsx)
        .presenter("text", Some(Kind(PayloadKind::Html)), present::text_html)
        .presenter("text", Some(Kind(PayloadKind::Text)), present::text_blob)
        .presenter("text", None, present::text_fallback)
        .presenter("markdown", Some(Kind(PayloadKind::Pdf)), present::markdown_pdf)
        .presenter("markdown", Some(Kind(PayloadKind::Tabular)), present::markdown_tabular)
        .presenter("markdown", Some(Kind(PayloadKind::Docx)), present::markdown_docx)
        .presenter("markdown", Some(Kind(PayloadKind::Pptx)), present::markdown_pptx)
        .presenter("markdown", Some(Kind(PayloadKind::Xlsx)), present::markdown_xlsx)
        .presenter("markdown", Some(Kind(PayloadKind::Image)), present::markdown_image)
        .presenter("markdown", Some(Kind(PayloadKind::Html)), present::markdown_html)
        .presenter("markdown", Some(Kind(PayloadKind::Text)), present::markdown_blob)
        .presenter("markdown", None, present::markdown_fallback)
        // Image presenters.
        .presenter("images", Some(Kind(PayloadKind::Image)), present::images_image)
        .presenter("images", Some(Kind(PayloadKind::Pdf)), present::images_pdf)
        .presenter("images", Some(Kind(PayloadKind::Docx)), present::images_docx)
        .presenter("images", Some(Kind(PayloadKind::Pptx)), present::images_pptx)
        .presenter("images", Some(Kind(PayloadKind::Xlsx)), present::images_xlsx)
        .presenter("images", None, present::images_fallback)
        .presenter("screenshot", Some(Kind(PayloadKind::Html)), present::screenshot_html)
        // Structural presenters.
        .presenter("csv", Some(Kind(PayloadKind::Tabular)), present::csv_tabular)
        .presenter("xml", Some(Kind(PayloadKind::Tabular)), present::xml_tabular)
        .presenter("xml", Some(Kind(PayloadKind::Docx)), present::xml_docx)
        .presenter("xml", Some(Kind(PayloadKind::Pptx)), present::xml_pptx)
        .presenter("html", Some(Kind(PayloadKind::Html)), present::html_html)
        .presenter("html", Some(Kind(PayloadKind::Tabular)), present::html_tabular)
        .presenter("summary", Some(Kind(PayloadKind::Tabular)), present::summary_tabular)
        .presenter("head", Some(Kind(PayloadKind::Tabular)), present::head_tabular)
        .presenter("metadata", Some(Kind(PayloadKind::Pdf)), present::metadata_pdf)
        .presenter("metadata", Some(Kind(PayloadKind::Image)), present::metadata_image)
        .presenter("metadata", Some(Kind(PayloadKind::Structure)), present::metadata_structure)
        .presenter("metadata", None, present::metadata_fallback)
        .presenter("ocr", Some(Kind(PayloadKind::Pdf)), present::ocr_pdf)
        .presenter("structure", Some(Kind(PayloadKind::Structure)), present::structure_structure)
        .presenter("files", Some(Kind(PayloadKind::Structure)), present::files_structure)
        .presenter_modality("files", Modality::Text)
        // Refiners.
        .refiner("truncate", refine::truncate)
        .refiner("add_headers", refine::add_headers)
        .refiner("format_tables", refine::format_tables)
        .refiner("tile_images", refine::tile_images)
        .refiner("resize_images", refine::resize_images)
        .refiner("combine_images", refine::combine_images)
        .refiner("merge_text", refine::merge_text)
        // Adapters.
        .adapter("claude", adapt::claude)
        .adapter("openai_chat", adapt::openai_chat)
        .adapter("openai_response", adapt::openai_response)
        // Splitters.
        .splitter("paragraphs", split::paragraphs)
        .splitter("sentences", split::sentences)
        .splitter("characters", split::characters)
        .splitter("tokens", split::tokens)
        .splitter("custom", split::custom)
}
