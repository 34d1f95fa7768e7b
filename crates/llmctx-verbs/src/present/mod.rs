//! Presenters: append text and images from the payload.
//!
//! Presenters never delete existing content; they only append. A
//! presenter that fails leaves the artifact structurally unchanged —
//! the dispatch layer records the failure under `<name>_error`.

pub mod render;

use crate::encode::{bytes_base64, png_base64};
use llmctx_core::collab::ScreenshotRequest;
use llmctx_core::{Artifact, LlmctxError, Payload, Result, StructureKind};
use llmctx_engine::Runtime;
use serde_json::Value;
use std::time::Duration;

/// Hard timeout for office-to-PDF conversions.
const OFFICE_TIMEOUT: Duration = Duration::from_secs(60);

/// Pages selected by the `pages` modifier (1-based), else every page.
fn selected_pages(att: &Artifact, total: usize) -> Vec<usize> {
    att.metadata
        .get("selected_pages")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_u64)
                .map(|n| n as usize)
                .filter(|n| (1..=total).contains(n))
                .collect()
        })
        .unwrap_or_else(|| (1..=total).collect())
}

/// Slides selected by the `pages` modifier (0-based), else every slide.
fn selected_slides(att: &Artifact, total: usize) -> Vec<usize> {
    att.metadata
        .get("selected_slides")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_u64)
                .map(|n| n as usize)
                .filter(|n| *n < total)
                .collect()
        })
        .unwrap_or_else(|| (0..total).collect())
}

/// Sheets selected by the `pages` modifier (1-based), else every sheet.
fn selected_sheets(att: &Artifact, total: usize) -> Vec<usize> {
    att.metadata
        .get("selected_sheets")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_u64)
                .map(|n| n as usize)
                .filter(|n| (1..=total).contains(n))
                .collect()
        })
        .unwrap_or_else(|| (1..=total).collect())
}

/// Record the scanned-document heuristic over the processed pages.
///
/// A document is likely scanned when fewer than 30% of processed pages
/// have any text, when the average text per page is under 50 chars, or
/// when no page has text at all. Quality: `< 20` poor, `< 50` limited,
/// else good.
fn record_extraction_stats(att: &mut Artifact, page_texts: &[&str]) {
    let total = page_texts.len();
    let with_text = page_texts.iter().filter(|t| !t.trim().is_empty()).count();
    let total_chars: usize = page_texts.iter().map(|t| t.trim().len()).sum();
    let avg = if total > 0 {
        total_chars as f64 / total as f64
    } else {
        0.0
    };
    let quality = if avg < 20.0 {
        "poor"
    } else if avg < 50.0 {
        "limited"
    } else {
        "good"
    };
    let likely_scanned =
        total > 0 && (with_text == 0 || (with_text as f64) < 0.3 * total as f64 || avg < 50.0);

    att.set_meta("is_likely_scanned", likely_scanned);
    att.set_meta("pages_with_text", with_text);
    att.set_meta("total_pages", total);
    att.set_meta("avg_text_per_page", avg);
    att.set_meta("text_extraction_quality", quality);
}

// --- text presenters ----------------------------------------------------

/// Plain text from a PDF, one `[Page N]` block per processed page.
pub fn text_pdf(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Pdf(pdf) = &att.payload else {
        return Ok(att);
    };
    let pages = selected_pages(&att, pdf.page_count());
    let header = format!("PDF Document: {}", att.path());
    let mut body = format!("{header}\n{}\n\n", "=".repeat(header.len()));
    let mut processed: Vec<String> = Vec::new();
    for page in &pages {
        let text = &pdf.pages[page - 1];
        body.push_str(&format!("[Page {page}]\n{text}\n\n"));
        processed.push(text.clone());
    }
    att.append_text(&body);
    let refs: Vec<&str> = processed.iter().map(String::as_str).collect();
    record_extraction_stats(&mut att, &refs);
    Ok(att)
}

/// Plain text from a table.
pub fn text_tabular(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Tabular(table) = &att.payload else {
        return Ok(att);
    };
    let header = format!("Data from {}", att.path());
    let body = format!(
        "{header}\n{}\n\n{}\nShape: {:?}\n\n",
        "=".repeat(header.len()),
        render::plain_table(&table.headers, &table.rows),
        table.shape()
    );
    att.append_text(&body);
    Ok(att)
}

/// Plain paragraphs from a Word document.
pub fn text_docx(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Docx(doc) = &att.payload else {
        return Ok(att);
    };
    let body: String = doc
        .paragraphs
        .iter()
        .filter(|p| !p.text.trim().is_empty())
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    att.append_text(&format!("{body}\n\n"));
    Ok(att)
}

/// Shape text per slide.
pub fn text_pptx(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Pptx(deck) = &att.payload else {
        return Ok(att);
    };
    let slides = selected_slides(&att, deck.slides.len());
    let mut body = String::new();
    for index in slides {
        body.push_str(&format!("Slide {}:\n", index + 1));
        for text in &deck.slides[index].texts {
            body.push_str(text);
            body.push('\n');
        }
        body.push('\n');
    }
    att.append_text(&body);
    Ok(att)
}

/// Per-sheet dimensions plus a 5×5 preview.
pub fn text_xlsx(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Xlsx(workbook) = &att.payload else {
        return Ok(att);
    };
    let sheets = selected_sheets(&att, workbook.sheets.len());
    let mut body = String::new();
    for number in sheets {
        let sheet = &workbook.sheets[number - 1];
        let (rows, cols) = sheet.dimensions();
        body.push_str(&format!("Sheet: {} ({rows} rows x {cols} cols)\n", sheet.name));
        for row in sheet.rows.iter().take(5) {
            let preview: Vec<&str> = row.iter().take(5).map(String::as_str).collect();
            body.push_str(&preview.join(" | "));
            body.push('\n');
        }
        body.push('\n');
    }
    att.append_text(&body);
    Ok(att)
}

/// Whole-document text from HTML.
pub fn text_html(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Html(dom) = &att.payload else {
        return Ok(att);
    };
    let body = render::html_to_text(&dom.html);
    att.append_text(&format!("{body}\n\n"));
    Ok(att)
}

/// Text-blob payload: the content itself.
pub fn text_blob(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Text(content) = &att.payload else {
        return Ok(att);
    };
    let body = format!("{content}\n\n");
    att.append_text(&body);
    Ok(att)
}

/// Fallback text presenter so the user always gets something readable.
pub fn text_fallback(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let body = format!("{}: {} payload\n\n", att.path(), att.payload.type_name());
    att.append_text(&body);
    Ok(att)
}

// --- markdown presenters ------------------------------------------------

/// Markdown from a PDF: `## Page N` per processed page plus the
/// scanned-document stats.
pub fn markdown_pdf(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Pdf(pdf) = &att.payload else {
        return Ok(att);
    };
    let pages = selected_pages(&att, pdf.page_count());
    let mut body = format!("# PDF Document: {}\n\n", att.path());
    let mut processed: Vec<String> = Vec::new();
    for page in &pages {
        let text = &pdf.pages[page - 1];
        body.push_str(&format!("## Page {page}\n\n{text}\n\n"));
        processed.push(text.clone());
    }
    body.push_str(&format!("*Total pages processed: {}*\n\n", pages.len()));
    att.append_text(&body);
    let refs: Vec<&str> = processed.iter().map(String::as_str).collect();
    record_extraction_stats(&mut att, &refs);
    Ok(att)
}

/// Markdown table from a tabular payload.
pub fn markdown_tabular(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Tabular(table) = &att.payload else {
        return Ok(att);
    };
    let body = format!(
        "## Data from {}\n\n{}\n*Shape: {:?}*\n\n",
        att.path(),
        render::markdown_table(&table.headers, &table.rows),
        table.shape()
    );
    att.append_text(&body);
    Ok(att)
}

/// Markdown from a Word document with `Heading N` promotion (clamped
/// to six levels).
pub fn markdown_docx(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Docx(doc) = &att.payload else {
        return Ok(att);
    };
    let mut body = String::new();
    for paragraph in &doc.paragraphs {
        let text = paragraph.text.trim();
        if text.is_empty() {
            continue;
        }
        match paragraph.style.as_deref().and_then(render::heading_level) {
            Some(level) => {
                let depth = (level + 1).min(6);
                body.push_str(&format!("{} {text}\n\n", "#".repeat(depth)));
            }
            None => body.push_str(&format!("{text}\n\n")),
        }
    }
    att.append_text(&body);
    Ok(att)
}

/// Markdown from a deck: `## Slide N` headings with shape text.
pub fn markdown_pptx(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Pptx(deck) = &att.payload else {
        return Ok(att);
    };
    let slides = selected_slides(&att, deck.slides.len());
    let mut body = format!("# Presentation: {}\n\n", att.path());
    for index in &slides {
        body.push_str(&format!("## Slide {}\n\n", index + 1));
        for text in &deck.slides[*index].texts {
            body.push_str(&format!("{text}\n\n"));
        }
    }
    body.push_str(&format!("*Slides processed: {}*\n\n", slides.len()));
    att.append_text(&body);
    Ok(att)
}

/// Markdown from a workbook: a table preview per sheet.
pub fn markdown_xlsx(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Xlsx(workbook) = &att.payload else {
        return Ok(att);
    };
    let sheets = selected_sheets(&att, workbook.sheets.len());
    let mut body = format!("# Workbook: {}\n\n", att.path());
    for number in sheets {
        let sheet = &workbook.sheets[number - 1];
        let (rows, cols) = sheet.dimensions();
        body.push_str(&format!("## Sheet: {} ({rows} rows x {cols} cols)\n\n", sheet.name));
        let preview: Vec<Vec<String>> = sheet
            .rows
            .iter()
            .take(10)
            .map(|row| row.iter().take(10).cloned().collect())
            .collect();
        if let Some((first, rest)) = preview.split_first() {
            body.push_str(&render::markdown_table(first, rest));
        }
        body.push('\n');
    }
    att.append_text(&body);
    Ok(att)
}

/// Markdown metadata card for a single image.
pub fn markdown_image(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Image(data) = &att.payload else {
        return Ok(att);
    };
    let (w, h) = data.size();
    let body = format!(
        "# Image: {}\n\n- **Format**: {}\n- **Size**: {w}x{h}\n- **Mode**: {}\n\n\
         *Image converted to base64 and available in images list*\n\n",
        att.path(),
        data.format.as_deref().unwrap_or("Unknown"),
        data.mode()
    );
    att.append_text(&body);
    Ok(att)
}

/// Markdown from HTML via structural extraction.
pub fn markdown_html(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Html(dom) = &att.payload else {
        return Ok(att);
    };
    let body = render::html_to_markdown(&dom.html);
    att.append_text(&format!("{body}\n\n"));
    Ok(att)
}

/// Markdown for a text blob.
pub fn markdown_blob(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Text(content) = &att.payload else {
        return Ok(att);
    };
    let body = format!("# {}\n\n{content}\n\n", att.path());
    att.append_text(&body);
    Ok(att)
}

/// Fallback markdown presenter.
pub fn markdown_fallback(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let body = format!(
        "# {}\n\n*{} payload*\n\n",
        att.path(),
        att.payload.type_name()
    );
    att.append_text(&body);
    Ok(att)
}

// --- image presenters ---------------------------------------------------

/// PNG base64 from a decoded image (alpha flattened to RGB).
pub fn images_image(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Image(data) = &att.payload else {
        return Ok(att);
    };
    let encoded = png_base64(&data.image)?;
    att.append_image(encoded);
    Ok(att)
}

/// Rendered PDF pages at 2× scale through the rasterizer collaborator.
pub fn images_pdf(rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let rendered = {
        let Payload::Pdf(pdf) = &att.payload else {
            return Ok(att);
        };
        let rasterizer = rt.rasterizer().ok_or_else(|| {
            LlmctxError::collaborator("rasterizer", "no PDF rasterizer bound")
        })?;
        let pages = selected_pages(&att, pdf.page_count());
        let mut rendered = Vec::with_capacity(pages.len());
        for page in pages {
            let png = rasterizer.render_png(&pdf.raw, page - 1, 2.0)?;
            rendered.push(bytes_base64(&png));
        }
        (rendered, pdf.page_count())
    };
    let (images, total) = rendered;
    att.set_meta("pdf_pages_rendered", images.len());
    att.set_meta("pdf_total_pages", total);
    for image in images {
        att.append_image(image);
    }
    Ok(att)
}

/// Office documents render to images by converting to PDF first.
fn office_images(rt: &Runtime, att: &mut Artifact, source: std::path::PathBuf) -> Result<()> {
    let office = rt
        .office()
        .ok_or_else(|| LlmctxError::collaborator("office", "no office converter bound"))?;
    let rasterizer = rt
        .rasterizer()
        .ok_or_else(|| LlmctxError::collaborator("rasterizer", "no PDF rasterizer bound"))?;

    let workdir = tempfile::tempdir().map_err(LlmctxError::Io)?;
    let pdf_path = office.to_pdf(&source, workdir.path(), OFFICE_TIMEOUT)?;
    let raw = std::fs::read(&pdf_path)?;
    let total = lopdf::Document::load_mem(&raw)
        .map_err(|e| LlmctxError::Parser(anyhow::anyhow!("converted PDF unreadable: {e}")))?
        .get_pages()
        .len();

    for index in 0..total {
        let png = rasterizer.render_png(&raw, index, 2.0)?;
        att.append_image(bytes_base64(&png));
    }
    att.set_meta("pdf_pages_rendered", total);
    att.set_meta("pdf_total_pages", total);
    Ok(())
}

/// Word document images via office conversion.
pub fn images_docx(rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Docx(doc) = &att.payload else {
        return Ok(att);
    };
    let source = doc.source.clone();
    office_images(rt, &mut att, source)?;
    Ok(att)
}

/// Deck images via office conversion.
pub fn images_pptx(rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Pptx(deck) = &att.payload else {
        return Ok(att);
    };
    let source = deck.source.clone();
    office_images(rt, &mut att, source)?;
    Ok(att)
}

/// Workbook images via office conversion.
pub fn images_xlsx(rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Xlsx(workbook) = &att.payload else {
        return Ok(att);
    };
    let source = workbook.source.clone();
    office_images(rt, &mut att, source)?;
    Ok(att)
}

/// Fallback images presenter: nothing to add.
pub fn images_fallback(_rt: &Runtime, att: Artifact) -> Result<Artifact> {
    Ok(att)
}

// --- structural presenters ---------------------------------------------

/// CSV rendition of a table.
pub fn csv_tabular(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Tabular(table) = &att.payload else {
        return Ok(att);
    };
    let mut writer = csv::Writer::from_writer(Vec::new());
    if !table.headers.is_empty() {
        writer
            .write_record(&table.headers)
            .map_err(|e| LlmctxError::Parser(anyhow::anyhow!(e)))?;
    }
    for row in &table.rows {
        writer
            .write_record(row)
            .map_err(|e| LlmctxError::Parser(anyhow::anyhow!(e)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| LlmctxError::Parser(anyhow::anyhow!(e.to_string())))?;
    let body = String::from_utf8_lossy(&bytes).into_owned();
    att.append_text(&body);
    Ok(att)
}

/// XML rendition of a table.
pub fn xml_tabular(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Tabular(table) = &att.payload else {
        return Ok(att);
    };
    let escape = |s: &str| {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    };
    let mut body = String::from("<table>\n");
    for row in &table.rows {
        body.push_str("  <row>\n");
        for (index, cell) in row.iter().enumerate() {
            let name = table
                .headers
                .get(index)
                .map(|h| h.replace(' ', "_"))
                .unwrap_or_else(|| format!("col{index}"));
            body.push_str(&format!("    <{name}>{}</{name}>\n", escape(cell)));
        }
        body.push_str("  </row>\n");
    }
    body.push_str("</table>\n\n");
    att.append_text(&body);
    Ok(att)
}

/// Raw XML members of a Word document, line-limited.
pub fn xml_docx(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Docx(doc) = &att.payload else {
        return Ok(att);
    };
    let mut body = format!("# Document XML: {}\n\n", att.path());
    let mut section = |title: &str, xml: &str| {
        body.push_str(&format!(
            "## {title}\n\n```xml\n{}\n```\n\n",
            render::limit_lines(&pretty_xml(xml), 150)
        ));
    };
    section("document.xml", &doc.document_xml);
    if let Some(styles) = &doc.styles_xml {
        section("styles.xml", styles);
    }
    if let Some(core) = &doc.core_xml {
        section("core.xml", core);
    }
    att.append_text(&body);
    Ok(att)
}

/// Raw slide XML (line-limited per slide) plus presentation.xml.
pub fn xml_pptx(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Pptx(deck) = &att.payload else {
        return Ok(att);
    };
    let slides = selected_slides(&att, deck.slides.len());
    let mut body = format!("# Presentation XML: {}\n\n", att.path());
    for index in slides {
        body.push_str(&format!(
            "## Slide {}\n\n```xml\n{}\n```\n\n",
            index + 1,
            render::limit_lines(&pretty_xml(&deck.slides[index].xml), 100)
        ));
    }
    if let Some(presentation) = &deck.presentation_xml {
        body.push_str(&format!(
            "## presentation.xml\n\n```xml\n{}\n```\n\n",
            render::limit_lines(&pretty_xml(presentation), 100)
        ));
    }
    att.append_text(&body);
    Ok(att)
}

fn pretty_xml(xml: &str) -> String {
    xml.replace("><", ">\n<")
}

/// HTML source rendition (line-limited).
pub fn html_html(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Html(dom) = &att.payload else {
        return Ok(att);
    };
    let body = format!(
        "## HTML Source: {}\n\n```html\n{}\n```\n\n",
        att.path(),
        render::limit_lines(&dom.html, 200)
    );
    att.append_text(&body);
    Ok(att)
}

/// HTML table rendition of a tabular payload.
pub fn html_tabular(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Tabular(table) = &att.payload else {
        return Ok(att);
    };
    let mut body = String::from("<table>\n");
    if !table.headers.is_empty() {
        body.push_str("  <tr>");
        for header in &table.headers {
            body.push_str(&format!("<th>{header}</th>"));
        }
        body.push_str("</tr>\n");
    }
    for row in &table.rows {
        body.push_str("  <tr>");
        for cell in row {
            body.push_str(&format!("<td>{cell}</td>"));
        }
        body.push_str("</tr>\n");
    }
    body.push_str("</table>\n\n");
    att.append_text(&body);
    Ok(att)
}

/// Summary statistics for a table.
pub fn summary_tabular(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Tabular(table) = &att.payload else {
        return Ok(att);
    };
    let (rows, cols) = table.shape();
    let numeric: Vec<&str> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(index, _)| {
            table
                .rows
                .iter()
                .filter_map(|row| row.get(*index))
                .all(|cell| cell.trim().is_empty() || cell.trim().parse::<f64>().is_ok())
        })
        .map(|(_, header)| header.as_str())
        .collect();
    let body = format!(
        "\n## Summary Statistics\n\n- **Rows**: {rows}\n- **Columns**: {cols}\n- \
         **Numeric Columns**: {numeric:?}\n\n"
    );
    att.append_text(&body);
    Ok(att)
}

/// First-rows preview for a table.
pub fn head_tabular(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Tabular(table) = &att.payload else {
        return Ok(att);
    };
    let preview: Vec<Vec<String>> = table.rows.iter().take(5).cloned().collect();
    let body = format!(
        "\n## Data Preview\n\n{}\n",
        render::markdown_table(&table.headers, &preview)
    );
    att.append_text(&body);
    Ok(att)
}

// --- metadata presenters ------------------------------------------------

/// PDF document information dictionary.
pub fn metadata_pdf(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Pdf(pdf) = &att.payload else {
        return Ok(att);
    };
    let mut body = String::from("\n## Document Metadata\n\n");
    if pdf.info.is_empty() {
        body.push_str("*No metadata available*\n");
    } else {
        for (key, value) in &pdf.info {
            body.push_str(&format!("- **{key}**: {value}\n"));
        }
    }
    body.push('\n');
    att.append_text(&body);
    Ok(att)
}

/// Image format/size/mode card.
pub fn metadata_image(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Image(data) = &att.payload else {
        return Ok(att);
    };
    let (w, h) = data.size();
    let body = format!(
        "\n## Image Metadata\n\n- **Format**: {}\n- **Size**: {w}x{h}\n- **Mode**: {}\n\n",
        data.format.as_deref().unwrap_or("Unknown"),
        data.mode()
    );
    att.append_text(&body);
    Ok(att)
}

/// Structure record info: tree plus repo/dir facts.
pub fn metadata_structure(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Structure(record) = &att.payload else {
        return Ok(att);
    };
    let kind_title = match record.kind {
        StructureKind::GitRepository => "Repository",
        StructureKind::Directory => "Directory",
    };
    let mut body = format!("# {kind_title} Metadata: {}\n\n", record.root.display());
    for (key, value) in &record.info {
        body.push_str(&format!("- **{key}**: {value}\n"));
    }
    body.push_str(&format!(
        "\n```\n{}```\n\n",
        render::render_tree(&record.tree)
    ));
    att.append_text(&body);
    Ok(att)
}

/// Fallback metadata presenter: the artifact's own accumulated
/// metadata, rendered as bullets. Pure with respect to the payload, so
/// applying it twice adds the same text twice but changes nothing else.
pub fn metadata_fallback(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    if att.metadata.is_empty() {
        return Ok(att);
    }
    let mut body = String::from("\n## Metadata\n\n");
    for (key, value) in &att.metadata {
        body.push_str(&format!("- **{key}**: {value}\n"));
    }
    body.push('\n');
    att.append_text(&body);
    Ok(att)
}

// --- directory presenters -----------------------------------------------

/// Tree view of a structure record.
pub fn structure_structure(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Payload::Structure(record) = &att.payload else {
        return Ok(att);
    };
    let body = format!(
        "# Directory Structure: {}\n\n```\n{}```\n\n",
        record.root.display(),
        render::render_tree(&record.tree)
    );
    att.append_text(&body);
    Ok(att)
}

/// Directory map marking the artifact for expansion by the
/// orchestrator (`files` mode).
pub fn files_structure(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let map = {
        let Payload::Structure(record) = &att.payload else {
            return Ok(att);
        };
        let mut map = format!(
            "# Directory Map: {}\n\n```\n{}```\n\n{} file(s) selected for processing.\n",
            record.root.display(),
            render::render_tree(&record.tree),
            record.files.len()
        );
        if !record.files.is_empty() {
            map.push('\n');
            for file in &record.files {
                map.push_str(&format!("- {}\n", file.display()));
            }
        }
        map
    };
    att.append_text(&map);
    att.set_meta("directory_map", map.clone());
    att.set_meta("expand_files", true);
    Ok(att)
}

// --- OCR ----------------------------------------------------------------

/// OCR over rendered PDF pages. The pipeline gates this presenter on
/// the `ocr` policy; the presenter itself just runs the engine.
pub fn ocr_pdf(rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let (texts, processed) = {
        let Payload::Pdf(pdf) = &att.payload else {
            return Ok(att);
        };
        let ocr = rt
            .ocr()
            .ok_or_else(|| LlmctxError::collaborator("ocr", "no OCR engine bound"))?;
        let rasterizer = rt.rasterizer().ok_or_else(|| {
            LlmctxError::collaborator("rasterizer", "no PDF rasterizer bound")
        })?;
        let pages = selected_pages(&att, pdf.page_count());
        let mut texts = Vec::new();
        for page in &pages {
            let png = rasterizer.render_png(&pdf.raw, page - 1, 2.0)?;
            match ocr.image_to_string(&png, "eng") {
                Ok(text) => texts.push((*page, Some(text))),
                Err(_) => texts.push((*page, None)),
            }
        }
        (texts, pages.len())
    };

    let successful = texts.iter().filter(|(_, t)| t.is_some()).count();
    let mut body = String::from("\n## OCR Text\n\n");
    for (page, text) in &texts {
        if let Some(text) = text {
            body.push_str(&format!("### Page {page} (OCR)\n\n{text}\n\n"));
        }
    }
    att.append_text(&body);
    att.set_meta("ocr_performed", true);
    att.set_meta("ocr_pages_processed", processed);
    att.set_meta("ocr_pages_successful", successful);
    Ok(att)
}

// --- screenshot ---------------------------------------------------------

/// Full-page (or viewport) screenshot of a URL-backed HTML payload,
/// honoring `viewport`, `wait`, `fullpage` and `select` highlighting.
pub fn screenshot_html(rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let request = {
        let Payload::Html(dom) = &att.payload else {
            return Ok(att);
        };
        let url = dom.base_url.clone().ok_or_else(|| {
            LlmctxError::collaborator("screenshot", "page has no URL to render")
        })?;
        ScreenshotRequest {
            url,
            viewport: att.commands.viewport(),
            wait_ms: att.commands.wait_ms(),
            full_page: att.commands.fullpage(),
            highlight_selector: att.commands.get("select").map(str::to_string),
        }
    };
    let browser = rt
        .browser()
        .ok_or_else(|| LlmctxError::collaborator("screenshot", "no headless browser bound"))?;
    let shot = browser.screenshot(&request)?;

    att.append_image(bytes_base64(&shot.png));
    att.set_meta("screenshot_captured", true);
    att.set_meta(
        "screenshot_viewport",
        format!("{}x{}", request.viewport.0, request.viewport.1),
    );
    att.set_meta("screenshot_fullpage", request.full_page);
    att.set_meta("screenshot_wait_time", request.wait_ms);
    att.set_meta("screenshot_url", request.url.clone());
    if let Some(selector) = &request.highlight_selector {
        att.set_meta("highlighted_selector", selector.clone());
        att.set_meta("highlighted_elements", shot.highlighted_elements);
    }
    Ok(att)
}
