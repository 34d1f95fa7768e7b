//! DOCX decoding: manual ZIP + XML parsing.
//!
//! A `.docx` is a ZIP archive; `word/document.xml` holds paragraphs,
//! `word/styles.xml` maps style ids to display names, and
//! `docProps/core.xml` carries document properties. Paragraph styles
//! are resolved to display names so heading promotion can match
//! `Heading N`.

use llmctx_core::{Artifact, DocxFile, DocxParagraph, LlmctxError, Payload, Result};
use llmctx_engine::Loaded;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

pub fn load(mut att: Artifact) -> Result<Loaded> {
    let path = Path::new(att.path()).to_path_buf();
    let file = std::fs::File::open(&path)
        .map_err(|e| LlmctxError::load("docx_document", att.path(), e.to_string()))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| LlmctxError::load("docx_document", att.path(), e.to_string()))?;

    let document_xml = read_member(&mut archive, "word/document.xml")
        .ok_or_else(|| LlmctxError::load("docx_document", att.path(), "no word/document.xml"))?;
    let styles_xml = read_member(&mut archive, "word/styles.xml");
    let core_xml = read_member(&mut archive, "docProps/core.xml");

    let style_names = styles_xml
        .as_deref()
        .map(parse_style_names)
        .unwrap_or_default();
    let paragraphs = parse_paragraphs(&document_xml, &style_names);

    att.set_payload(Payload::Docx(DocxFile {
        paragraphs,
        document_xml,
        styles_xml,
        core_xml,
        source: path,
    }));
    Ok(Loaded::One(att))
}

fn read_member<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> Option<String> {
    let mut member = archive.by_name(name).ok()?;
    let mut content = String::new();
    member.read_to_string(&mut content).ok()?;
    Some(content)
}

/// Map `w:styleId` → display name (`w:name/@w:val`) from styles.xml.
fn parse_style_names(styles_xml: &str) -> HashMap<String, String> {
    let mut names = HashMap::new();
    let mut reader = Reader::from_str(styles_xml);
    let mut buf = Vec::new();
    let mut current_id: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:style" => {
                current_id = attribute(&e, b"w:styleId");
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"w:style" => {
                current_id = None;
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"w:name" => {
                if let (Some(id), Some(name)) = (current_id.as_ref(), attribute(&e, b"w:val")) {
                    names.insert(id.clone(), name);
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    names
}

/// Collect paragraphs with resolved style names from document.xml.
fn parse_paragraphs(document_xml: &str, style_names: &HashMap<String, String>) -> Vec<DocxParagraph> {
    let mut paragraphs = Vec::new();
    let mut reader = Reader::from_str(document_xml);
    let mut buf = Vec::new();

    let mut in_paragraph = false;
    let mut text = String::new();
    let mut style: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => {
                    in_paragraph = true;
                    text.clear();
                    style = None;
                }
                _ => {}
            },
            Ok(Event::Empty(e)) if e.name().as_ref() == b"w:pStyle" && in_paragraph => {
                style = attribute(&e, b"w:val")
                    .map(|id| style_names.get(&id).cloned().unwrap_or(id));
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"w:br" && in_paragraph => {
                text.push('\n');
            }
            Ok(Event::Text(t)) if in_paragraph => {
                if let Ok(chunk) = t.unescape() {
                    text.push_str(&chunk);
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"w:p" => {
                in_paragraph = false;
                paragraphs.push(DocxParagraph {
                    text: text.clone(),
                    style: style.take(),
                });
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    paragraphs
}

fn attribute(element: &quick_xml::events::BytesStart<'_>, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Title</w:t></w:r></w:p>
    <w:p><w:r><w:t>First </w:t></w:r><w:r><w:t>sentence.</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    const STYLES: &str = r#"<?xml version="1.0"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="Heading 1"/></w:style>
</w:styles>"#;

    #[test]
    fn test_paragraphs_with_resolved_styles() {
        let names = parse_style_names(STYLES);
        assert_eq!(names.get("Heading1").map(String::as_str), Some("Heading 1"));

        let paragraphs = parse_paragraphs(DOCUMENT, &names);
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].text, "Title");
        assert_eq!(paragraphs[0].style.as_deref(), Some("Heading 1"));
        assert_eq!(paragraphs[1].text, "First sentence.");
        assert_eq!(paragraphs[1].style, None);
    }
}
