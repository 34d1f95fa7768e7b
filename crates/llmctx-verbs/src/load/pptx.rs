//! PPTX decoding: manual ZIP + XML parsing.
//!
//! Slides live in `ppt/slides/slideN.xml`, numbered from 1. Shape text
//! is the concatenation of `a:t` runs within each `p:sp` shape.

use llmctx_core::{Artifact, LlmctxError, Payload, PptxFile, PptxSlide, Result};
use llmctx_engine::Loaded;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use std::path::Path;

pub fn load(mut att: Artifact) -> Result<Loaded> {
    let path = Path::new(att.path()).to_path_buf();
    let file = std::fs::File::open(&path)
        .map_err(|e| LlmctxError::load("pptx_document", att.path(), e.to_string()))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| LlmctxError::load("pptx_document", att.path(), e.to_string()))?;

    // Collect slide members in deck order (slide1, slide2, …).
    let mut slide_names: Vec<(usize, String)> = Vec::new();
    for index in 0..archive.len() {
        let name = archive
            .by_index(index)
            .map_err(|e| LlmctxError::load("pptx_document", att.path(), e.to_string()))?
            .name()
            .to_string();
        if let Some(number) = slide_number(&name) {
            slide_names.push((number, name));
        }
    }
    slide_names.sort();

    let mut slides = Vec::new();
    for (_, name) in &slide_names {
        let Some(xml) = read_member(&mut archive, name) else {
            continue;
        };
        let texts = shape_texts(&xml);
        slides.push(PptxSlide { texts, xml });
    }
    let presentation_xml = read_member(&mut archive, "ppt/presentation.xml");

    att.set_payload(Payload::Pptx(PptxFile {
        slides,
        presentation_xml,
        source: path,
    }));
    Ok(Loaded::One(att))
}

/// `ppt/slides/slide7.xml` → `Some(7)`.
fn slide_number(member_name: &str) -> Option<usize> {
    let rest = member_name.strip_prefix("ppt/slides/slide")?;
    let digits = rest.strip_suffix(".xml")?;
    digits.parse().ok()
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

/// Per-shape text: `a:t` runs concatenated within each `p:sp`, with
/// paragraph breaks between `a:p` blocks.
fn shape_texts(slide_xml: &str) -> Vec<String> {
    let mut texts = Vec::new();
    let mut reader = Reader::from_str(slide_xml);
    let mut buf = Vec::new();

    let mut shape_depth = 0usize;
    let mut shape_text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"p:sp" => {
                    shape_depth += 1;
                    if shape_depth == 1 {
                        shape_text.clear();
                    }
                }
                b"a:p" if shape_depth > 0 && !shape_text.is_empty() => {
                    shape_text.push('\n');
                }
                b"a:t" if shape_depth > 0 => in_text_run = true,
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                if let Ok(chunk) = t.unescape() {
                    shape_text.push_str(&chunk);
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"a:t" => in_text_run = false,
                b"p:sp" => {
                    shape_depth = shape_depth.saturating_sub(1);
                    if shape_depth == 0 {
                        let trimmed = shape_text.trim();
                        if !trimmed.is_empty() {
                            texts.push(trimmed.to_string());
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    texts
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: &str = r#"<?xml version="1.0"?>
<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"
       xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
  <p:cSld><p:spTree>
    <p:sp><p:txBody><a:p><a:r><a:t>Quarterly Update</a:t></a:r></a:p></p:txBody></p:sp>
    <p:sp><p:txBody>
      <a:p><a:r><a:t>Revenue up</a:t></a:r></a:p>
      <a:p><a:r><a:t>Costs down</a:t></a:r></a:p>
    </p:txBody></p:sp>
    <p:sp><p:txBody><a:p><a:r><a:t>  </a:t></a:r></a:p></p:txBody></p:sp>
  </p:spTree></p:cSld>
</p:sld>"#;

    #[test]
    fn test_shape_texts() {
        let texts = shape_texts(SLIDE);
        assert_eq!(texts, vec!["Quarterly Update", "Revenue up\nCosts down"]);
    }

    #[test]
    fn test_slide_numbering() {
        assert_eq!(slide_number("ppt/slides/slide1.xml"), Some(1));
        assert_eq!(slide_number("ppt/slides/slide12.xml"), Some(12));
        assert_eq!(slide_number("ppt/slides/_rels/slide1.xml.rels"), None);
        assert_eq!(slide_number("ppt/presentation.xml"), None);
    }
}
