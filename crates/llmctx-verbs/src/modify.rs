//! Modifiers: reshape the payload or record selections for presenters.

use image::GenericImageView as _;
use llmctx_core::{
    parse_index_spec, Artifact, DataTable, HtmlDom, LlmctxError, Payload, Result,
};
use llmctx_engine::Runtime;
use scraper::{Html, Selector};
use serde_json::Value;

/// Page selection for PDFs: records 1-based `selected_pages` metadata
/// honoring `a,b,c`, `start-end` ranges and `-1` (last page).
pub fn pages_pdf(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Some(spec) = att.commands.get("pages").map(str::to_string) else {
        return Ok(att);
    };
    let Payload::Pdf(pdf) = &att.payload else {
        return Ok(att);
    };
    let selected = parse_index_spec("pages", &spec, pdf.page_count())?;
    att.set_meta(
        "selected_pages",
        Value::Array(selected.into_iter().map(Value::from).collect()),
    );
    Ok(att)
}

/// Slide selection for decks: the spec is 1-based, the recorded
/// `selected_slides` indices are 0-based.
pub fn pages_pptx(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Some(spec) = att.commands.get("pages").map(str::to_string) else {
        return Ok(att);
    };
    let Payload::Pptx(deck) = &att.payload else {
        return Ok(att);
    };
    let selected = parse_index_spec("pages", &spec, deck.slides.len())?;
    att.set_meta(
        "selected_slides",
        Value::Array(selected.into_iter().map(|n| Value::from(n - 1)).collect()),
    );
    Ok(att)
}

/// Sheet selection for workbooks (1-based).
pub fn pages_xlsx(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Some(spec) = att.commands.get("pages").map(str::to_string) else {
        return Ok(att);
    };
    let Payload::Xlsx(workbook) = &att.payload else {
        return Ok(att);
    };
    let selected = parse_index_spec("pages", &spec, workbook.sheets.len())?;
    att.set_meta(
        "selected_sheets",
        Value::Array(selected.into_iter().map(Value::from).collect()),
    );
    Ok(att)
}

/// Row budget for tabular payloads.
pub fn limit_table(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Some(spec) = att.commands.get("limit").map(str::to_string) else {
        return Ok(att);
    };
    let budget: usize = spec
        .parse()
        .map_err(|_| LlmctxError::invalid_value("limit", &spec, "not an integer"))?;
    if let Payload::Tabular(table) = &mut att.payload {
        table.rows.truncate(budget);
    }
    Ok(att)
}

/// Column projection for tabular payloads. Unknown columns are dropped
/// from the selection; an empty intersection leaves the table as-is.
pub fn select_columns(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Some(spec) = att.commands.get("select").map(str::to_string) else {
        return Ok(att);
    };
    let Payload::Tabular(table) = &att.payload else {
        return Ok(att);
    };

    let wanted: Vec<&str> = spec.split(',').map(str::trim).collect();
    let indices: Vec<usize> = wanted
        .iter()
        .filter_map(|name| table.headers.iter().position(|h| h == name))
        .collect();
    if indices.is_empty() {
        return Ok(att);
    }

    let projected = DataTable {
        headers: indices.iter().map(|&i| table.headers[i].clone()).collect(),
        rows: table
            .rows
            .iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|&i| row.get(i).cloned().unwrap_or_default())
                    .collect()
            })
            .collect(),
    };
    let selected = projected.headers.clone();
    att.set_payload(Payload::Tabular(projected));
    att.set_meta(
        "selected_columns",
        Value::Array(selected.into_iter().map(Value::String).collect()),
    );
    Ok(att)
}

/// CSS selection for HTML payloads: the tree is replaced by the
/// matched elements (wrapped in a container when several match).
pub fn select_css(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Some(selector_spec) = att.commands.get("select").map(str::to_string) else {
        return Ok(att);
    };
    let Payload::Html(dom) = &att.payload else {
        return Ok(att);
    };

    let selector = Selector::parse(&selector_spec).map_err(|e| {
        LlmctxError::invalid_value("select", &selector_spec, format!("bad CSS selector: {e}"))
    })?;
    let document = Html::parse_document(&dom.html);
    let matched: Vec<String> = document.select(&selector).map(|el| el.html()).collect();

    let selected_count = matched.len();
    let html = match selected_count {
        0 => String::new(),
        1 => matched.into_iter().next().unwrap_or_default(),
        _ => format!("<div>{}</div>", matched.concat()),
    };

    let base_url = dom.base_url.clone();
    att.set_payload(Payload::Html(HtmlDom { html, base_url }));
    att.set_meta("selector", selector_spec);
    att.set_meta("selected_count", selected_count);
    att.set_meta("selection_applied", true);
    Ok(att)
}

/// Crop an image payload to `x1,y1,x2,y2`. The box must be strictly
/// ordered (`x2 > x1`, `y2 > y1`).
pub fn crop_image(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Some(spec) = att.commands.get("crop").map(str::to_string) else {
        return Ok(att);
    };
    let Payload::Image(data) = &mut att.payload else {
        return Ok(att);
    };

    let coords: Vec<u32> = spec
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| LlmctxError::invalid_value("crop", &spec, "expected x1,y1,x2,y2"))?;
    let &[x1, y1, x2, y2] = coords.as_slice() else {
        return Err(LlmctxError::invalid_value(
            "crop",
            &spec,
            "expected exactly four coordinates",
        ));
    };
    if x2 <= x1 || y2 <= y1 {
        return Err(LlmctxError::invalid_value(
            "crop",
            &spec,
            "box must satisfy x2 > x1 and y2 > y1",
        ));
    }

    let (width, height) = data.size();
    let x2 = x2.min(width);
    let y2 = y2.min(height);
    if x1 >= x2 || y1 >= y2 {
        return Err(LlmctxError::invalid_value(
            "crop",
            &spec,
            "box lies outside the image",
        ));
    }
    data.image = data.image.crop_imm(x1, y1, x2 - x1, y2 - y1);
    Ok(att)
}

/// Rotate an image payload clockwise by `rotate` degrees, expanding the
/// canvas.
pub fn rotate_image(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Some(spec) = att.commands.get("rotate").map(str::to_string) else {
        return Ok(att);
    };
    let Payload::Image(data) = &mut att.payload else {
        return Ok(att);
    };

    let degrees: f32 = spec
        .parse()
        .map_err(|_| LlmctxError::invalid_value("rotate", &spec, "not a number"))?;
    let normalized = degrees.rem_euclid(360.0);

    let rotated = if (normalized - 90.0).abs() < f32::EPSILON {
        Some(data.image.rotate90())
    } else if (normalized - 180.0).abs() < f32::EPSILON {
        Some(data.image.rotate180())
    } else if (normalized - 270.0).abs() < f32::EPSILON {
        Some(data.image.rotate270())
    } else if normalized.abs() < f32::EPSILON {
        None
    } else {
        Some(rotate_expand(&data.image, normalized))
    };
    if let Some(rotated) = rotated {
        data.image = rotated;
    }
    Ok(att)
}

/// Arbitrary-angle clockwise rotation with canvas expansion
/// (nearest-neighbor inverse mapping over an RGBA canvas).
fn rotate_expand(image: &image::DynamicImage, degrees: f32) -> image::DynamicImage {
    let radians = degrees.to_radians();
    let (sin, cos) = radians.sin_cos();
    let (w, h) = (image.width() as f32, image.height() as f32);

    let new_w = (w * cos.abs() + h * sin.abs()).ceil().max(1.0) as u32;
    let new_h = (w * sin.abs() + h * cos.abs()).ceil().max(1.0) as u32;

    let src = image.to_rgba8();
    let (cx, cy) = (w / 2.0, h / 2.0);
    let (ncx, ncy) = (new_w as f32 / 2.0, new_h as f32 / 2.0);

    let canvas = image::RgbaImage::from_fn(new_w, new_h, |x, y| {
        // Inverse transform: rotate the destination pixel back by the
        // same clockwise angle around the new center.
        let dx = x as f32 + 0.5 - ncx;
        let dy = y as f32 + 0.5 - ncy;
        let sx = dx * cos - dy * sin + cx;
        let sy = dx * sin + dy * cos + cy;
        if sx >= 0.0 && sy >= 0.0 && sx < w && sy < h {
            *src.get_pixel(sx as u32, sy as u32)
        } else {
            image::Rgba([255, 255, 255, 255])
        }
    });
    image::DynamicImage::ImageRgba8(canvas)
}

/// Resize an image payload: `N%`, `WxH`, or a bare width `W` keeping
/// the aspect ratio. `0%` clamps to a 1×1 minimum.
pub fn resize_image(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Some(spec) = att.commands.resize_spec().map(str::to_string) else {
        return Ok(att);
    };
    let Payload::Image(data) = &mut att.payload else {
        return Ok(att);
    };

    let (w, h) = parse_resize_spec(&spec, data.size())?;
    data.image = data
        .image
        .resize_exact(w, h, image::imageops::FilterType::Lanczos3);
    Ok(att)
}

/// Shared resize-spec grammar, clamped to a 1×1 minimum.
pub fn parse_resize_spec(spec: &str, current: (u32, u32)) -> Result<(u32, u32)> {
    let (cw, ch) = current;
    if let Some(percent) = spec.strip_suffix('%') {
        let factor: f32 = percent
            .trim()
            .parse()
            .map_err(|_| LlmctxError::invalid_value("resize", spec, "bad percentage"))?;
        if factor < 0.0 {
            return Err(LlmctxError::invalid_value(
                "resize",
                spec,
                "negative percentage",
            ));
        }
        let w = ((cw as f32) * factor / 100.0).round() as u32;
        let h = ((ch as f32) * factor / 100.0).round() as u32;
        return Ok((w.max(1), h.max(1)));
    }
    if let Some((w, h)) = llmctx_core::commands::parse_dimensions(spec) {
        return Ok((w.max(1), h.max(1)));
    }
    let width: u32 = spec
        .trim()
        .parse()
        .map_err(|_| LlmctxError::invalid_value("resize", spec, "expected N%, WxH or W"))?;
    let width = width.max(1);
    let height = ((ch as u64 * width as u64) / cw.max(1) as u64).max(1) as u32;
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmctx_core::{ImageData, PdfFile, PptxFile, PptxSlide};
    use llmctx_engine::RuntimeBuilder;

    fn runtime() -> Runtime {
        RuntimeBuilder::new().build()
    }

    fn pdf_artifact(locator: &str, pages: usize) -> Artifact {
        let mut att = Artifact::new(locator);
        att.set_payload(Payload::Pdf(PdfFile {
            raw: Vec::new(),
            pages: vec![String::new(); pages],
            info: Vec::new(),
        }));
        att
    }

    fn image_artifact(locator: &str, w: u32, h: u32) -> Artifact {
        let mut att = Artifact::new(locator);
        att.set_payload(Payload::Image(ImageData {
            image: image::DynamicImage::new_rgb8(w, h),
            format: Some("PNG".into()),
        }));
        att
    }

    #[test]
    fn test_pdf_page_selection() {
        // Scenario: [pages:1,3,-1] on a five-page document.
        let att = pdf_artifact("x.pdf[pages:1,3,-1]", 5);
        let att = pages_pdf(&runtime(), att).unwrap();
        let selected: Vec<u64> = att.metadata["selected_pages"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_u64())
            .collect();
        assert_eq!(selected, vec![1, 3, 5]);
    }

    #[test]
    fn test_pdf_pages_without_command_is_noop() {
        let att = pdf_artifact("x.pdf", 5);
        let att = pages_pdf(&runtime(), att).unwrap();
        assert!(!att.metadata.contains_key("selected_pages"));
    }

    #[test]
    fn test_pptx_selection_is_zero_based() {
        let mut att = Artifact::new("deck.pptx[pages:1,3]");
        att.set_payload(Payload::Pptx(PptxFile {
            slides: vec![PptxSlide::default(); 4],
            presentation_xml: None,
            source: Default::default(),
        }));
        let att = pages_pptx(&runtime(), att).unwrap();
        let selected: Vec<u64> = att.metadata["selected_slides"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_u64())
            .collect();
        assert_eq!(selected, vec![0, 2]);
    }

    #[test]
    fn test_limit_truncates_rows() {
        let mut att = Artifact::new("d.csv[limit:1]");
        att.set_payload(Payload::Tabular(DataTable {
            headers: vec!["a".into()],
            rows: vec![vec!["1".into()], vec!["2".into()]],
        }));
        let att = limit_table(&runtime(), att).unwrap();
        let Payload::Tabular(table) = &att.payload else {
            panic!("expected table");
        };
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_select_columns_projects_known_columns() {
        let mut att = Artifact::new("d.csv[select:b,missing]");
        att.set_payload(Payload::Tabular(DataTable {
            headers: vec!["a".into(), "b".into()],
            rows: vec![vec!["1".into(), "2".into()]],
        }));
        let att = select_columns(&runtime(), att).unwrap();
        let Payload::Tabular(table) = &att.payload else {
            panic!("expected table");
        };
        assert_eq!(table.headers, vec!["b"]);
        assert_eq!(table.rows, vec![vec!["2".to_string()]]);
    }

    #[test]
    fn test_select_css_replaces_tree_and_records_metadata() {
        let mut att = Artifact::new("page.html[select:p.keep]");
        att.set_payload(Payload::Html(HtmlDom {
            html: "<html><body><p class='keep'>one</p><p>skip</p>\
                   <p class='keep'>two</p></body></html>"
                .into(),
            base_url: None,
        }));
        let att = select_css(&runtime(), att).unwrap();
        let Payload::Html(dom) = &att.payload else {
            panic!("expected html");
        };
        assert!(dom.html.starts_with("<div>"));
        assert!(dom.html.contains("one") && dom.html.contains("two"));
        assert!(!dom.html.contains("skip"));
        assert_eq!(
            att.metadata.get("selected_count").and_then(|v| v.as_u64()),
            Some(2)
        );
        assert_eq!(
            att.metadata.get("selection_applied").and_then(|v| v.as_bool()),
            Some(true)
        );
    }

    #[test]
    fn test_crop_strict_box_validation() {
        // Degenerate boxes must fail with InvalidValue.
        for bad in ["10,10,10,40", "10,10,40,10"] {
            let att = image_artifact(&format!("p.png[crop:{bad}]"), 100, 100);
            match crop_image(&runtime(), att) {
                Err(LlmctxError::InvalidValue { key, .. }) => assert_eq!(key, "crop"),
                other => panic!("expected InvalidValue, got {other:?}"),
            }
        }

        let att = image_artifact("p.png[crop:10,20,60,70]", 100, 100);
        let att = crop_image(&runtime(), att).unwrap();
        let Payload::Image(data) = &att.payload else {
            panic!("expected image");
        };
        assert_eq!(data.size(), (50, 50));
    }

    #[test]
    fn test_rotate_quarter_turns_swap_dimensions() {
        let att = image_artifact("p.png[rotate:90]", 40, 20);
        let att = rotate_image(&runtime(), att).unwrap();
        let Payload::Image(data) = &att.payload else {
            panic!("expected image");
        };
        assert_eq!(data.size(), (20, 40));
    }

    #[test]
    fn test_rotate_arbitrary_expands_canvas() {
        let att = image_artifact("p.png[rotate:45]", 40, 20);
        let att = rotate_image(&runtime(), att).unwrap();
        let Payload::Image(data) = &att.payload else {
            panic!("expected image");
        };
        let (w, h) = data.size();
        assert!(w > 40 && h > 20);
    }

    #[test]
    fn test_resize_spec_grammar() {
        assert_eq!(parse_resize_spec("50%", (100, 80)).unwrap(), (50, 40));
        assert_eq!(parse_resize_spec("800x600", (100, 80)).unwrap(), (800, 600));
        assert_eq!(parse_resize_spec("50", (100, 80)).unwrap(), (50, 40));
        // 0% clamps to the 1x1 minimum.
        assert_eq!(parse_resize_spec("0%", (100, 80)).unwrap(), (1, 1));
        assert!(parse_resize_spec("huge", (100, 80)).is_err());
    }

    #[test]
    fn test_resize_honors_both_command_names() {
        for key in ["resize", "resize_images"] {
            let att = image_artifact(&format!("p.png[{key}:50%]"), 100, 80);
            let att = resize_image(&runtime(), att).unwrap();
            let Payload::Image(data) = &att.payload else {
                panic!("expected image");
            };
            assert_eq!(data.size(), (50, 40));
        }
    }
}
