//! Refiners: post-process presented text and images.
//!
//! `tile_images`, `combine_images` and `merge_text` are reducers — fed
//! an artifact set, the engine folds the set first and hands them the
//! combined artifact.

use crate::encode::{decode_image_entry, png_base64};
use crate::modify::parse_resize_spec;
use image::{GenericImage, GenericImageView as _};
use llmctx_core::{is_placeholder_image, Artifact, LlmctxError, Result};
use llmctx_engine::Runtime;
use serde_json::json;

/// Truncate text to the commanded character budget, recording the
/// operation (the one sanctioned exception to text monotonicity).
pub fn truncate(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Some(budget) = att.commands.truncate_budget() else {
        return Ok(att);
    };
    if att.text.chars().count() <= budget {
        return Ok(att);
    }
    let original_length = att.text.chars().count();
    att.text = att.text.chars().take(budget).collect();
    att.set_meta(
        "processing",
        json!({
            "operation": "truncate",
            "original_length": original_length,
            "truncated_length": budget,
        }),
    );
    Ok(att)
}

/// Prepend a document header when the text does not start with one.
pub fn add_headers(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    if !att.text.is_empty() && !att.text.starts_with('#') {
        att.text = format!("# Document Content\n\n{}", att.text);
        att.set_meta("headers_added", true);
    }
    Ok(att)
}

/// Normalize the spacing of pipe-delimited table rows.
pub fn format_tables(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    if att.text.is_empty() {
        return Ok(att);
    }
    let formatted: Vec<String> = att
        .text
        .lines()
        .map(|line| {
            if line.matches('|').count() > 2 {
                line.split('|')
                    .map(str::trim)
                    .collect::<Vec<_>>()
                    .join(" | ")
            } else {
                line.to_string()
            }
        })
        .collect();
    att.text = formatted.join("\n");
    att.set_meta("tables_formatted", true);
    Ok(att)
}

/// Grid spec from the `tile` command (`NxM` or a bare `N` meaning a
/// square grid), else a near-square default for `count` images.
fn grid_for(att: &Artifact, count: usize) -> Result<(u32, u32)> {
    if let Some(spec) = att.commands.get("tile") {
        if let Some((cols, rows)) = llmctx_core::commands::parse_dimensions(spec) {
            if cols == 0 || rows == 0 {
                return Err(LlmctxError::invalid_value("tile", spec, "grid must be positive"));
            }
            return Ok((cols, rows));
        }
        let n: u32 = spec
            .trim()
            .parse()
            .map_err(|_| LlmctxError::invalid_value("tile", spec, "expected NxM or N"))?;
        if n == 0 {
            return Err(LlmctxError::invalid_value("tile", spec, "grid must be positive"));
        }
        return Ok((n, n));
    }
    let side = (count as f64).sqrt().ceil().max(1.0) as u32;
    Ok((side, side))
}

/// Tile the artifact's images into one grid image. With fewer images
/// than cells, the remaining cells stay background.
pub fn tile_images(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let real: Vec<String> = att.real_images().map(str::to_string).collect();
    if real.len() < 2 && !att.commands.contains("tile") {
        return Ok(att);
    }
    if real.is_empty() {
        return Ok(att);
    }

    let (cols, rows) = grid_for(&att, real.len())?;
    let decoded: Vec<image::DynamicImage> = real
        .iter()
        .map(|entry| decode_image_entry(entry))
        .collect::<Result<_>>()?;

    let cell_w = decoded.iter().map(image::DynamicImage::width).max().unwrap_or(1);
    let cell_h = decoded.iter().map(image::DynamicImage::height).max().unwrap_or(1);
    let (canvas_w, canvas_h) = (cols * cell_w, rows * cell_h);

    let mut canvas = image::RgbImage::from_pixel(canvas_w, canvas_h, image::Rgb([255, 255, 255]));
    for (index, tile) in decoded.iter().take((cols * rows) as usize).enumerate() {
        let col = index as u32 % cols;
        let row = index as u32 / cols;
        canvas
            .copy_from(&tile.to_rgb8(), col * cell_w, row * cell_h)
            .map_err(|e| LlmctxError::Parser(anyhow::anyhow!("tile paste failed: {e}")))?;
    }

    let tiled = png_base64(&image::DynamicImage::ImageRgb8(canvas))?;
    let original_count = real.len();
    att.images = vec![tiled];
    att.set_meta("operation", "tile_images");
    att.set_meta("grid_size", format!("{cols}x{rows}"));
    att.set_meta("original_count", original_count);
    att.set_meta("tiled_dimensions", json!([canvas_w, canvas_h]));
    Ok(att)
}

/// Resize every real image per the `resize_images` / `resize` command.
pub fn resize_images(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let Some(spec) = att.commands.resize_spec().map(str::to_string) else {
        return Ok(att);
    };
    if att.images.is_empty() {
        return Ok(att);
    }

    let mut resized = Vec::with_capacity(att.images.len());
    let mut touched = 0usize;
    for entry in &att.images {
        if is_placeholder_image(entry) {
            resized.push(entry.clone());
            continue;
        }
        let decoded = decode_image_entry(entry)?;
        let (w, h) = parse_resize_spec(&spec, (decoded.width(), decoded.height()))?;
        let scaled = decoded.resize_exact(w, h, image::imageops::FilterType::Lanczos3);
        resized.push(png_base64(&scaled)?);
        touched += 1;
    }
    att.images = resized;
    att.set_meta("images_resized", true);
    att.set_meta("resize_spec", spec);
    att.set_meta("image_count", touched);
    Ok(att)
}

/// Stack every real image vertically into one.
pub fn combine_images(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    let real: Vec<String> = att.real_images().map(str::to_string).collect();
    if real.len() < 2 {
        return Ok(att);
    }

    let decoded: Vec<image::DynamicImage> = real
        .iter()
        .map(|entry| decode_image_entry(entry))
        .collect::<Result<_>>()?;
    let width = decoded.iter().map(image::DynamicImage::width).max().unwrap_or(1);
    let height: u32 = decoded.iter().map(image::DynamicImage::height).sum();

    let mut canvas = image::RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]));
    let mut offset = 0u32;
    for tile in &decoded {
        canvas
            .copy_from(&tile.to_rgb8(), 0, offset)
            .map_err(|e| LlmctxError::Parser(anyhow::anyhow!("stack paste failed: {e}")))?;
        offset += tile.height();
    }

    let combined = png_base64(&image::DynamicImage::ImageRgb8(canvas))?;
    let original_count = real.len();
    att.images = vec![combined];
    att.set_meta("operation", "combine_images");
    att.set_meta("original_count", original_count);
    Ok(att)
}

/// Mark the fold of a set's text. The engine's fold already joined the
/// text; this records the reduction.
pub fn merge_text(_rt: &Runtime, mut att: Artifact) -> Result<Artifact> {
    att.set_meta("operation", "merge_text");
    Ok(att)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView as _;
    use llmctx_engine::RuntimeBuilder;

    fn runtime() -> Runtime {
        RuntimeBuilder::new().build()
    }

    fn artifact_with_images(locator: &str, sizes: &[(u32, u32)]) -> Artifact {
        let mut att = Artifact::new(locator);
        for &(w, h) in sizes {
            let img = image::DynamicImage::new_rgb8(w, h);
            att.append_image(png_base64(&img).unwrap());
        }
        att
    }

    #[test]
    fn test_truncate_records_operation() {
        let mut att = Artifact::new("x.txt[truncate:5]");
        att.append_text("0123456789");
        let att = truncate(&runtime(), att).unwrap();
        assert_eq!(att.text, "01234");
        let processing = &att.metadata["processing"];
        assert_eq!(processing["operation"].as_str(), Some("truncate"));
        assert_eq!(processing["original_length"].as_u64(), Some(10));
    }

    #[test]
    fn test_truncate_without_command_is_noop() {
        let mut att = Artifact::new("x.txt");
        att.append_text("0123456789");
        let att = truncate(&runtime(), att).unwrap();
        assert_eq!(att.text, "0123456789");
        assert!(!att.metadata.contains_key("processing"));
    }

    #[test]
    fn test_add_headers_only_when_missing() {
        let mut att = Artifact::new("x.txt");
        att.append_text("plain body");
        let att = add_headers(&runtime(), att).unwrap();
        assert!(att.text.starts_with("# Document Content\n\n"));

        let mut headed = Artifact::new("y.txt");
        headed.append_text("# Already titled");
        let headed = add_headers(&runtime(), headed).unwrap();
        assert_eq!(headed.text, "# Already titled");
        assert!(!headed.metadata.contains_key("headers_added"));
    }

    #[test]
    fn test_tile_four_images_default_grid() {
        // Scenario: four images fold into a 2x2 grid.
        let att = artifact_with_images("pics.zip", &[(10, 8), (10, 8), (10, 8), (10, 8)]);
        let att = tile_images(&runtime(), att).unwrap();
        assert_eq!(att.images.len(), 1);
        assert_eq!(att.metadata["operation"].as_str(), Some("tile_images"));
        assert_eq!(att.metadata["grid_size"].as_str(), Some("2x2"));
        assert_eq!(att.metadata["original_count"].as_u64(), Some(4));
        assert_eq!(att.metadata["tiled_dimensions"], json!([20, 16]));
        let tiled = decode_image_entry(&att.images[0]).unwrap();
        assert_eq!((tiled.width(), tiled.height()), (20, 16));
    }

    #[test]
    fn test_tile_partial_grid_keeps_background() {
        // 3 images in a commanded 2x2 grid: the last cell stays
        // background.
        let att = artifact_with_images("pics.zip[tile:2x2]", &[(4, 4), (4, 4), (4, 4)]);
        let att = tile_images(&runtime(), att).unwrap();
        assert_eq!(att.metadata["grid_size"].as_str(), Some("2x2"));
        let tiled = decode_image_entry(&att.images[0]).unwrap();
        assert_eq!((tiled.width(), tiled.height()), (8, 8));
        // Bottom-right cell is untouched background.
        let pixel = tiled.to_rgb8().get_pixel(6, 6).0;
        assert_eq!(pixel, [255, 255, 255]);
    }

    #[test]
    fn test_tile_single_image_without_command_is_noop() {
        let att = artifact_with_images("one.png", &[(4, 4)]);
        let att = tile_images(&runtime(), att).unwrap();
        assert_eq!(att.images.len(), 1);
        assert!(!att.metadata.contains_key("operation"));
    }

    #[test]
    fn test_resize_images_by_percentage() {
        let att = {
            let mut att = artifact_with_images("pics.zip", &[(40, 20)]);
            att.commands.set("resize_images", "50%");
            att
        };
        let att = resize_images(&runtime(), att).unwrap();
        let resized = decode_image_entry(&att.images[0]).unwrap();
        assert_eq!((resized.width(), resized.height()), (20, 10));
        assert_eq!(att.metadata["images_resized"].as_bool(), Some(true));
    }

    #[test]
    fn test_resize_skips_placeholders() {
        let mut att = artifact_with_images("pics.zip", &[(40, 20)]);
        att.append_image("pdf_page_1_placeholder");
        att.commands.set("resize", "50%");
        let att = resize_images(&runtime(), att).unwrap();
        assert_eq!(att.images.len(), 2);
        assert_eq!(att.images[1], "pdf_page_1_placeholder");
    }

    #[test]
    fn test_combine_images_stacks_vertically() {
        let att = artifact_with_images("pics.zip", &[(10, 4), (6, 8)]);
        let att = combine_images(&runtime(), att).unwrap();
        assert_eq!(att.images.len(), 1);
        let combined = decode_image_entry(&att.images[0]).unwrap();
        assert_eq!((combined.width(), combined.height()), (10, 12));
    }
}
