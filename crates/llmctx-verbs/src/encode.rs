//! Base64 PNG encoding shared by presenters and refiners.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat};
use llmctx_core::{LlmctxError, Result};
use std::io::Cursor;

/// Data-URL prefix every emitted image may carry.
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Encode an image as standard-base64 PNG, flattening alpha-carrying
/// modes to RGB first.
pub fn png_base64(image: &DynamicImage) -> Result<String> {
    let flattened;
    let source = match image {
        DynamicImage::ImageRgba8(_)
        | DynamicImage::ImageRgba16(_)
        | DynamicImage::ImageRgba32F(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLumaA16(_) => {
            flattened = DynamicImage::ImageRgb8(image.to_rgb8());
            &flattened
        }
        other => other,
    };
    let mut buf = Cursor::new(Vec::new());
    source
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| LlmctxError::Parser(anyhow::anyhow!("PNG encode failed: {e}")))?;
    Ok(BASE64.encode(buf.into_inner()))
}

/// Wrap raw base64 into a PNG data-URL.
pub fn to_data_url(b64: &str) -> String {
    format!("{PNG_DATA_URL_PREFIX}{b64}")
}

/// Strip a data-URL prefix, returning the raw base64 payload.
pub fn strip_data_url(entry: &str) -> &str {
    if let Some(rest) = entry.strip_prefix("data:") {
        if let Some((_, payload)) = rest.split_once("base64,") {
            return payload;
        }
    }
    entry
}

/// Decode a base64 (or data-URL) image entry back to pixels.
pub fn decode_image_entry(entry: &str) -> Result<DynamicImage> {
    let bytes = BASE64
        .decode(strip_data_url(entry))
        .map_err(|e| LlmctxError::Parser(anyhow::anyhow!("invalid base64 image entry: {e}")))?;
    image::load_from_memory(&bytes)
        .map_err(|e| LlmctxError::Parser(anyhow::anyhow!("undecodable image entry: {e}")))
}

/// Encode raw PNG bytes as base64.
pub fn bytes_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}
