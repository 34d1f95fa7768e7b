//! The smart presenter filter.
//!
//! Every presenter invocation passes through a DSL-aware gate:
//! image-modality presenters are suppressed by `images:false`, and the
//! general-purpose text presenters (`text`, `markdown`) defer to the
//! presenter the `format` command prefers — but only when the preferred
//! one actually has a type-specific handler for the current payload, so
//! the user always gets some text.

use crate::registry::{Modality, PresenterEntry, Runtime};
use llmctx_core::Artifact;
use once_cell::sync::Lazy;
use regex::Regex;

static IMAGE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"image|thumbnail|chart|graph|plot|visual|photo|picture|screenshot")
        .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

/// Classify a presenter's modality from its name. Image patterns win;
/// everything else (text/markdown/csv/xml/html/json/yaml/summary/head/
/// metadata and any unrecognized name) presents text.
pub fn detect_modality(name: &str) -> Modality {
    if IMAGE_NAME.is_match(name) {
        Modality::Image
    } else {
        Modality::Text
    }
}

/// The gate. Returns false when the presenter should silently step
/// aside for this artifact.
pub fn presenter_allowed(rt: &Runtime, att: &Artifact, entry: &PresenterEntry) -> bool {
    match entry.modality {
        Modality::Image => att.commands.images_enabled(),
        Modality::Text => text_presenter_allowed(rt, att, entry),
    }
}

/// The format gate applies only to the general-purpose text presenters;
/// named structural presenters (`csv`, `xml`, …) run whenever a
/// pipeline asks for them.
fn text_presenter_allowed(rt: &Runtime, att: &Artifact, entry: &PresenterEntry) -> bool {
    if entry.name != "text" && entry.name != "markdown" {
        return true;
    }
    let format = att.commands.format();
    let preferred = format.preferred_presenter();
    if entry.name == preferred {
        return true;
    }
    // A different presenter is preferred. Only step aside when the
    // preferred one can actually present this payload.
    match rt.registries().presenter(preferred) {
        Some(preferred_entry) => !preferred_entry.handles(&att.payload),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modality_detection() {
        assert_eq!(detect_modality("markdown"), Modality::Text);
        assert_eq!(detect_modality("csv"), Modality::Text);
        assert_eq!(detect_modality("summary"), Modality::Text);
        assert_eq!(detect_modality("images"), Modality::Image);
        assert_eq!(detect_modality("thumbnails"), Modality::Image);
        assert_eq!(detect_modality("screenshot"), Modality::Image);
        assert_eq!(detect_modality("contact_sheet"), Modality::Text); // needs override
        assert_eq!(detect_modality("ocr"), Modality::Text);
        assert_eq!(detect_modality("structure"), Modality::Text);
    }
}
