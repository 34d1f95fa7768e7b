//! Loaders: decode an input locator into a payload.
//!
//! Every loader is tolerant by contract — the dispatch layer skips it
//! when its predicate rejects the artifact or when a payload is already
//! set — so loaders only report *decode* failures, which the pipeline's
//! fallback machinery catches.

mod directory;
mod docx;
mod pptx;

pub use directory::load_structure;

use crate::matchers;
use image::GenericImageView as _;
use llmctx_core::{
    Artifact, ArtifactSet, CommandMap, DataTable, HtmlDom, ImageData, LlmctxError, Payload,
    PdfFile, Result, SheetData, WorkbookData,
};
use llmctx_engine::{Loaded, Runtime};
use log::debug;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// HTTP timeout for webpage fetches.
pub const HTML_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP timeout for binary file downloads.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

fn load_failed(verb: &str, att: &Artifact, message: impl std::fmt::Display) -> LlmctxError {
    LlmctxError::load(verb, att.path(), message.to_string())
}

/// Plain-text loader.
pub fn text_file(_rt: &Runtime, mut att: Artifact) -> Result<Loaded> {
    let path = std::path::PathBuf::from(att.path());
    let content =
        std::fs::read_to_string(&path).map_err(|e| load_failed("text_file", &att, e))?;
    llmctx_core::artifact::record_file_size(&mut att, &path);
    att.set_payload(Payload::Text(content));
    Ok(Loaded::One(att))
}

/// CSV loader.
pub fn csv_table(_rt: &Runtime, mut att: Artifact) -> Result<Loaded> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(att.path())
        .map_err(|e| load_failed("csv_table", &att, e))?;

    let headers = reader
        .headers()
        .map_err(|e| load_failed("csv_table", &att, e))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| load_failed("csv_table", &att, e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    att.set_payload(Payload::Tabular(DataTable { headers, rows }));
    Ok(Loaded::One(att))
}

/// PDF loader: extracts per-page text eagerly and keeps the raw bytes
/// for the rasterizer collaborator.
pub fn pdf_document(_rt: &Runtime, mut att: Artifact) -> Result<Loaded> {
    let raw = std::fs::read(att.path()).map_err(|e| load_failed("pdf_document", &att, e))?;
    let doc = lopdf::Document::load_mem(&raw)
        .map_err(|e| load_failed("pdf_document", &att, e))?;

    let mut pages = Vec::new();
    for page_no in doc.get_pages().keys() {
        // Extraction failures on individual pages degrade to an empty
        // page; the scanned-document heuristic picks that up.
        pages.push(doc.extract_text(&[*page_no]).unwrap_or_default());
    }
    let info = pdf_info(&doc);

    debug!("pdf '{}' loaded: {} pages", att.path(), pages.len());
    let path = std::path::PathBuf::from(att.path());
    llmctx_core::artifact::record_file_size(&mut att, &path);
    att.set_payload(Payload::Pdf(PdfFile { raw, pages, info }));
    Ok(Loaded::One(att))
}

fn pdf_info(doc: &lopdf::Document) -> Vec<(String, String)> {
    let Ok(obj) = doc.trailer.get(b"Info") else {
        return Vec::new();
    };
    let dict = match obj {
        lopdf::Object::Reference(id) => doc.get_dictionary(*id).ok(),
        lopdf::Object::Dictionary(d) => Some(d),
        _ => None,
    };
    let Some(dict) = dict else {
        return Vec::new();
    };
    dict.iter()
        .filter_map(|(key, value)| match value {
            lopdf::Object::String(bytes, _) => Some((
                String::from_utf8_lossy(key).to_string(),
                String::from_utf8_lossy(bytes).to_string(),
            )),
            _ => None,
        })
        .collect()
}

/// Word document loader (manual ZIP + XML parsing).
pub fn docx_document(_rt: &Runtime, att: Artifact) -> Result<Loaded> {
    docx::load(att)
}

/// Presentation loader (manual ZIP + XML parsing).
pub fn pptx_document(_rt: &Runtime, att: Artifact) -> Result<Loaded> {
    pptx::load(att)
}

/// Workbook loader.
pub fn xlsx_workbook(_rt: &Runtime, mut att: Artifact) -> Result<Loaded> {
    use calamine::Reader as _;

    let mut workbook: calamine::Xlsx<_> = calamine::open_workbook(att.path())
        .map_err(|e| load_failed("xlsx_workbook", &att, e))?;
    let names = workbook.sheet_names().to_owned();
    let mut sheets = Vec::new();
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| load_failed("xlsx_workbook", &att, e))?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect();
        sheets.push(SheetData { name, rows });
    }

    let source = Path::new(att.path()).to_path_buf();
    att.set_payload(Payload::Xlsx(WorkbookData { sheets, source }));
    Ok(Loaded::One(att))
}

/// Raster image loader.
pub fn image_file(_rt: &Runtime, mut att: Artifact) -> Result<Loaded> {
    let reader = image::ImageReader::open(att.path())
        .map_err(|e| load_failed("image_file", &att, e))?
        .with_guessed_format()
        .map_err(|e| load_failed("image_file", &att, e))?;
    let format = reader.format().map(|f| format!("{f:?}").to_uppercase());
    let decoded = reader
        .decode()
        .map_err(|e| load_failed("image_file", &att, e))?;

    let data = ImageData {
        image: decoded,
        format: format.clone(),
    };
    att.set_meta("format", format.unwrap_or_else(|| "UNKNOWN".into()));
    att.set_meta(
        "size",
        serde_json::json!([data.image.width(), data.image.height()]),
    );
    att.set_meta("mode", data.mode());
    att.set_payload(Payload::Image(data));
    Ok(Loaded::One(att))
}

/// Local HTML loader. The tree is kept as source text; use sites
/// re-parse it.
pub fn html_file(_rt: &Runtime, mut att: Artifact) -> Result<Loaded> {
    let html = std::fs::read_to_string(att.path())
        .map_err(|e| load_failed("html_file", &att, e))?;
    att.set_payload(Payload::Html(HtmlDom {
        html,
        base_url: None,
    }));
    Ok(Loaded::One(att))
}

/// Webpage loader: GET the URL (10 s) and hold the HTML for parsing.
pub fn url_page(rt: &Runtime, mut att: Artifact) -> Result<Loaded> {
    let url = att.path().to_string();
    let response = rt.http()?.get(&url, HTML_FETCH_TIMEOUT)?;
    att.set_meta("status_code", response.status);
    att.set_meta(
        "content_type",
        response.content_type.clone().unwrap_or_default(),
    );
    att.set_payload(Payload::Html(HtmlDom {
        html: String::from_utf8_lossy(&response.bytes).into_owned(),
        base_url: Some(url),
    }));
    Ok(Loaded::One(att))
}

/// Download a binary URL to a temp file and return a fresh artifact for
/// it (commands inherited, temp file owned by the new artifact's
/// scope). Shared by the URL loader and the URL processor.
pub fn download_url_to_temp(rt: &Runtime, att: &Artifact) -> Result<Artifact> {
    let url = att.path().to_string();
    let response = rt.http()?.get(&url, DOWNLOAD_TIMEOUT)?;

    let suffix = matchers::url_suffix(&url)
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    let temp = tempfile::Builder::new()
        .prefix("llmctx-download-")
        .suffix(&suffix)
        .tempfile()
        .map_err(LlmctxError::Io)?;
    std::fs::write(temp.path(), &response.bytes)?;
    let temp_path = temp
        .into_temp_path()
        .keep()
        .map_err(|e| LlmctxError::collaborator("http", format!("cannot keep temp file: {e}")))?;

    let mut downloaded = Artifact::with_commands(
        temp_path.to_string_lossy().into_owned(),
        att.commands.clone(),
    );
    downloaded.adopt_temp_file(temp_path.clone());
    downloaded.set_meta("original_url", url);
    downloaded.set_meta("temp_file_path", temp_path.to_string_lossy().into_owned());
    downloaded.set_meta("downloaded_from_url", true);
    downloaded.set_meta("content_length", response.bytes.len());
    downloaded.set_meta(
        "content_type",
        response.content_type.unwrap_or_default(),
    );
    Ok(downloaded)
}

/// Binary-URL loader for the universal chain: download, then decode the
/// temp file with the matching format loader.
pub fn url_download(rt: &Runtime, att: Artifact) -> Result<Loaded> {
    let downloaded = download_url_to_temp(rt, &att)?;
    let loaded = match () {
        () if matchers::pdf_match(&downloaded) => pdf_document(rt, downloaded)?,
        () if matchers::docx_match(&downloaded) => docx_document(rt, downloaded)?,
        () if matchers::pptx_match(&downloaded) => pptx_document(rt, downloaded)?,
        () if matchers::xlsx_match(&downloaded) => xlsx_workbook(rt, downloaded)?,
        () if matchers::image_match(&downloaded) => image_file(rt, downloaded)?,
        () if matchers::zip_match(&downloaded) => archive_images(rt, downloaded)?,
        () => text_file(rt, downloaded)?,
    };
    Ok(loaded)
}

/// ZIP loader: expand image members into an artifact set, each member
/// inheriting the parent's commands.
pub fn archive_images(_rt: &Runtime, att: Artifact) -> Result<Loaded> {
    let file = std::fs::File::open(att.path()).map_err(|e| load_failed("archive_images", &att, e))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| load_failed("archive_images", &att, e))?;

    let mut set = ArtifactSet::default();
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| load_failed("archive_images", &att, e))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let is_image = Path::new(&name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .is_some_and(|ext| matchers::IMAGE_EXTENSIONS.contains(&ext.as_str()));
        if !is_image {
            continue;
        }

        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| load_failed("archive_images", &att, e))?;
        let Ok(decoded) = image::load_from_memory(&bytes) else {
            debug!("skipping undecodable archive member '{name}'");
            continue;
        };

        let mut member = member_artifact(&att, &name);
        member.set_meta("from_zip", true);
        member.set_meta("zip_filename", name);
        member.set_meta(
            "size",
            serde_json::json!([decoded.width(), decoded.height()]),
        );
        member.set_payload(Payload::Image(ImageData {
            image: decoded,
            format: None,
        }));
        set.push(member);
    }

    debug!("archive '{}' expanded to {} image(s)", att.path(), set.len());
    Ok(Loaded::Many(set))
}

fn member_artifact(parent: &Artifact, member_name: &str) -> Artifact {
    let commands: CommandMap = parent.commands.clone();
    Artifact::with_commands(format!("{}/{member_name}", parent.path()), commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmctx_engine::RuntimeBuilder;
    use std::io::Write;

    fn runtime() -> Runtime {
        RuntimeBuilder::new().build()
    }

    #[test]
    fn test_text_loader_sets_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello context").unwrap();

        let att = Artifact::new(path.to_str().unwrap());
        let loaded = text_file(&runtime(), att).unwrap();
        match loaded {
            Loaded::One(att) => match &att.payload {
                Payload::Text(content) => assert_eq!(content, "hello context"),
                other => panic!("expected text payload, got {other:?}"),
            },
            Loaded::Many(_) => panic!("text loader must not expand"),
        }
    }

    #[test]
    fn test_text_loader_failure_is_load_error() {
        let att = Artifact::new("definitely/missing.txt");
        match text_file(&runtime(), att) {
            Err(LlmctxError::Load { verb, .. }) => assert_eq!(verb, "text_file"),
            other => panic!("expected load error, got {other:?}"),
        }
    }

    #[test]
    fn test_csv_loader_builds_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "name,age\nada,36\ngrace,45\n").unwrap();

        let att = Artifact::new(path.to_str().unwrap());
        let Loaded::One(att) = csv_table(&runtime(), att).unwrap() else {
            panic!("csv loader must not expand");
        };
        match &att.payload {
            Payload::Tabular(table) => {
                assert_eq!(table.headers, vec!["name", "age"]);
                assert_eq!(table.shape(), (2, 2));
            }
            other => panic!("expected tabular payload, got {other:?}"),
        }
    }

    #[test]
    fn test_archive_loader_expands_images_with_commands() {
        // Scenario: a ZIP of PNGs becomes a set, commands inherited.
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("pics.zip");
        let file = std::fs::File::create(&zip_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for name in ["a.png", "b.png", "c.png", "d.png"] {
            writer.start_file(name, options).unwrap();
            let mut png = std::io::Cursor::new(Vec::new());
            image::DynamicImage::new_rgb8(2, 2)
                .write_to(&mut png, image::ImageFormat::Png)
                .unwrap();
            writer.write_all(&png.into_inner()).unwrap();
        }
        writer.start_file("notes.txt", options).unwrap();
        writer.write_all(b"not an image").unwrap();
        writer.finish().unwrap();

        let locator = format!("{}[resize_images:50%]", zip_path.display());
        let att = Artifact::new(&locator);
        let Loaded::Many(set) = archive_images(&runtime(), att).unwrap() else {
            panic!("archive loader must expand");
        };
        assert_eq!(set.len(), 4);
        for member in set.iter() {
            assert_eq!(member.commands.get("resize_images"), Some("50%"));
            assert_eq!(
                member.metadata.get("from_zip").and_then(|v| v.as_bool()),
                Some(true)
            );
            assert!(matches!(member.payload, Payload::Image(_)));
        }
    }
}
