//! The polymorphic payload carried by an artifact.
//!
//! Loaders set the payload, modifiers reshape it, presenters consume it.
//! The variant set covers every decoded representation the standard verb
//! library produces; `Opaque` is the escape hatch for plugin-registered
//! payloads, dispatched by string-suffix match on the type name.

use image::GenericImageView as _;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

/// Discriminant used as the exact-match dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    /// Nothing loaded yet.
    None,
    /// Raw text blob.
    Text,
    /// Decoded raster image.
    Image,
    /// Tabular data (CSV or a selected projection of it).
    Tabular,
    /// PDF document with per-page extracted text.
    Pdf,
    /// Word document paragraphs + underlying XML members.
    Docx,
    /// Presentation slides + underlying XML members.
    Pptx,
    /// Spreadsheet workbook.
    Xlsx,
    /// HTML document tree (held as source, re-parsed at use sites).
    Html,
    /// Directory / repository structure record.
    Structure,
    /// Plugin payload.
    Opaque,
}

/// Decoded raster image.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Decoded pixels.
    pub image: image::DynamicImage,
    /// Source container format, when known (e.g. `PNG`, `JPEG`).
    pub format: Option<String>,
}

impl ImageData {
    /// `(width, height)` in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    /// PIL-style mode name for the decoded pixel layout.
    pub fn mode(&self) -> &'static str {
        use image::DynamicImage::*;
        match self.image {
            ImageLuma8(_) | ImageLuma16(_) => "L",
            ImageLumaA8(_) | ImageLumaA16(_) => "LA",
            ImageRgb8(_) | ImageRgb16(_) | ImageRgb32F(_) => "RGB",
            ImageRgba8(_) | ImageRgba16(_) | ImageRgba32F(_) => "RGBA",
            _ => "RGB",
        }
    }
}

/// Tabular data decoded from CSV (or projected from it).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataTable {
    /// Column names; empty when the source had no header row.
    pub headers: Vec<String>,
    /// Row-major cells.
    pub rows: Vec<Vec<String>>,
}

impl DataTable {
    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        let cols = if self.headers.is_empty() {
            self.rows.first().map_or(0, Vec::len)
        } else {
            self.headers.len()
        };
        (self.rows.len(), cols)
    }
}

/// PDF document: raw bytes (for the rasterizer collaborator) plus
/// per-page extracted text and the document information dictionary.
#[derive(Debug, Clone, Default)]
pub struct PdfFile {
    /// Original file bytes.
    pub raw: Vec<u8>,
    /// Extracted text, one entry per page, in page order.
    pub pages: Vec<String>,
    /// Document info entries (Title, Author, …) in encounter order.
    pub info: Vec<(String, String)>,
}

impl PdfFile {
    /// Total page count.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// One paragraph of a Word document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocxParagraph {
    /// Concatenated run text.
    pub text: String,
    /// Style name (e.g. `Heading 1`), when the paragraph carries one.
    pub style: Option<String>,
}

/// Word document: paragraphs plus the raw XML members needed for the
/// structural (`xml`) rendition and office conversion.
#[derive(Debug, Clone, Default)]
pub struct DocxFile {
    /// Paragraphs in document order.
    pub paragraphs: Vec<DocxParagraph>,
    /// `word/document.xml` source.
    pub document_xml: String,
    /// `word/styles.xml` source, when present.
    pub styles_xml: Option<String>,
    /// `docProps/core.xml` source, when present.
    pub core_xml: Option<String>,
    /// Path the document was loaded from (office conversion needs it).
    pub source: PathBuf,
}

/// One slide of a presentation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PptxSlide {
    /// Shape text in shape order.
    pub texts: Vec<String>,
    /// Raw slide XML.
    pub xml: String,
}

/// Presentation deck.
#[derive(Debug, Clone, Default)]
pub struct PptxFile {
    /// Slides in deck order.
    pub slides: Vec<PptxSlide>,
    /// `ppt/presentation.xml` source, when present.
    pub presentation_xml: Option<String>,
    /// Path the deck was loaded from.
    pub source: PathBuf,
}

/// One sheet of a workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetData {
    /// Sheet name.
    pub name: String,
    /// Row-major cells rendered to strings.
    pub rows: Vec<Vec<String>>,
}

impl SheetData {
    /// `(rows, columns)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows.len(), self.rows.first().map_or(0, Vec::len))
    }
}

/// Spreadsheet workbook.
#[derive(Debug, Clone, Default)]
pub struct WorkbookData {
    /// Sheets in workbook order.
    pub sheets: Vec<SheetData>,
    /// Path the workbook was loaded from.
    pub source: PathBuf,
}

/// HTML document. The tree is held as source text and re-parsed where
/// needed; the parsed DOM type is not `Send` and artifacts must stay
/// safe to move across threads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlDom {
    /// Document source.
    pub html: String,
    /// URL the document came from, for link resolution and screenshots.
    pub base_url: Option<String>,
}

/// Whether a structure record describes a git repository or a plain
/// directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    /// Directory with a `.git` marker.
    GitRepository,
    /// Plain directory.
    Directory,
}

impl StructureKind {
    /// Stable string label (`git_repository` / `directory`).
    pub fn label(self) -> &'static str {
        match self {
            Self::GitRepository => "git_repository",
            Self::Directory => "directory",
        }
    }
}

/// One node of the stat tree collected for a directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileNode {
    /// Entry name (not the full path).
    pub name: String,
    /// Whether this is a directory.
    pub is_dir: bool,
    /// Size in bytes.
    pub size: u64,
    /// `rwxr-xr-x`-style permission string.
    pub permissions: String,
    /// Owner uid (numeric; resolving names is not worth a dependency).
    pub owner: u32,
    /// Group gid.
    pub group: u32,
    /// Mode as an octal string (e.g. `644`).
    pub mode_octal: String,
    /// Inode number.
    pub inode: u64,
    /// Hard link count.
    pub links: u64,
    /// Modification time, RFC 3339, when available.
    pub modified: Option<String>,
    /// Child nodes for directories.
    pub children: Vec<FileNode>,
}

/// Structure record produced by the directory/repo loader.
#[derive(Debug, Clone)]
pub struct StructureRecord {
    /// Repository or plain directory.
    pub kind: StructureKind,
    /// Root the walk started from.
    pub root: PathBuf,
    /// Collected (bounded, filtered) file paths.
    pub files: Vec<PathBuf>,
    /// Stat tree rooted at `root`.
    pub tree: FileNode,
    /// Repo/dir info: git branch, last commit, remotes, dirty flag, …
    pub info: serde_json::Map<String, serde_json::Value>,
}

/// The artifact payload: a tagged variant over every decoded
/// representation the runtime understands.
#[derive(Clone, Default)]
pub enum Payload {
    /// Nothing loaded.
    #[default]
    None,
    /// Text blob.
    Text(String),
    /// Decoded image.
    Image(ImageData),
    /// Tabular data.
    Tabular(DataTable),
    /// PDF document.
    Pdf(PdfFile),
    /// Word document.
    Docx(DocxFile),
    /// Presentation deck.
    Pptx(PptxFile),
    /// Workbook.
    Xlsx(WorkbookData),
    /// HTML document.
    Html(HtmlDom),
    /// Directory / repository structure.
    Structure(StructureRecord),
    /// Plugin payload, dispatched by suffix match on `type_name`.
    Opaque {
        /// Runtime type name used for suffix dispatch.
        type_name: String,
        /// Shared handle to the plugin's decoded value.
        handle: Arc<dyn Any + Send + Sync>,
    },
}

impl Payload {
    /// Dispatch discriminant.
    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::None => PayloadKind::None,
            Self::Text(_) => PayloadKind::Text,
            Self::Image(_) => PayloadKind::Image,
            Self::Tabular(_) => PayloadKind::Tabular,
            Self::Pdf(_) => PayloadKind::Pdf,
            Self::Docx(_) => PayloadKind::Docx,
            Self::Pptx(_) => PayloadKind::Pptx,
            Self::Xlsx(_) => PayloadKind::Xlsx,
            Self::Html(_) => PayloadKind::Html,
            Self::Structure(_) => PayloadKind::Structure,
            Self::Opaque { .. } => PayloadKind::Opaque,
        }
    }

    /// Runtime type name, the target of suffix matching.
    pub fn type_name(&self) -> &str {
        match self {
            Self::None => "None",
            Self::Text(_) => "String",
            Self::Image(_) => "ImageData",
            Self::Tabular(_) => "DataTable",
            Self::Pdf(_) => "PdfFile",
            Self::Docx(_) => "DocxFile",
            Self::Pptx(_) => "PptxFile",
            Self::Xlsx(_) => "WorkbookData",
            Self::Html(_) => "HtmlDom",
            Self::Structure(_) => "StructureRecord",
            Self::Opaque { type_name, .. } => type_name,
        }
    }

    /// Whether a loader has set this payload.
    pub fn is_set(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opaque { type_name, .. } => {
                write!(f, "Payload::Opaque({type_name})")
            }
            other => write!(f, "Payload::{}", other.type_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_type_name() {
        let p = Payload::Pdf(PdfFile::default());
        assert_eq!(p.kind(), PayloadKind::Pdf);
        assert_eq!(p.type_name(), "PdfFile");
        assert!(p.is_set());
        assert!(!Payload::None.is_set());
    }

    #[test]
    fn test_opaque_type_name() {
        let p = Payload::Opaque {
            type_name: "heif.HeifImage".into(),
            handle: Arc::new(42u32),
        };
        assert_eq!(p.kind(), PayloadKind::Opaque);
        assert!(p.type_name().ends_with("HeifImage"));
    }

    #[test]
    fn test_structure_kind_labels() {
        assert_eq!(StructureKind::GitRepository.label(), "git_repository");
        assert_eq!(StructureKind::Directory.label(), "directory");
        let json = serde_json::to_string(&StructureKind::GitRepository).unwrap();
        assert_eq!(json, "\"git_repository\"");
    }

    #[test]
    fn test_table_shape() {
        let table = DataTable {
            headers: vec!["a".into(), "b".into()],
            rows: vec![vec!["1".into(), "2".into()]],
        };
        assert_eq!(table.shape(), (1, 2));
    }

    #[test]
    fn test_image_mode() {
        let img = ImageData {
            image: image::DynamicImage::new_rgba8(2, 2),
            format: Some("PNG".into()),
        };
        assert_eq!(img.mode(), "RGBA");
        assert_eq!(img.size(), (2, 2));
    }
}
