use crate::html_to_text::HtmlToText;
use crate::toc_parser;
use epub::doc::EpubDoc;
use log::{debug, info, warn};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to open {path}: {message}")]
    Open { path: PathBuf, message: String },

    #[error("document has no table of contents")]
    EmptyToc,

    #[error("url {url:?} not found in the document")]
    UrlNotFound { url: String },

    #[error("cannot move the spine cursor {direction} from {url:?}")]
    Navigation {
        direction: &'static str,
        url: String,
    },

    #[error("no readable content at {url:?}")]
    Unreadable { url: String },

    #[error("failed to convert markup of {url:?}")]
    Markup {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

/// One entry of the table of contents, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub name: String,
    pub url: String,
}

impl TocEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// A cursor over the document's content list that can only move one step
/// at a time.
pub trait SpineCursor {
    fn current_url(&self) -> String;

    fn next(&mut self) -> Result<(), DocumentError>;

    fn previous(&mut self) -> Result<(), DocumentError>;

    fn is_first(&self) -> bool;

    fn is_last(&self) -> bool;

    /// Raw markup of the entry the cursor is parked on.
    fn read_current(&mut self) -> Result<String, DocumentError>;
}

/// What the reader needs from an opened document.
pub trait DocumentSource {
    fn title(&self) -> Option<String>;

    fn table_of_contents(&self) -> Result<Vec<TocEntry>, DocumentError>;

    fn chapter_content(&mut self, url: &str) -> Result<String, DocumentError>;
}

/// Parks `cursor` on `url`.
///
/// Scans backward to the first entry, then forward to the last one. The
/// cursor is deliberately left on the match so the next lookup of a nearby
/// chapter is short. On a miss the cursor is walked back to where it started
/// and `UrlNotFound` is returned.
pub fn locate<C: SpineCursor + ?Sized>(cursor: &mut C, url: &str) -> Result<(), DocumentError> {
    let origin = cursor.current_url();

    loop {
        if cursor.current_url() == url {
            return Ok(());
        }
        if cursor.is_first() {
            break;
        }
        cursor.previous()?;
    }

    loop {
        if cursor.current_url() == url {
            return Ok(());
        }
        if cursor.is_last() {
            break;
        }
        cursor.next()?;
    }

    debug!("{url:?} not in spine, returning cursor to {origin:?}");
    // The forward scan ended on the last entry, so origin is behind us.
    while cursor.current_url() != origin {
        if cursor.is_first() {
            break;
        }
        cursor.previous()?;
    }

    Err(DocumentError::UrlNotFound {
        url: url.to_string(),
    })
}

/// Locates the file behind `url` and returns its content converted to plain
/// text. A `#fragment` only selects the file, so every section of one file
/// reads the same content.
pub fn read_chapter<C: SpineCursor + ?Sized>(
    cursor: &mut C,
    converter: &HtmlToText,
    url: &str,
) -> Result<String, DocumentError> {
    locate(cursor, strip_fragment(url))?;
    let markup = cursor.read_current()?;
    converter
        .convert(&markup)
        .map_err(|source| DocumentError::Markup {
            url: url.to_string(),
            source,
        })
}

/// Strips the `#fragment` part of a navigation target.
pub fn strip_fragment(url: &str) -> &str {
    match url.find('#') {
        Some(pos) => &url[..pos],
        None => url,
    }
}

type EpubFile = EpubDoc<BufReader<std::fs::File>>;

/// Spine cursor over an open EPUB archive.
pub struct EpubSpine {
    doc: EpubFile,
}

impl SpineCursor for EpubSpine {
    fn current_url(&self) -> String {
        self.doc
            .get_current_path()
            .map(|path| toc_parser::path_to_url(&path))
            .unwrap_or_default()
    }

    fn next(&mut self) -> Result<(), DocumentError> {
        if self.doc.go_next() {
            Ok(())
        } else {
            Err(DocumentError::Navigation {
                direction: "forward",
                url: self.current_url(),
            })
        }
    }

    fn previous(&mut self) -> Result<(), DocumentError> {
        if self.doc.go_prev() {
            Ok(())
        } else {
            Err(DocumentError::Navigation {
                direction: "backward",
                url: self.current_url(),
            })
        }
    }

    fn is_first(&self) -> bool {
        self.doc.get_current_chapter() == 0
    }

    fn is_last(&self) -> bool {
        self.doc.get_current_chapter() + 1 >= self.doc.get_num_chapters()
    }

    fn read_current(&mut self) -> Result<String, DocumentError> {
        self.doc
            .get_current_str()
            .map(|(content, _mime)| content)
            .ok_or_else(|| DocumentError::Unreadable {
                url: self.current_url(),
            })
    }
}

/// An EPUB opened from disk.
pub struct EpubDocument {
    spine: EpubSpine,
    toc: Vec<TocEntry>,
    converter: HtmlToText,
}

impl EpubDocument {
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        info!("Opening EPUB: {}", path.display());
        let mut doc = EpubDoc::new(path).map_err(|e| DocumentError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let toc = Self::read_toc(&mut doc)?;
        info!(
            "EPUB spine has {} entries, toc has {} entries",
            doc.get_num_chapters(),
            toc.len()
        );

        Ok(Self {
            spine: EpubSpine { doc },
            toc,
            converter: HtmlToText::new(),
        })
    }

    /// The NCX tree when the book has one (EPUB2), the navigation document
    /// otherwise (EPUB3).
    fn read_toc(doc: &mut EpubFile) -> Result<Vec<TocEntry>, DocumentError> {
        let mut entries = Vec::new();
        toc_parser::flatten_nav_points(&doc.toc, &mut entries);

        if entries.is_empty() {
            if let Some(id) = Self::nav_document_id(doc) {
                entries = Self::read_nav_document(doc, &id)?;
            }
        }
        Ok(toc_parser::drop_repeated_targets(entries))
    }

    fn nav_document_id(doc: &EpubFile) -> Option<String> {
        doc.get_nav_id().or_else(|| {
            doc.resources
                .iter()
                .find(|(_, resource)| {
                    resource
                        .properties
                        .as_deref()
                        .is_some_and(|props| props.split_ascii_whitespace().any(|p| p == "nav"))
                })
                .map(|(id, _)| id.clone())
        })
    }

    fn read_nav_document(doc: &mut EpubFile, id: &str) -> Result<Vec<TocEntry>, DocumentError> {
        let path = doc
            .resources
            .get(id)
            .map(|resource| resource.path.clone())
            .unwrap_or_default();
        let url = toc_parser::path_to_url(&path);
        debug!("No NCX entries, reading navigation document {url}");

        let (markup, _mime) = doc
            .get_resource_str(id)
            .ok_or_else(|| DocumentError::Unreadable { url: url.clone() })?;
        let base_dir = path
            .parent()
            .map(toc_parser::path_to_url)
            .unwrap_or_default();

        toc_parser::parse_nav_document(&markup, &base_dir)
            .map_err(|source| DocumentError::Markup { url, source })
    }
}

impl DocumentSource for EpubDocument {
    fn title(&self) -> Option<String> {
        self.spine
            .doc
            .mdata("title")
            .map(|item| item.value.trim().to_string())
            .filter(|title| !title.is_empty())
    }

    fn table_of_contents(&self) -> Result<Vec<TocEntry>, DocumentError> {
        if self.toc.is_empty() {
            warn!("EPUB has neither NCX entries nor a navigation document list");
            return Err(DocumentError::EmptyToc);
        }
        Ok(self.toc.clone())
    }

    fn chapter_content(&mut self, url: &str) -> Result<String, DocumentError> {
        read_chapter(&mut self.spine, &self.converter, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::MemoryCursor;

    fn abc_parked_at_b() -> MemoryCursor {
        let mut cursor = MemoryCursor::new(&[("a", "<p>A</p>"), ("b", "<p>B</p>"), ("c", "<p>C</p>")]);
        cursor.park_at(1);
        cursor
    }

    #[test]
    fn test_locate_moves_backward_one_step() {
        let mut cursor = abc_parked_at_b();

        locate(&mut cursor, "a").unwrap();

        assert_eq!(cursor.current_url(), "a");
        assert_eq!(cursor.steps(), 1);
    }

    #[test]
    fn test_locate_parked_url_does_not_move() {
        let mut cursor = abc_parked_at_b();

        locate(&mut cursor, "b").unwrap();

        assert_eq!(cursor.current_url(), "b");
        assert_eq!(cursor.steps(), 0);
    }

    #[test]
    fn test_locate_scans_forward_after_reaching_first() {
        let mut cursor = abc_parked_at_b();

        locate(&mut cursor, "c").unwrap();

        assert_eq!(cursor.current_url(), "c");
        // b -> a, then a -> b -> c
        assert_eq!(cursor.steps(), 3);
    }

    #[test]
    fn test_locate_missing_url_restores_cursor() {
        let mut cursor = abc_parked_at_b();

        let err = locate(&mut cursor, "z").unwrap_err();

        assert!(matches!(err, DocumentError::UrlNotFound { ref url } if url == "z"));
        assert_eq!(cursor.current_url(), "b");
    }

    #[test]
    fn test_read_chapter_converts_markup() {
        let mut cursor = abc_parked_at_b();

        let text = read_chapter(&mut cursor, &HtmlToText::new(), "c").unwrap();

        assert_eq!(text, "C");
    }

    #[test]
    fn test_read_chapter_ignores_fragment() {
        let mut cursor = abc_parked_at_b();

        let text = read_chapter(&mut cursor, &HtmlToText::new(), "a#section-2").unwrap();

        assert_eq!(text, "A");
        assert_eq!(cursor.current_url(), "a");
    }

    #[test]
    fn test_strip_fragment() {
        assert_eq!(strip_fragment("OEBPS/ch1.xhtml#part2"), "OEBPS/ch1.xhtml");
        assert_eq!(strip_fragment("OEBPS/ch1.xhtml"), "OEBPS/ch1.xhtml");
    }
}
