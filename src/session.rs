use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SESSION_SUFFIX: &str = ".lectern.json";

/// Reading position persisted between runs, one file per book.
///
/// `offsets` only ever holds chapters with a positive scroll offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(rename = "Page")]
    pub page: isize,

    #[serde(rename = "Offsets", default)]
    pub offsets: BTreeMap<usize, usize>,

    #[serde(rename = "Width")]
    pub width: u16,
}

impl SessionState {
    pub fn offset(&self, chapter: usize) -> usize {
        self.offsets.get(&chapter).copied().unwrap_or(0)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read session file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("session file {path} is corrupt")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode session state")]
    Encode(#[source] serde_json::Error),

    #[error("failed to write session file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Hidden sidecar next to the book: `dir/book.epub` -> `dir/.book.epub.lectern.json`.
pub fn session_path(book_path: &Path) -> PathBuf {
    let file_name = book_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sidecar = format!(".{file_name}{SESSION_SUFFIX}");
    match book_path.parent() {
        Some(dir) => dir.join(sidecar),
        None => PathBuf::from(sidecar),
    }
}

/// Loads the session saved for `book_path`.
///
/// A missing file means the book was never opened and yields `Ok(None)`.
/// Any other failure, including a file that does not parse, is an error.
pub fn load(book_path: &Path) -> Result<Option<SessionState>, SessionError> {
    let path = session_path(book_path);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No session at {}", path.display());
            return Ok(None);
        }
        Err(source) => return Err(SessionError::Read { path, source }),
    };

    let state: SessionState =
        serde_json::from_str(&content).map_err(|source| SessionError::Parse {
            path: path.clone(),
            source,
        })?;
    info!(
        "Restoring session from {}: page {}, {} offsets, width {}",
        path.display(),
        state.page,
        state.offsets.len(),
        state.width
    );
    Ok(Some(state))
}

pub fn save(book_path: &Path, state: &SessionState) -> Result<(), SessionError> {
    let path = session_path(book_path);
    let mut content = serde_json::to_string(state).map_err(SessionError::Encode)?;
    content.push('\n');
    fs::write(&path, content).map_err(|source| SessionError::Write {
        path: path.clone(),
        source,
    })?;
    info!("Saved session to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_path_is_hidden_sidecar() {
        assert_eq!(
            session_path(Path::new("/books/dune.epub")),
            PathBuf::from("/books/.dune.epub.lectern.json")
        );
        assert_eq!(
            session_path(Path::new("dune.epub")),
            PathBuf::from(".dune.epub.lectern.json")
        );
    }

    #[test]
    fn test_missing_file_is_no_session() {
        let dir = tempfile::tempdir().unwrap();

        let loaded = load(&dir.path().join("absent.epub")).unwrap();

        assert_eq!(loaded, None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let book = dir.path().join("book.epub");
        let state = SessionState {
            page: 3,
            offsets: BTreeMap::from([(1, 12), (3, 240)]),
            width: 90,
        };

        save(&book, &state).unwrap();

        assert!(dir.path().join(".book.epub.lectern.json").exists());
        assert_eq!(load(&book).unwrap(), Some(state));
    }

    #[test]
    fn test_wire_format_uses_capitalized_fields_and_string_keys() {
        let state = SessionState {
            page: -1,
            offsets: BTreeMap::from([(2, 40)]),
            width: 80,
        };

        let json = serde_json::to_string(&state).unwrap();

        assert_eq!(json, r#"{"Page":-1,"Offsets":{"2":40},"Width":80}"#);
    }

    #[test]
    fn test_missing_offsets_field_defaults_to_empty() {
        let state: SessionState = serde_json::from_str(r#"{"Page":0,"Width":80}"#).unwrap();

        assert!(state.offsets.is_empty());
        assert_eq!(state.offset(7), 0);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let book = dir.path().join("book.epub");
        fs::write(session_path(&book), "{not json").unwrap();

        let err = load(&book).unwrap_err();

        assert!(matches!(err, SessionError::Parse { .. }));
    }
}
