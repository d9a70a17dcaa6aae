//! Host document model.
//!
//! The pipeline only needs a narrow view of the editor: a stable identity,
//! the cursor, the selection, and whole-text get/set. `NoteBuffer` keeps the
//! text in memory; `NoteFile` is backed by a file on disk and writes it
//! atomically.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tempfile::NamedTempFile;

/// Document operations the tag insertion pipeline relies on.
///
/// Offsets are byte offsets into `value()`.
pub trait HostDocument {
    /// Identity used to serialize concurrent updates of the same document.
    fn document_id(&self) -> String;

    fn cursor(&self) -> usize;

    fn set_cursor(&mut self, offset: usize);

    /// Selected byte range, if any. May be empty.
    fn selection(&self) -> Option<Range<usize>>;

    fn value(&self) -> &str;

    /// Re-reads the text from its backing store.
    fn reload(&mut self) -> io::Result<()>;

    /// Replaces the whole text in one step.
    fn set_value(&mut self, text: String) -> io::Result<()>;

    /// Selected text, or `None` for no selection or an out-of-bounds range.
    fn selected_text(&self) -> Option<&str> {
        self.selection().and_then(|range| self.value().get(range))
    }
}

/// In-memory document, the stand-in for an editor buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteBuffer {
    id: String,
    text: String,
    cursor: usize,
    selection: Option<Range<usize>>,
}

impl NoteBuffer {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            cursor: 0,
            selection: None,
        }
    }

    /// Selects `range` and moves the cursor to its end.
    #[must_use]
    pub fn with_selection(mut self, range: Range<usize>) -> Self {
        self.cursor = range.end;
        self.selection = Some(range);
        self
    }

    #[must_use]
    pub fn with_cursor(mut self, offset: usize) -> Self {
        self.cursor = offset.min(self.text.len());
        self
    }
}

impl HostDocument for NoteBuffer {
    fn document_id(&self) -> String {
        self.id.clone()
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn set_cursor(&mut self, offset: usize) {
        self.cursor = offset.min(self.text.len());
    }

    fn selection(&self) -> Option<Range<usize>> {
        self.selection.clone()
    }

    fn value(&self) -> &str {
        &self.text
    }

    fn reload(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn set_value(&mut self, text: String) -> io::Result<()> {
        self.text = text;
        self.selection = None;
        self.cursor = self.cursor.min(self.text.len());
        Ok(())
    }
}

/// Markdown note on disk.
#[derive(Debug)]
pub struct NoteFile {
    path: PathBuf,
    text: String,
    cursor: usize,
    selection: Option<Range<usize>>,
}

impl NoteFile {
    /// Reads the note at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read as UTF-8 text.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let text = fs::read_to_string(&path)?;
        Ok(Self {
            path,
            text,
            cursor: 0,
            selection: None,
        })
    }

    /// Selects a byte range of the current text.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the range is out of bounds or splits a
    /// UTF-8 character.
    pub fn select(&mut self, range: Range<usize>) -> io::Result<()> {
        if self.text.get(range.clone()).is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "selection {}..{} is not valid for a {} byte document",
                    range.start,
                    range.end,
                    self.text.len()
                ),
            ));
        }
        self.cursor = range.end;
        self.selection = Some(range);
        Ok(())
    }

    /// Selects the first occurrence of `needle`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `needle` does not occur in the note.
    pub fn select_text(&mut self, needle: &str) -> io::Result<()> {
        let start = self.text.find(needle).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("'{needle}' does not occur in {}", self.path.display()),
            )
        })?;
        self.select(start..start + needle.len())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HostDocument for NoteFile {
    fn document_id(&self) -> String {
        fs::canonicalize(&self.path)
            .unwrap_or_else(|_| self.path.clone())
            .to_string_lossy()
            .into_owned()
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn set_cursor(&mut self, offset: usize) {
        self.cursor = offset.min(self.text.len());
    }

    fn selection(&self) -> Option<Range<usize>> {
        self.selection.clone()
    }

    fn value(&self) -> &str {
        &self.text
    }

    fn reload(&mut self) -> io::Result<()> {
        self.text = fs::read_to_string(&self.path)?;
        self.cursor = self.cursor.min(self.text.len());
        Ok(())
    }

    fn set_value(&mut self, text: String) -> io::Result<()> {
        write_atomically(&self.path, &text)?;
        self.text = text;
        self.selection = None;
        self.cursor = self.cursor.min(self.text.len());
        Ok(())
    }
}

/// Writes `text` to a temporary file next to `path`, then renames it over `path`.
fn write_atomically(path: &Path, text: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(text.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Registry of per-document advisory locks.
///
/// Clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct DocumentLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static DocumentLocks {
        static GLOBAL: OnceLock<DocumentLocks> = OnceLock::new();
        GLOBAL.get_or_init(DocumentLocks::new)
    }

    /// Returns the lock for `document_id`, creating it on first use.
    pub fn lock_for(&self, document_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(document_id.to_string()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn buffer_selection_moves_cursor_and_yields_text() {
        let buffer = NoteBuffer::new("a", "hello brave world").with_selection(6..11);
        assert_eq!(buffer.cursor(), 11);
        assert_eq!(buffer.selected_text(), Some("brave"));
    }

    #[test]
    fn selection_splitting_a_character_yields_no_text() {
        let buffer = NoteBuffer::new("a", "日本").with_selection(1..3);
        assert_eq!(buffer.selected_text(), None);
    }

    #[test]
    fn set_value_clears_selection_and_clamps_cursor() {
        let mut buffer = NoteBuffer::new("a", "0123456789").with_selection(2..9);
        buffer.set_value("abc".to_string()).unwrap();

        assert_eq!(buffer.value(), "abc");
        assert!(buffer.selection().is_none());
        assert_eq!(buffer.cursor(), 3);
    }

    #[test]
    fn note_file_round_trip_and_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("note.md");
        fs::write(&path, "original").unwrap();

        let mut note = NoteFile::open(&path).unwrap();
        assert_eq!(note.value(), "original");

        note.set_value("updated".to_string()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "updated");

        let leftovers: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn note_file_reload_sees_external_changes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("note.md");
        fs::write(&path, "first").unwrap();

        let mut note = NoteFile::open(&path).unwrap();
        fs::write(&path, "second").unwrap();
        note.reload().unwrap();

        assert_eq!(note.value(), "second");
    }

    #[test]
    fn note_file_selection_validation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("note.md");
        fs::write(&path, "pick this phrase").unwrap();

        let mut note = NoteFile::open(&path).unwrap();
        assert!(note.select(0..100).is_err());

        note.select_text("this").unwrap();
        assert_eq!(note.selection(), Some(5..9));
        assert_eq!(note.selected_text(), Some("this"));

        let err = note.select_text("absent").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn open_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        assert!(NoteFile::open(temp_dir.path().join("missing.md")).is_err());
    }

    #[test]
    fn same_document_shares_one_lock() {
        let locks = DocumentLocks::new();
        let a = locks.lock_for("doc");
        let b = locks.clone().lock_for("doc");
        let c = locks.lock_for("other");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn lock_serializes_critical_sections() {
        let locks = DocumentLocks::new();
        let counter = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let locks = locks.clone();
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    let lock = locks.lock_for("doc");
                    let _guard = lock.lock().unwrap();
                    counter.lock().unwrap().push(("enter", i));
                    thread::sleep(std::time::Duration::from_millis(5));
                    counter.lock().unwrap().push(("leave", i));
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let events = counter.lock().unwrap();
        for pair in events.chunks(2) {
            assert_eq!(pair[0].0, "enter");
            assert_eq!(pair[1].0, "leave");
            assert_eq!(pair[0].1, pair[1].1);
        }
    }
}
