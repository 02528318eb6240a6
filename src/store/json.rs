use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, warn};

use super::{BookRepository, StoreError};
use crate::model::Book;

pub const DEFAULT_DOCUMENT: &str = "books.json";

/// Book store backed by a single JSON array on disk.
///
/// Every operation reads the whole document and every mutation rewrites it.
/// The path sits behind a mutex held for the full read-modify-write, so
/// operations through one store never interleave. Other processes writing
/// the same file are not coordinated with: the last write wins.
#[derive(Debug)]
pub struct JsonBookStore {
    document: Mutex<PathBuf>,
}

impl Default for JsonBookStore {
    fn default() -> Self {
        Self::new(DEFAULT_DOCUMENT)
    }
}

impl JsonBookStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            document: Mutex::new(path.into()),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, PathBuf> {
        // The guarded value is only a path, so a panic elsewhere cannot leave
        // it half-updated.
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reads the collection, treating a missing, unreadable or malformed
/// document as empty. A record that cannot be read is skipped on its own.
fn read_document(path: &Path) -> Vec<Book> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "book document missing, starting empty");
            return Vec::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "book document unreadable, treating as empty");
            return Vec::new();
        }
    };

    let value: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "book document is not valid JSON, treating as empty");
            return Vec::new();
        }
    };

    let Value::Array(records) = value else {
        warn!(path = %path.display(), "book document is not a list, treating as empty");
        return Vec::new();
    };

    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value::<Book>(record) {
            Ok(book) => Some(book),
            Err(e) => {
                warn!(path = %path.display(), index, error = %e, "skipping malformed book record");
                None
            }
        })
        .collect()
}

fn write_document(path: &Path, books: &[Book]) -> Result<(), StoreError> {
    let raw = serde_json::to_string_pretty(books)?;
    fs::write(path, raw).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), books = books.len(), "book document written");
    Ok(())
}

impl BookRepository for JsonBookStore {
    fn get_all(&self) -> Vec<Book> {
        let path = self.lock();
        read_document(&path)
    }

    fn add(&self, book: Book) -> Result<String, StoreError> {
        let path = self.lock();
        let mut books = read_document(&path);
        let book_id = book.book_id().to_string();
        books.push(book);
        write_document(&path, &books)?;
        Ok(book_id)
    }

    fn get_by_id(&self, book_id: &str) -> Option<Book> {
        let path = self.lock();
        read_document(&path)
            .into_iter()
            .find(|book| book.book_id() == book_id)
    }

    fn delete(&self, book_id: &str) -> Result<bool, StoreError> {
        let path = self.lock();
        let mut books = read_document(&path);
        let before = books.len();
        books.retain(|book| book.book_id() != book_id);
        if books.len() == before {
            return Ok(false);
        }
        write_document(&path, &books)?;
        Ok(true)
    }

    fn modify<E, F>(&self, book_id: &str, f: F) -> Result<Option<Book>, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Book) -> Result<(), E>,
    {
        let path = self.lock();
        let mut books = read_document(&path);
        let Some(book) = books.iter_mut().find(|book| book.book_id() == book_id) else {
            return Ok(None);
        };
        f(book)?;
        let updated = book.clone();
        write_document(&path, &books)?;
        Ok(Some(updated))
    }
}
