use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{BookRepository, StoreError};
use crate::model::Book;

/// In-process book store with no backing file.
#[derive(Debug, Default)]
pub struct MemoryBookStore {
    books: Mutex<Vec<Book>>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_books(books: Vec<Book>) -> Self {
        Self {
            books: Mutex::new(books),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Book>> {
        self.books.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BookRepository for MemoryBookStore {
    fn get_all(&self) -> Vec<Book> {
        self.lock().clone()
    }

    fn add(&self, book: Book) -> Result<String, StoreError> {
        let book_id = book.book_id().to_string();
        self.lock().push(book);
        Ok(book_id)
    }

    fn get_by_id(&self, book_id: &str) -> Option<Book> {
        self.lock()
            .iter()
            .find(|book| book.book_id() == book_id)
            .cloned()
    }

    fn delete(&self, book_id: &str) -> Result<bool, StoreError> {
        let mut books = self.lock();
        let before = books.len();
        books.retain(|book| book.book_id() != book_id);
        Ok(books.len() < before)
    }

    fn modify<E, F>(&self, book_id: &str, f: F) -> Result<Option<Book>, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Book) -> Result<(), E>,
    {
        let mut books = self.lock();
        let Some(stored) = books.iter_mut().find(|book| book.book_id() == book_id) else {
            return Ok(None);
        };
        // Work on a copy so a failing `f` leaves the stored book untouched.
        let mut book = stored.clone();
        f(&mut book)?;
        *stored = book.clone();
        Ok(Some(book))
    }
}
