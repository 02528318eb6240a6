use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::model::{Book, BookPatch, BookStateError, HistoryEntry};
use crate::store::{BookRepository, StoreError};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("book must have a non-empty {field}")]
    Validation { field: &'static str },
    #[error("expected a string query, got {found}")]
    InvalidQueryType { found: &'static str },
    #[error("book not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    InvalidState(#[from] BookStateError),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Domain rules layered over a [`BookRepository`].
///
/// The catalog holds no books of its own: every call fetches from the
/// repository, and checkout transitions mutate and persist the stored record
/// in one repository step.
#[derive(Debug)]
pub struct BookCatalog<R> {
    repo: R,
}

impl<R: BookRepository> BookCatalog<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn get_all_books(&self) -> Vec<Book> {
        self.repo.get_all()
    }

    pub fn add_book(&self, book: Book) -> Result<String, CatalogError> {
        if book.title.trim().is_empty() {
            return Err(CatalogError::Validation { field: "title" });
        }
        if book.author.trim().is_empty() {
            return Err(CatalogError::Validation { field: "author" });
        }
        let book_id = self.repo.add(book)?;
        info!(book_id = %book_id, "book added");
        Ok(book_id)
    }

    pub fn get_by_id(&self, book_id: &str) -> Option<Book> {
        self.repo.get_by_id(book_id)
    }

    pub fn update_book(
        &self,
        book_id: &str,
        patch: &BookPatch,
    ) -> Result<Option<Book>, CatalogError> {
        let updated = self.repo.update(book_id, patch)?;
        debug!(book_id, found = updated.is_some(), "book update");
        Ok(updated)
    }

    pub fn delete_book(&self, book_id: &str) -> Result<bool, CatalogError> {
        let deleted = self.repo.delete(book_id)?;
        if deleted {
            info!(book_id, "book deleted");
        }
        Ok(deleted)
    }

    pub fn find_by_name(&self, query: &str) -> Vec<Book> {
        self.repo.find_by_name(query)
    }

    /// Title search for untyped input, rejecting anything but a string.
    pub fn find_by_name_value(&self, query: &Value) -> Result<Vec<Book>, CatalogError> {
        match query {
            Value::String(query) => Ok(self.repo.find_by_name(query)),
            other => Err(CatalogError::InvalidQueryType {
                found: json_type_name(other),
            }),
        }
    }

    pub fn check_out(
        &self,
        book_id: &str,
        user_email: Option<&str>,
        due_date: Option<NaiveDate>,
    ) -> Result<Book, CatalogError> {
        let book = self
            .repo
            .modify(book_id, |book| {
                book.check_out(user_email, due_date)?;
                Ok::<(), CatalogError>(())
            })?
            .ok_or_else(|| CatalogError::NotFound(book_id.to_string()))?;
        info!(book_id, borrower = ?book.checked_out_by(), due = ?due_date, "book checked out");
        Ok(book)
    }

    pub fn check_in(&self, book_id: &str, user_email: Option<&str>) -> Result<Book, CatalogError> {
        let book = self
            .repo
            .modify(book_id, |book| {
                book.check_in(user_email)?;
                Ok::<(), CatalogError>(())
            })?
            .ok_or_else(|| CatalogError::NotFound(book_id.to_string()))?;
        info!(book_id, user = ?user_email, "book checked in");
        Ok(book)
    }

    pub fn history(&self, book_id: &str) -> Result<Vec<HistoryEntry>, CatalogError> {
        self.repo
            .get_by_id(book_id)
            .map(|book| book.checkout_history().to_vec())
            .ok_or_else(|| CatalogError::NotFound(book_id.to_string()))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
