pub mod json;
pub mod memory;

use std::path::PathBuf;
use thiserror::Error;

use crate::model::{Book, BookPatch, HistoryEntry};

pub use json::JsonBookStore;
pub use memory::MemoryBookStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write book document {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize book document: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable mapping from book id to [`Book`].
///
/// Lookups never fail: a missing or unreadable backing collection reads as
/// empty and a missing id reads as `None`. Only writes report errors.
pub trait BookRepository {
    fn get_all(&self) -> Vec<Book>;

    /// Appends the book and returns its id. Ids are not checked for
    /// uniqueness.
    fn add(&self, book: Book) -> Result<String, StoreError>;

    fn get_by_id(&self, book_id: &str) -> Option<Book>;

    /// Removes the book, returning whether anything was removed.
    fn delete(&self, book_id: &str) -> Result<bool, StoreError>;

    /// Runs `f` against the stored book and persists the result, all under
    /// one exclusive hold of the collection. Nothing is written when `f`
    /// fails. Returns `Ok(None)` when no book has this id.
    fn modify<E, F>(&self, book_id: &str, f: F) -> Result<Option<Book>, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Book) -> Result<(), E>;

    /// Overwrites the fields named in `patch`.
    fn update(&self, book_id: &str, patch: &BookPatch) -> Result<Option<Book>, StoreError> {
        self.modify(book_id, |book| {
            book.apply_patch(patch);
            Ok(())
        })
    }

    /// Case-insensitive substring match against titles.
    fn find_by_name(&self, query: &str) -> Vec<Book> {
        let query = query.to_lowercase();
        self.get_all()
            .into_iter()
            .filter(|book| !book.title.is_empty() && book.title.to_lowercase().contains(&query))
            .collect()
    }

    /// Like [`BookRepository::find_by_name`], for untyped input: anything
    /// other than a JSON string matches nothing.
    fn find_by_name_value(&self, query: &serde_json::Value) -> Vec<Book> {
        match query.as_str() {
            Some(query) => self.find_by_name(query),
            None => Vec::new(),
        }
    }

    /// Appends one record to the book's history, returning whether the book
    /// exists.
    fn append_history(&self, book_id: &str, entry: HistoryEntry) -> Result<bool, StoreError> {
        let updated = self.modify(book_id, |book| {
            book.push_history(entry);
            Ok::<(), StoreError>(())
        })?;
        Ok(updated.is_some())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    /// Behaviour every repository must share.
    pub(crate) fn check_repository_contract<R: BookRepository>(repo: &R) {
        assert!(repo.get_all().is_empty());

        let mut book = Book::new("The Great Book", "Someone");
        book.genre = Some("Fantasy".to_string());
        book.page_count = Some(320);
        let id = repo.add(book.clone()).unwrap();
        assert_eq!(id, book.book_id());
        assert_eq!(repo.get_by_id(&id), Some(book.clone()));

        let other = Book::new("Another Story", "Else");
        let other_id = repo.add(other).unwrap();
        assert_eq!(repo.get_all().len(), 2);

        let found = repo.find_by_name("great");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].book_id(), id);
        assert_eq!(repo.find_by_name("STORY").len(), 1);
        assert!(repo.find_by_name("missing").is_empty());
        assert!(repo.find_by_name_value(&json!(42)).is_empty());
        assert_eq!(repo.find_by_name_value(&json!("book")).len(), 1);

        let patch = BookPatch {
            title: Some("The Greater Book".to_string()),
            ..BookPatch::default()
        };
        let updated = repo.update(&id, &patch).unwrap().unwrap();
        assert_eq!(updated.title, "The Greater Book");
        assert_eq!(updated.genre.as_deref(), Some("Fantasy"));
        assert_eq!(updated.page_count, Some(320));
        assert_eq!(repo.get_by_id(&id), Some(updated));
        assert!(repo.update("nope", &patch).unwrap().is_none());

        let ts = NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let entry = HistoryEntry::checkout(ts, Some("a@b.com".to_string()), None);
        assert!(repo.append_history(&id, entry.clone()).unwrap());
        assert!(!repo.append_history("nope", entry.clone()).unwrap());
        assert_eq!(
            repo.get_by_id(&id).unwrap().checkout_history(),
            &[entry][..]
        );

        assert!(!repo.delete("nope").unwrap());
        assert_eq!(repo.get_all().len(), 2);
        assert!(repo.delete(&id).unwrap());
        assert!(repo.get_by_id(&id).is_none());
        let remaining = repo.get_all();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].book_id(), other_id);

        let mut full = Book::new("Dune", "Frank Herbert");
        full.genre = Some("Sci-Fi".to_string());
        full.publication_year = Some(1965);
        full.page_count = Some(412);
        full.average_rating = Some(4.27);
        full.ratings_count = Some(1_234_567);
        full.price_usd = Some(54.781751339831196);
        full.publisher = Some("Chilton".to_string());
        full.language = Some("English".to_string());
        full.format = Some("Hardcover".to_string());
        full.in_print = Some(true);
        full.sales_millions = Some(20.000000000000004);
        full.check_out_at(ts, Some("a@b.com"), NaiveDate::from_ymd_opt(2025, 2, 1)).unwrap();
        let full_id = repo.add(full.clone()).unwrap();
        assert_eq!(repo.get_by_id(&full_id), Some(full));

        // Arbitrary doubles must come back bit-for-bit.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for _ in 0..64 {
            seed = seed
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let fraction = (seed >> 11) as f64 / (1u64 << 53) as f64;
            let mut book = Book::new("Priced", "Someone");
            book.price_usd = Some(fraction * 100.0);
            book.average_rating = Some(fraction * 5.0);
            book.sales_millions = Some(fraction / 3.0);
            let id = repo.add(book.clone()).unwrap();
            assert_eq!(repo.get_by_id(&id), Some(book));
        }
    }

    pub(crate) fn check_failed_modify_writes_nothing<R: BookRepository>(repo: &R) {
        let id = repo.add(Book::new("Dune", "Herbert")).unwrap();
        let result: Result<Option<Book>, StoreError> = repo.modify(&id, |book| {
            book.title = "Changed".to_string();
            Err(StoreError::Serialize(serde::de::Error::custom("rejected")))
        });
        assert!(result.is_err());
        assert_eq!(repo.get_by_id(&id).unwrap().title, "Dune");
    }
}
