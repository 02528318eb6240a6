use serde::Serialize;
use std::io::Write;

use crate::export::{Export, ExportError};
use crate::model::{Book, HistoryEntry};

#[derive(Serialize)]
struct BookExportRow<'a> {
    book_id: &'a str,
    title: &'a str,
    author: &'a str,
    genre: Option<&'a str>,
    publication_year: Option<i32>,
    page_count: Option<u32>,
    average_rating: Option<f64>,
    ratings_count: Option<u64>,
    price_usd: Option<f64>,
    publisher: Option<&'a str>,
    language: Option<&'a str>,
    format: Option<&'a str>,
    in_print: Option<bool>,
    sales_millions: Option<f64>,
    last_checkout: Option<String>,
    available: bool,
    checked_out_by: Option<&'a str>,
    checkouts: usize,
}

fn to_export_row(book: &Book) -> BookExportRow<'_> {
    BookExportRow {
        book_id: book.book_id(),
        title: &book.title,
        author: &book.author,
        genre: book.genre.as_deref(),
        publication_year: book.publication_year,
        page_count: book.page_count,
        average_rating: book.average_rating,
        ratings_count: book.ratings_count,
        price_usd: book.price_usd,
        publisher: book.publisher.as_deref(),
        language: book.language.as_deref(),
        format: book.format.as_deref(),
        in_print: book.in_print,
        sales_millions: book.sales_millions,
        last_checkout: book
            .last_checkout
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string()),
        available: book.is_available(),
        checked_out_by: book.checked_out_by(),
        checkouts: book
            .checkout_history()
            .iter()
            .filter(|entry| entry.is_checkout())
            .count(),
    }
}

fn or_na<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

impl Export for [Book] {
    fn to_csv(&self) -> Result<String, ExportError> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for book in self {
            wtr.serialize(to_export_row(book))?;
        }
        Ok(String::from_utf8(wtr.into_inner()?)?)
    }

    fn to_md(&self) -> Result<String, ExportError> {
        let mut buffer = Vec::new();
        for book in self {
            writeln!(buffer, "### {}", book.title)?;
            writeln!(buffer, "\n*{}*", book.author)?;
            writeln!(buffer, "\n**Genre:** {}", or_na(book.genre.as_deref()))?;
            writeln!(buffer, "**Published:** {}", or_na(book.publication_year))?;
            writeln!(
                buffer,
                "**Rating:** {} ({} ratings)",
                or_na(book.average_rating),
                or_na(book.ratings_count)
            )?;
            writeln!(
                buffer,
                "**Price:** {}",
                or_na(book.price_usd.map(|p| format!("${p:.2}")))
            )?;
            match book.checked_out_by() {
                Some(borrower) => writeln!(buffer, "**Status:** checked out by {borrower}")?,
                None => writeln!(buffer, "**Status:** available")?,
            }
            if !book.checkout_history().is_empty() {
                writeln!(buffer, "\n| Action | When | Who | Due |")?;
                writeln!(buffer, "|--------|------|-----|-----|")?;
                for entry in book.checkout_history() {
                    let due = match entry {
                        HistoryEntry::Checkout { due_date, .. } => or_na(*due_date),
                        HistoryEntry::Checkin { .. } => String::new(),
                    };
                    writeln!(
                        buffer,
                        "| {} | {} | {} | {} |",
                        entry.action(),
                        entry.timestamp().format("%Y-%m-%d %H:%M"),
                        or_na(entry.user_email()),
                        due
                    )?;
                }
            }
            writeln!(buffer, "\n---\n")?;
        }
        Ok(String::from_utf8(buffer)?)
    }

    fn to_json(&self) -> Result<String, ExportError> {
        serde_json::to_string_pretty(self).map_err(ExportError::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn build_book() -> Book {
        let mut book = Book::from_record(json!({
            "book_id": "book1",
            "title": "Book Title",
            "author": "Author 1",
            "genre": "Mystery",
            "price_usd": 12.5,
        }))
        .unwrap();
        let when = NaiveDate::from_ymd_opt(2025, 7, 5)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        book.check_out_at(when, Some("a@b.com"), NaiveDate::from_ymd_opt(2025, 8, 1))
            .unwrap();
        book
    }

    #[test]
    fn test_books_to_csv() {
        let books = [build_book()];
        let expected = [
            "book_id,title,author,genre,publication_year,page_count,average_rating,ratings_count,price_usd,publisher,language,format,in_print,sales_millions,last_checkout,available,checked_out_by,checkouts",
            "book1,Book Title,Author 1,Mystery,,,,,12.5,,,,,,2025-07-05 10:00:00,false,a@b.com,1",
            "",
        ]
        .join("\n");
        assert_eq!(books.to_csv().unwrap(), expected);
    }

    #[test]
    fn test_books_to_md() {
        let books = [build_book()];
        let md = books.to_md().unwrap();
        assert!(md.starts_with("### Book Title\n"));
        assert!(md.contains("**Price:** $12.50"));
        assert!(md.contains("**Status:** checked out by a@b.com"));
        assert!(md.contains("| checkout | 2025-07-05 10:00 | a@b.com | 2025-08-01 |"));
    }

    #[test]
    fn test_books_to_json_is_the_record_list() {
        let books = [build_book()];
        let value: serde_json::Value = serde_json::from_str(&books.to_json().unwrap()).unwrap();
        assert_eq!(value, json!([books[0].to_record().unwrap()]));
    }
}
