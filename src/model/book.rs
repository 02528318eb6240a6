use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use super::history::HistoryEntry;
use super::patch::BookPatch;

/// Borrower recorded when a book is checked out without an email, so that a
/// checked-out book never has an empty `checked_out_by`.
pub const ANONYMOUS_BORROWER: &str = "anonymous";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookStateError {
    #[error("book {0} is already checked out")]
    AlreadyCheckedOut(String),
    #[error("book {0} is already available")]
    AlreadyAvailable(String),
}

/// A book in the personal library.
///
/// Descriptive fields are public. Identity and loan state are private so that
/// `available == checked_out_by.is_none()` holds for every value, and the
/// checkout history only ever grows through [`Book::check_out`] and
/// [`Book::check_in`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BookRecord")]
pub struct Book {
    book_id: String,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub publication_year: Option<i32>,
    pub page_count: Option<u32>,
    pub average_rating: Option<f64>,
    pub ratings_count: Option<u64>,
    pub price_usd: Option<f64>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub format: Option<String>,
    pub in_print: Option<bool>,
    pub sales_millions: Option<f64>,
    pub last_checkout: Option<NaiveDateTime>,
    available: bool,
    checked_out_by: Option<String>,
    checkout_history: Vec<HistoryEntry>,
}

/// Stored shape of a book, lenient about keys older documents lack and about
/// loosely typed values such as numbers saved as text.
#[derive(Deserialize)]
struct BookRecord {
    #[serde(default = "new_book_id")]
    book_id: String,
    title: String,
    author: String,
    #[serde(default, deserialize_with = "coerce")]
    genre: Option<String>,
    #[serde(default, deserialize_with = "coerce")]
    publication_year: Option<i32>,
    #[serde(default, deserialize_with = "coerce")]
    page_count: Option<u32>,
    #[serde(default, deserialize_with = "coerce")]
    average_rating: Option<f64>,
    #[serde(default, deserialize_with = "coerce")]
    ratings_count: Option<u64>,
    #[serde(default, deserialize_with = "coerce")]
    price_usd: Option<f64>,
    #[serde(default, deserialize_with = "coerce")]
    publisher: Option<String>,
    #[serde(default, deserialize_with = "coerce")]
    language: Option<String>,
    #[serde(default, deserialize_with = "coerce")]
    format: Option<String>,
    #[serde(default, deserialize_with = "coerce")]
    in_print: Option<bool>,
    #[serde(default, deserialize_with = "coerce")]
    sales_millions: Option<f64>,
    #[serde(default, deserialize_with = "coerce")]
    last_checkout: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "coerce")]
    available: Option<bool>,
    #[serde(default, deserialize_with = "coerce")]
    checked_out_by: Option<String>,
    #[serde(default)]
    checkout_history: Option<Vec<HistoryEntry>>,
}

fn new_book_id() -> String {
    Uuid::new_v4().to_string()
}

/// Reads any JSON value as `T`, turning values that do not fit into `None`.
fn coerce<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Coerce,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::coerce(&value))
}

trait Coerce: Sized {
    fn coerce(value: &Value) -> Option<Self>;
}

impl Coerce for String {
    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl Coerce for f64 {
    fn coerce(value: &Value) -> Option<Self> {
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        number.filter(|n| n.is_finite())
    }
}

fn whole(n: f64) -> Option<i64> {
    (n.is_finite() && n.fract() == 0.0).then_some(n as i64)
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().and_then(whole))
        }
        _ => None,
    }
}

macro_rules! coerce_integer_as {
    ($($ty:ty),*) => {
        $(impl Coerce for $ty {
            fn coerce(value: &Value) -> Option<Self> {
                coerce_integer(value).and_then(|n| Self::try_from(n).ok())
            }
        })*
    };
}

coerce_integer_as!(i32, u32, u64);

impl Coerce for bool {
    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Coerce for NaiveDateTime {
    fn coerce(value: &Value) -> Option<Self> {
        let s = value.as_str()?.trim();
        s.parse()
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok())
    }
}

impl From<BookRecord> for Book {
    fn from(record: BookRecord) -> Self {
        let mut book = Self {
            book_id: record.book_id,
            title: record.title,
            author: record.author,
            genre: record.genre,
            publication_year: record.publication_year,
            page_count: record.page_count,
            average_rating: record.average_rating,
            ratings_count: record.ratings_count,
            price_usd: record.price_usd,
            publisher: record.publisher,
            language: record.language,
            format: record.format,
            in_print: record.in_print,
            sales_millions: record.sales_millions,
            last_checkout: record.last_checkout,
            available: record.available.unwrap_or(true),
            checked_out_by: record.checked_out_by,
            checkout_history: record.checkout_history.unwrap_or_default(),
        };
        book.reconcile_loan_state();
        book
    }
}

impl Book {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            book_id: new_book_id(),
            title: title.into(),
            author: author.into(),
            genre: None,
            publication_year: None,
            page_count: None,
            average_rating: None,
            ratings_count: None,
            price_usd: None,
            publisher: None,
            language: None,
            format: None,
            in_print: None,
            sales_millions: None,
            last_checkout: None,
            available: true,
            checked_out_by: None,
            checkout_history: Vec::new(),
        }
    }

    pub fn book_id(&self) -> &str {
        &self.book_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn checked_out_by(&self) -> Option<&str> {
        self.checked_out_by.as_deref()
    }

    pub fn checkout_history(&self) -> &[HistoryEntry] {
        &self.checkout_history
    }

    pub fn check_out(
        &mut self,
        user_email: Option<&str>,
        due_date: Option<NaiveDate>,
    ) -> Result<&mut Self, BookStateError> {
        self.check_out_at(Local::now().naive_local(), user_email, due_date)
    }

    /// Checks the book out as of `now`.
    pub fn check_out_at(
        &mut self,
        now: NaiveDateTime,
        user_email: Option<&str>,
        due_date: Option<NaiveDate>,
    ) -> Result<&mut Self, BookStateError> {
        if !self.available {
            return Err(BookStateError::AlreadyCheckedOut(self.book_id.clone()));
        }

        let user_email = user_email.map(str::to_string);
        self.available = false;
        self.last_checkout = Some(now);
        self.checked_out_by = Some(
            user_email
                .clone()
                .unwrap_or_else(|| ANONYMOUS_BORROWER.to_string()),
        );
        self.checkout_history
            .push(HistoryEntry::checkout(now, user_email, due_date));
        Ok(self)
    }

    pub fn check_in(&mut self, user_email: Option<&str>) -> Result<&mut Self, BookStateError> {
        self.check_in_at(Local::now().naive_local(), user_email)
    }

    /// Checks the book back in as of `now`.
    pub fn check_in_at(
        &mut self,
        now: NaiveDateTime,
        user_email: Option<&str>,
    ) -> Result<&mut Self, BookStateError> {
        if self.available {
            return Err(BookStateError::AlreadyAvailable(self.book_id.clone()));
        }

        self.available = true;
        self.checked_out_by = None;
        self.checkout_history
            .push(HistoryEntry::checkin(now, user_email.map(str::to_string)));
        Ok(self)
    }

    /// Complete field-for-field record, with absent values as explicit nulls.
    pub fn to_record(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn from_record(record: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(record)
    }

    /// Overwrites every field the patch names; everything else is left as is.
    pub fn apply_patch(&mut self, patch: &BookPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(author) = &patch.author {
            self.author = author.clone();
        }
        if let Some(genre) = &patch.genre {
            self.genre = genre.clone();
        }
        if let Some(year) = patch.publication_year {
            self.publication_year = year;
        }
        if let Some(pages) = patch.page_count {
            self.page_count = pages;
        }
        if let Some(rating) = patch.average_rating {
            self.average_rating = rating;
        }
        if let Some(count) = patch.ratings_count {
            self.ratings_count = count;
        }
        if let Some(price) = patch.price_usd {
            self.price_usd = price;
        }
        if let Some(publisher) = &patch.publisher {
            self.publisher = publisher.clone();
        }
        if let Some(language) = &patch.language {
            self.language = language.clone();
        }
        if let Some(format) = &patch.format {
            self.format = format.clone();
        }
        if let Some(in_print) = patch.in_print {
            self.in_print = in_print;
        }
        if let Some(sales) = patch.sales_millions {
            self.sales_millions = sales;
        }
        if let Some(last_checkout) = patch.last_checkout {
            self.last_checkout = last_checkout;
        }
        if let Some(history) = &patch.checkout_history {
            self.checkout_history = history.clone();
        }

        match (patch.available, &patch.checked_out_by) {
            (Some(available), Some(by)) => {
                self.available = available;
                self.checked_out_by = by.clone();
            }
            (Some(available), None) => self.available = available,
            (None, Some(by)) => {
                self.available = by.is_none();
                self.checked_out_by = by.clone();
            }
            (None, None) => {}
        }
        self.reconcile_loan_state();
    }

    pub(crate) fn push_history(&mut self, entry: HistoryEntry) {
        self.checkout_history.push(entry);
    }

    // `available` wins when the two loan fields disagree.
    fn reconcile_loan_state(&mut self) {
        if self.available {
            self.checked_out_by = None;
        } else if self.checked_out_by.is_none() {
            self.checked_out_by = Some(ANONYMOUS_BORROWER.to_string());
        }
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {} by {}", self.book_id, self.title, self.author)?;
        if let Some(genre) = &self.genre {
            write!(f, " ({genre})")?;
        }
        match &self.checked_out_by {
            Some(borrower) => write!(f, " [checked out by {borrower}]"),
            None => write!(f, " [available]"),
        }
    }
}
