use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::history::HistoryEntry;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("unknown or read-only book field: {0}")]
    UnknownField(String),
    #[error("field {field} cannot be cleared")]
    NotNullable { field: BookField },
    #[error("invalid value {value:?} for field {field}: {reason}")]
    InvalidValue {
        field: BookField,
        value: String,
        reason: String,
    },
}

/// Partial update of a stored book.
///
/// `None` leaves a field untouched. For nullable fields the inner option is
/// the new value, so `Some(None)` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BookPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub genre: Option<Option<String>>,
    #[serde(
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub publication_year: Option<Option<i32>>,
    #[serde(
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub page_count: Option<Option<u32>>,
    #[serde(
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub average_rating: Option<Option<f64>>,
    #[serde(
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub ratings_count: Option<Option<u64>>,
    #[serde(
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub price_usd: Option<Option<f64>>,
    #[serde(
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub publisher: Option<Option<String>>,
    #[serde(
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub language: Option<Option<String>>,
    #[serde(
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub format: Option<Option<String>>,
    #[serde(
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub in_print: Option<Option<bool>>,
    #[serde(
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub sales_millions: Option<Option<f64>>,
    #[serde(
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_checkout: Option<Option<NaiveDateTime>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub checked_out_by: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_history: Option<Vec<HistoryEntry>>,
}

// A key that is present (even as null) becomes `Some(..)`; absent keys fall
// back to `Default`, i.e. `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Book fields that can be edited from text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookField {
    Title,
    Author,
    Genre,
    PublicationYear,
    PageCount,
    AverageRating,
    RatingsCount,
    PriceUsd,
    Publisher,
    Language,
    Format,
    InPrint,
    SalesMillions,
    LastCheckout,
    Available,
    CheckedOutBy,
}

impl BookField {
    pub const ALL: [BookField; 16] = [
        BookField::Title,
        BookField::Author,
        BookField::Genre,
        BookField::PublicationYear,
        BookField::PageCount,
        BookField::AverageRating,
        BookField::RatingsCount,
        BookField::PriceUsd,
        BookField::Publisher,
        BookField::Language,
        BookField::Format,
        BookField::InPrint,
        BookField::SalesMillions,
        BookField::LastCheckout,
        BookField::Available,
        BookField::CheckedOutBy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BookField::Title => "title",
            BookField::Author => "author",
            BookField::Genre => "genre",
            BookField::PublicationYear => "publication_year",
            BookField::PageCount => "page_count",
            BookField::AverageRating => "average_rating",
            BookField::RatingsCount => "ratings_count",
            BookField::PriceUsd => "price_usd",
            BookField::Publisher => "publisher",
            BookField::Language => "language",
            BookField::Format => "format",
            BookField::InPrint => "in_print",
            BookField::SalesMillions => "sales_millions",
            BookField::LastCheckout => "last_checkout",
            BookField::Available => "available",
            BookField::CheckedOutBy => "checked_out_by",
        }
    }
}

impl fmt::Display for BookField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BookField {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        BookField::ALL
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PatchError::UnknownField(wanted.to_string()))
    }
}

impl BookPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Sets one field from its text form. Blank input or `null` clears a
    /// nullable field.
    pub fn set(&mut self, field: BookField, raw: &str) -> Result<&mut Self, PatchError> {
        let value = raw.trim();
        let cleared = value.is_empty() || value.eq_ignore_ascii_case("null");

        match field {
            BookField::Title | BookField::Author | BookField::Available if cleared => {
                return Err(PatchError::NotNullable { field });
            }
            BookField::Title => self.title = Some(value.to_string()),
            BookField::Author => self.author = Some(value.to_string()),
            BookField::Available => self.available = Some(parse(field, value)?),
            BookField::Genre => self.genre = Some(text(value, cleared)),
            BookField::Publisher => self.publisher = Some(text(value, cleared)),
            BookField::Language => self.language = Some(text(value, cleared)),
            BookField::Format => self.format = Some(text(value, cleared)),
            BookField::CheckedOutBy => self.checked_out_by = Some(text(value, cleared)),
            BookField::PublicationYear => {
                self.publication_year = Some(parse_opt(field, value, cleared)?)
            }
            BookField::PageCount => self.page_count = Some(parse_opt(field, value, cleared)?),
            BookField::AverageRating => {
                self.average_rating = Some(parse_finite(field, value, cleared)?)
            }
            BookField::RatingsCount => {
                self.ratings_count = Some(parse_opt(field, value, cleared)?)
            }
            BookField::PriceUsd => self.price_usd = Some(parse_finite(field, value, cleared)?),
            BookField::InPrint => self.in_print = Some(parse_opt(field, value, cleared)?),
            BookField::SalesMillions => {
                self.sales_millions = Some(parse_finite(field, value, cleared)?)
            }
            BookField::LastCheckout => {
                self.last_checkout = Some(parse_opt(field, value, cleared)?)
            }
        }
        Ok(self)
    }

    /// Builds a single-field patch from a field name and its text value.
    pub fn from_text(field: &str, raw: &str) -> Result<Self, PatchError> {
        let mut patch = Self::new();
        patch.set(field.parse()?, raw)?;
        Ok(patch)
    }
}

fn text(value: &str, cleared: bool) -> Option<String> {
    (!cleared).then(|| value.to_string())
}

fn parse<T>(field: BookField, value: &str) -> Result<T, PatchError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.parse().map_err(|e: T::Err| PatchError::InvalidValue {
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_opt<T>(field: BookField, value: &str, cleared: bool) -> Result<Option<T>, PatchError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    if cleared {
        Ok(None)
    } else {
        parse(field, value).map(Some)
    }
}

// JSON has no NaN or infinity, so they would not survive a save.
fn parse_finite(field: BookField, value: &str, cleared: bool) -> Result<Option<f64>, PatchError> {
    match parse_opt::<f64>(field, value, cleared)? {
        Some(n) if !n.is_finite() => Err(PatchError::InvalidValue {
            field,
            value: value.to_string(),
            reason: "must be a finite number".to_string(),
        }),
        parsed => Ok(parsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_names_parse() {
        assert_eq!("price_usd".parse::<BookField>().unwrap(), BookField::PriceUsd);
        assert_eq!(" Title ".parse::<BookField>().unwrap(), BookField::Title);
        assert_eq!(
            "book_id".parse::<BookField>().unwrap_err(),
            PatchError::UnknownField("book_id".to_string())
        );
        for field in BookField::ALL {
            assert_eq!(field.name().parse::<BookField>().unwrap(), field);
        }
    }

    #[test]
    fn test_set_typed_values() {
        let mut patch = BookPatch::new();
        patch
            .set(BookField::PriceUsd, "12.50")
            .unwrap()
            .set(BookField::InPrint, "false")
            .unwrap()
            .set(BookField::Genre, "Mystery")
            .unwrap();
        assert_eq!(patch.price_usd, Some(Some(12.5)));
        assert_eq!(patch.in_print, Some(Some(false)));
        assert_eq!(patch.genre, Some(Some("Mystery".to_string())));
        assert_eq!(patch.title, None);
    }

    #[test]
    fn test_set_clears_nullable_fields() {
        let patch = BookPatch::from_text("genre", "").unwrap();
        assert_eq!(patch.genre, Some(None));
        let patch = BookPatch::from_text("page_count", "null").unwrap();
        assert_eq!(patch.page_count, Some(None));
    }

    #[test]
    fn test_set_rejects_bad_input() {
        assert_eq!(
            BookPatch::from_text("title", "  ").unwrap_err(),
            PatchError::NotNullable {
                field: BookField::Title
            }
        );
        let err = BookPatch::from_text("page_count", "many").unwrap_err();
        assert!(matches!(
            err,
            PatchError::InvalidValue {
                field: BookField::PageCount,
                ..
            }
        ));
    }

    #[test]
    fn test_set_rejects_non_finite_numbers() {
        for raw in ["NaN", "inf", "-infinity"] {
            for field in ["price_usd", "average_rating", "sales_millions"] {
                let Err(PatchError::InvalidValue { reason, .. }) = BookPatch::from_text(field, raw)
                else {
                    panic!("{field} accepted {raw}");
                };
                assert_eq!(reason, "must be a finite number");
            }
        }
        assert_eq!(
            BookPatch::from_text("price_usd", "1e3").unwrap().price_usd,
            Some(Some(1000.0))
        );
    }

    #[test]
    fn test_json_patch_distinguishes_null_from_absent() {
        let patch: BookPatch = serde_json::from_value(json!({
            "title": "Updated Title",
            "genre": null,
        }))
        .unwrap();
        assert_eq!(patch.title.as_deref(), Some("Updated Title"));
        assert_eq!(patch.genre, Some(None));
        assert_eq!(patch.publisher, None);
        assert!(!patch.is_empty());
        assert!(BookPatch::default().is_empty());
    }

    #[test]
    fn test_json_patch_rejects_unknown_keys() {
        let result: Result<BookPatch, _> = serde_json::from_value(json!({ "isbn": "123" }));
        assert!(result.is_err());
    }
}
