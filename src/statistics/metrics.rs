use std::str::FromStr;
use thiserror::Error;

use crate::model::Book;

/// Summary statistics over a collection, keyed by a metric.
pub trait Statistics {
    type Metric;
    /// Mean of the metric over the values that are present.
    fn avg(&self, metric: Self::Metric) -> Option<f64>;
    /// Nearest-rank percentiles (`0.0..=1.0`) of the metric; empty when no
    /// values are present.
    fn calculate_percentile(&self, metric: Self::Metric, percentiles: &[f64]) -> Vec<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookMetric {
    Price,
    Rating,
    RatingsCount,
    PageCount,
    SalesMillions,
    PublicationYear,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown metric {0:?}")]
pub struct UnknownMetric(pub String);

impl BookMetric {
    pub const ALL: [BookMetric; 6] = [
        BookMetric::Price,
        BookMetric::Rating,
        BookMetric::RatingsCount,
        BookMetric::PageCount,
        BookMetric::SalesMillions,
        BookMetric::PublicationYear,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BookMetric::Price => "price",
            BookMetric::Rating => "rating",
            BookMetric::RatingsCount => "ratings_count",
            BookMetric::PageCount => "page_count",
            BookMetric::SalesMillions => "sales_millions",
            BookMetric::PublicationYear => "publication_year",
        }
    }

    /// The metric's value for one book, if recorded.
    pub fn of(&self, book: &Book) -> Option<f64> {
        let value = match self {
            BookMetric::Price => book.price_usd,
            BookMetric::Rating => book.average_rating,
            BookMetric::RatingsCount => book.ratings_count.map(|count| count as f64),
            BookMetric::PageCount => book.page_count.map(f64::from),
            BookMetric::SalesMillions => book.sales_millions,
            BookMetric::PublicationYear => book.publication_year.map(f64::from),
        };
        value.filter(|value| !value.is_nan())
    }
}

impl FromStr for BookMetric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        BookMetric::ALL
            .into_iter()
            .find(|metric| metric.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownMetric(wanted.to_string()))
    }
}
