use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::Book;
use crate::statistics::{BookMetric, Statistics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Scatter,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: String,
    pub y: f64,
}

impl ChartPoint {
    fn new(x: impl ToString, y: f64) -> Self {
        Self { x: x.to_string(), y }
    }
}

/// The data behind one chart, ready to be handed to a plotting tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    /// File stem used when the series is written out.
    pub name: &'static str,
    pub kind: ChartKind,
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub points: Vec<ChartPoint>,
}

/// Number of books per genre, most common first.
pub fn genre_counts(books: &[Book]) -> ChartSeries {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for genre in books.iter().filter_map(|book| book.genre.as_deref()) {
        *counts.entry(genre).or_default() += 1;
    }
    let mut counts: Vec<(&str, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    ChartSeries {
        name: "genre_counts",
        kind: ChartKind::Bar,
        title: "Books per Genre",
        x_label: "Genre",
        y_label: "Count",
        points: counts
            .into_iter()
            .map(|(genre, count)| ChartPoint::new(genre, count as f64))
            .collect(),
    }
}

/// Mean rating per genre, highest first.
pub fn genre_ratings(books: &[Book]) -> ChartSeries {
    let mut by_genre: BTreeMap<&str, Vec<Book>> = BTreeMap::new();
    for book in books {
        if let Some(genre) = &book.genre {
            by_genre.entry(genre.as_str()).or_default().push(book.clone());
        }
    }
    let mut means: Vec<(&str, f64)> = by_genre
        .into_iter()
        .filter_map(|(genre, members)| Some((genre, members.avg(BookMetric::Rating)?)))
        .collect();
    means.sort_by(|a, b| b.1.total_cmp(&a.1));

    ChartSeries {
        name: "genre_ratings",
        kind: ChartKind::Bar,
        title: "Average Rating by Genre",
        x_label: "Genre",
        y_label: "Average Rating",
        points: means
            .into_iter()
            .map(|(genre, mean)| ChartPoint::new(genre, mean))
            .collect(),
    }
}

/// One point per book that has both a price and a rating.
pub fn price_vs_rating(books: &[Book]) -> ChartSeries {
    ChartSeries {
        name: "price_vs_rating",
        kind: ChartKind::Scatter,
        title: "Price vs Average Rating",
        x_label: "Price (USD)",
        y_label: "Average Rating",
        points: books
            .iter()
            .filter_map(|book| Some(ChartPoint::new(book.price_usd?, book.average_rating?)))
            .collect(),
    }
}

/// Books released per publication year, oldest first.
pub fn books_by_year(books: &[Book]) -> ChartSeries {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for year in books.iter().filter_map(|book| book.publication_year) {
        *counts.entry(year).or_default() += 1;
    }

    ChartSeries {
        name: "books_by_year",
        kind: ChartKind::Line,
        title: "Books Released by Year",
        x_label: "Year",
        y_label: "Number of Books",
        points: counts
            .into_iter()
            .map(|(year, count)| ChartPoint::new(year, count as f64))
            .collect(),
    }
}

pub fn availability(books: &[Book]) -> ChartSeries {
    let available = books.iter().filter(|book| book.is_available()).count();
    let checked_out = books.len() - available;

    ChartSeries {
        name: "availability_pie",
        kind: ChartKind::Pie,
        title: "Available vs Checked Out",
        x_label: "Status",
        y_label: "Count",
        points: vec![
            ChartPoint::new("Available", available as f64),
            ChartPoint::new("Checked out", checked_out as f64),
        ],
    }
}

pub fn all_charts(books: &[Book]) -> Vec<ChartSeries> {
    vec![
        genre_counts(books),
        genre_ratings(books),
        price_vs_rating(books),
        books_by_year(books),
        availability(books),
    ]
}
