use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::model::Book;
use crate::statistics::{BookMetric, Statistics};

pub const DEFAULT_MIN_RATINGS: u64 = 1000;
pub const DEFAULT_TOP_LIMIT: usize = 10;
pub const DEFAULT_PRIOR_WEIGHT: f64 = 50.0;

/// Mean `price_usd` over books that have one.
pub fn average_price(books: &[Book]) -> Option<f64> {
    books.avg(BookMetric::Price)
}

/// Highest rated books among those with at least `min_ratings` ratings.
/// Books without a rating sort last.
pub fn top_rated(books: &[Book], min_ratings: u64, limit: usize) -> Vec<Book> {
    let mut eligible: Vec<&Book> = books
        .iter()
        .filter(|book| book.ratings_count.is_some_and(|count| count >= min_ratings))
        .collect();
    eligible.sort_by(|a, b| descending(a.average_rating, b.average_rating));
    eligible.into_iter().take(limit).cloned().collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueScore {
    pub book_id: String,
    pub title: String,
    pub score: f64,
}

/// `average_rating * ln(1 + ratings_count) / price_usd` for every book with
/// all three values and a positive price, in collection order.
pub fn value_scores(books: &[Book]) -> Vec<ValueScore> {
    books
        .iter()
        .filter_map(|book| {
            let rating = book.average_rating?;
            let count = book.ratings_count?;
            let price = book.price_usd.filter(|price| *price > 0.0)?;
            Some(ValueScore {
                book_id: book.book_id().to_string(),
                title: book.title.clone(),
                score: rating * (count as f64).ln_1p() / price,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreRating {
    pub genre: String,
    pub mean_average_rating: f64,
    pub median_ratings_count: f64,
    pub weighted_rating: f64,
}

/// Genre ratings shrunk toward the collection-wide mean rating.
///
/// For each genre with mean rating `R` and median ratings count `v`, with the
/// global mean rating `C` and prior weight `m`:
/// `v / (v + m) * R + m / (v + m) * C`. Genres lacking either a rating or a
/// ratings count are left out. Sorted by weighted rating, highest first.
pub fn bayesian_weighted_by_genre(books: &[Book], prior_weight: f64) -> Vec<GenreRating> {
    let Some(global_mean) = books.avg(BookMetric::Rating) else {
        return Vec::new();
    };

    let mut by_genre: BTreeMap<&str, Vec<&Book>> = BTreeMap::new();
    for book in books {
        if let Some(genre) = &book.genre {
            by_genre.entry(genre.as_str()).or_default().push(book);
        }
    }

    let mut ratings: Vec<GenreRating> = by_genre
        .into_iter()
        .filter_map(|(genre, members)| {
            let rated: Vec<f64> = members
                .iter()
                .filter_map(|book| BookMetric::Rating.of(book))
                .collect();
            let counts: Vec<f64> = members
                .iter()
                .filter_map(|book| BookMetric::RatingsCount.of(book))
                .collect();
            let mean = mean(&rated)?;
            let median_count = median(counts)?;
            let total = median_count + prior_weight;
            if total == 0.0 {
                return None;
            }
            Some(GenreRating {
                genre: genre.to_string(),
                mean_average_rating: mean,
                median_ratings_count: median_count,
                weighted_rating: median_count / total * mean + prior_weight / total * global_mean,
            })
        })
        .collect();

    ratings.sort_by(|a, b| descending(Some(a.weighted_rating), Some(b.weighted_rating)));
    ratings
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Less));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

// Larger first, missing last.
fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(
        title: &str,
        genre: Option<&str>,
        rating: Option<f64>,
        count: Option<u64>,
        price: Option<f64>,
    ) -> Book {
        let mut book = Book::new(title, "author");
        book.genre = genre.map(str::to_string);
        book.average_rating = rating;
        book.ratings_count = count;
        book.price_usd = price;
        book
    }

    #[test]
    fn test_average_price() {
        let books = vec![
            book("a", None, None, None, Some(10.0)),
            book("b", None, None, None, None),
            book("c", None, None, None, Some(30.0)),
        ];
        assert_eq!(average_price(&books), Some(20.0));
        assert_eq!(average_price(&[]), None);
    }

    #[test]
    fn test_top_rated_filters_and_orders() {
        let books = vec![
            book("few", None, Some(5.0), Some(10), None),
            book("good", None, Some(4.0), Some(2000), None),
            book("best", None, Some(4.8), Some(1000), None),
            book("unrated", None, None, Some(5000), None),
            book("uncounted", None, Some(4.9), None, None),
            book("ok", None, Some(3.0), Some(1500), None),
        ];
        let titles: Vec<String> = top_rated(&books, DEFAULT_MIN_RATINGS, DEFAULT_TOP_LIMIT)
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["best", "good", "ok", "unrated"]);

        let titles: Vec<String> = top_rated(&books, DEFAULT_MIN_RATINGS, 2)
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["best", "good"]);
    }

    #[test]
    fn test_value_scores_need_all_inputs() {
        let books = vec![
            book("full", None, Some(4.0), Some(99), Some(8.0)),
            book("no price", None, Some(4.0), Some(99), None),
            book("free", None, Some(4.0), Some(99), Some(0.0)),
            book("no rating", None, None, Some(99), Some(8.0)),
        ];
        let scores = value_scores(&books);
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].title, "full");
        let expected = 4.0 * 100f64.ln() / 8.0;
        assert!((scores[0].score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_bayesian_weighted_by_genre() {
        let books = vec![
            book("a", Some("Fantasy"), Some(4.0), Some(100), None),
            book("b", Some("Fantasy"), Some(5.0), Some(300), None),
            book("c", Some("Mystery"), Some(2.0), Some(50), None),
            book("d", None, Some(3.0), Some(10), None),
            book("e", Some("Poetry"), None, Some(10), None),
        ];
        let ratings = bayesian_weighted_by_genre(&books, DEFAULT_PRIOR_WEIGHT);
        assert_eq!(ratings.len(), 2);

        let global = (4.0 + 5.0 + 2.0 + 3.0) / 4.0;
        let fantasy = &ratings[0];
        assert_eq!(fantasy.genre, "Fantasy");
        assert_eq!(fantasy.mean_average_rating, 4.5);
        assert_eq!(fantasy.median_ratings_count, 200.0);
        let expected = 200.0 / 250.0 * 4.5 + 50.0 / 250.0 * global;
        assert!((fantasy.weighted_rating - expected).abs() < 1e-12);

        let mystery = &ratings[1];
        assert_eq!(mystery.genre, "Mystery");
        let expected = 0.5 * 2.0 + 0.5 * global;
        assert!((mystery.weighted_rating - expected).abs() < 1e-12);
    }

    #[test]
    fn test_bayesian_without_ratings_is_empty() {
        let books = vec![book("a", Some("Fantasy"), None, Some(10), None)];
        assert!(bayesian_weighted_by_genre(&books, DEFAULT_PRIOR_WEIGHT).is_empty());
    }

    #[test]
    fn test_median() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(vec![4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(Vec::new()), None);
    }
}
