pub mod charts;
mod imp;
pub mod metrics;
pub mod ranking;

pub use charts::{ChartKind, ChartPoint, ChartSeries};
pub use metrics::{BookMetric, Statistics, UnknownMetric};
pub use ranking::{
    average_price, bayesian_weighted_by_genre, top_rated, value_scores, GenreRating, ValueScore,
};
