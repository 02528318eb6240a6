use crate::model::Book;
use crate::statistics::{BookMetric, Statistics};
use std::cmp::Ordering;

impl Statistics for [Book] {
    type Metric = BookMetric;

    fn avg(&self, metric: BookMetric) -> Option<f64> {
        let values: Vec<f64> = self.iter().filter_map(|book| metric.of(book)).collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }

    fn calculate_percentile(&self, metric: BookMetric, percentiles: &[f64]) -> Vec<f64> {
        let mut values: Vec<f64> = self.iter().filter_map(|book| metric.of(book)).collect();

        if values.is_empty() {
            return Vec::new();
        }

        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Less));
        percentiles
            .iter()
            .map(|&p| {
                let idx = ((p.clamp(0.0, 1.0)) * ((values.len() - 1) as f64)).round() as usize;
                values.get(idx).copied().unwrap_or(0.0)
            })
            .collect()
    }
}
