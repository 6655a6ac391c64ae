// csv_describer.rs
use crate::sales_data::{Dataset, Field, Transaction};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl ColumnSummary {
    pub const STATISTICS: [&'static str; 8] =
        ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

    /// Values in the order of `STATISTICS`.
    pub fn values(&self) -> [f64; 8] {
        [
            self.count as f64,
            self.mean,
            self.std,
            self.min,
            self.q25,
            self.median,
            self.q75,
            self.max,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub row_count: usize,
    pub columns: Vec<Field>,
    pub head: Vec<Transaction>,
    pub summaries: Vec<ColumnSummary>,
}

/// First rows plus per-column statistics for every measure column present.
/// Row ID and Postal Code are never loaded, so they have no summary.
pub fn describe(dataset: &Dataset, head_rows: usize) -> Overview {
    let summaries = Field::NUMERIC
        .iter()
        .filter(|field| dataset.has_column(**field))
        .map(|field| {
            let values: Vec<f64> = dataset
                .records()
                .iter()
                .filter_map(|record| record.number(*field))
                .collect();
            summarize(field.header(), &values)
        })
        .collect();

    Overview {
        row_count: dataset.len(),
        columns: dataset.columns(),
        head: dataset.records().iter().take(head_rows).cloned().collect(),
        summaries,
    }
}

pub fn summarize(column: &str, values: &[f64]) -> ColumnSummary {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    let count = sorted.len();

    let mean = if count == 0 {
        f64::NAN
    } else {
        sorted.iter().sum::<f64>() / count as f64
    };
    // Sample standard deviation, undefined below two values.
    let std = if count < 2 {
        f64::NAN
    } else {
        let squares: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        (squares / (count - 1) as f64).sqrt()
    };

    ColumnSummary {
        column: column.to_string(),
        count,
        mean,
        std,
        min: sorted.first().copied().unwrap_or(f64::NAN),
        q25: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q75: quantile(&sorted, 0.75),
        max: sorted.last().copied().unwrap_or(f64::NAN),
    }
}

/// Linear interpolation between the closest ranks of an ascending slice.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}
