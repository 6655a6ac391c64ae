// csv_reporter.rs
use crate::csv_describer::{describe, Overview};
use crate::errors::ComputeError;
use crate::questions::{resolve, Aggregation, ChartKind, PostProcess, Question, QuestionSpec};
use crate::sales_data::{Dataset, DerivedView, Field, GroupKey, KeyPart, MeasureColumn};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

pub const DEFAULT_OVERVIEW_ROWS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub key: GroupKey,
    pub value: f64,
}

/// One measure per key, in presentation order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub title: String,
    pub chart: ChartKind,
    pub key_labels: Vec<String>,
    pub measure_label: String,
    pub points: Vec<Point>,
}

impl Series {
    pub fn value_of(&self, key: &[&str]) -> Option<f64> {
        self.points
            .iter()
            .find(|point| point.key.matches(key))
            .map(|point| point.value)
    }

    pub fn keys(&self) -> Vec<String> {
        self.points.iter().map(|point| point.key.to_string()).collect()
    }

    pub fn total(&self) -> f64 {
        self.points
            .iter()
            .map(|point| point.value)
            .filter(|value| !value.is_nan())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub key: GroupKey,
    pub values: Vec<f64>,
}

/// Several measures per key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub title: String,
    pub chart: ChartKind,
    pub key_labels: Vec<String>,
    pub measure_labels: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn row(&self, key: &[&str]) -> Option<&[f64]> {
        self.rows
            .iter()
            .find(|row| row.key.matches(key))
            .map(|row| row.values.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scalar {
    pub title: String,
    pub label: String,
    pub key: Option<GroupKey>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub title: String,
    pub chart: ChartKind,
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == row)?;
        let j = self.columns.iter().position(|c| c == column)?;
        Some(self.values[i][j])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportResult {
    Series(Series),
    Table(Table),
    Scalar(Scalar),
    Correlation(CorrelationMatrix),
    Overview(Overview),
}

impl ReportResult {
    pub fn title(&self) -> &str {
        match self {
            ReportResult::Series(series) => &series.title,
            ReportResult::Table(table) => &table.title,
            ReportResult::Scalar(scalar) => &scalar.title,
            ReportResult::Correlation(matrix) => &matrix.title,
            ReportResult::Overview(_) => crate::questions::OVERVIEW,
        }
    }
}

/// Answers one question against the dataset.
pub fn run(dataset: &Dataset, question_id: &str) -> Result<ReportResult, ComputeError> {
    run_with_overview_rows(dataset, question_id, DEFAULT_OVERVIEW_ROWS)
}

pub fn run_with_overview_rows(
    dataset: &Dataset,
    question_id: &str,
    overview_rows: usize,
) -> Result<ReportResult, ComputeError> {
    match resolve(question_id)? {
        Question::Overview => Ok(ReportResult::Overview(describe(dataset, overview_rows))),
        Question::Catalog(spec) => execute(dataset, spec),
    }
}

/// The single executor behind every catalog question.
pub fn execute(dataset: &Dataset, spec: &QuestionSpec) -> Result<ReportResult, ComputeError> {
    for field in spec.required_fields() {
        dataset.require(field)?;
    }

    let view = DerivedView::new(dataset);
    let result = match spec.aggregation {
        Aggregation::Correlation => ReportResult::Correlation(correlate(&view, spec)),
        _ => {
            let rows = aggregate(&view, spec);
            finish(spec, rows)
        }
    };

    debug!(
        question = spec.id,
        derived = ?view.derived_columns(),
        "question answered"
    );
    Ok(result)
}

/// Rows missing a value in any key column belong to no group.
fn group_rows(view: &DerivedView<'_>, spec: &QuestionSpec) -> BTreeMap<GroupKey, Vec<usize>> {
    let mut groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
    for row in 0..view.dataset().len() {
        let parts: Option<Vec<KeyPart>> = spec
            .keys
            .iter()
            .map(|column| view.key_part(*column, row))
            .collect();
        if let Some(parts) = parts {
            groups.entry(GroupKey(parts)).or_default().push(row);
        }
    }
    groups
}

fn aggregate(view: &DerivedView<'_>, spec: &QuestionSpec) -> Vec<TableRow> {
    group_rows(view, spec)
        .into_iter()
        .map(|(key, rows)| {
            let values = match spec.aggregation {
                Aggregation::CountDistinct(field) => {
                    vec![count_distinct(view, field, &rows) as f64]
                }
                Aggregation::SumPerDistinct(field) => {
                    let distinct = count_distinct(view, field, &rows) as f64;
                    spec.measures
                        .iter()
                        .map(|measure| ratio(sum(view, *measure, &rows), distinct))
                        .collect()
                }
                Aggregation::Mean => spec
                    .measures
                    .iter()
                    .map(|measure| mean(view, *measure, &rows))
                    .collect(),
                Aggregation::Sum | Aggregation::Correlation => spec
                    .measures
                    .iter()
                    .map(|measure| sum(view, *measure, &rows))
                    .collect(),
            };
            TableRow { key, values }
        })
        .collect()
}

fn measure_values(view: &DerivedView<'_>, measure: MeasureColumn, rows: &[usize]) -> Vec<f64> {
    rows.iter()
        .map(|row| view.measure(measure, *row))
        .filter(|value| !value.is_nan())
        .collect()
}

fn sum(view: &DerivedView<'_>, measure: MeasureColumn, rows: &[usize]) -> f64 {
    measure_values(view, measure, rows).iter().sum()
}

/// Mean over the defined values; NaN when none are.
fn mean(view: &DerivedView<'_>, measure: MeasureColumn, rows: &[usize]) -> f64 {
    let values = measure_values(view, measure, rows);
    ratio(values.iter().sum::<f64>(), values.len() as f64)
}

fn count_distinct(view: &DerivedView<'_>, field: Field, rows: &[usize]) -> usize {
    let records = view.dataset().records();
    rows.iter()
        .filter_map(|row| records[*row].text(field))
        .filter(|value| !value.is_empty())
        .collect::<HashSet<&str>>()
        .len()
}

/// Division that yields NaN instead of infinities on a zero denominator.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || denominator.is_nan() {
        f64::NAN
    } else {
        numerator / denominator
    }
}

/// Period-over-period growth in percent; the first period has none.
pub fn percent_change(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, current)| match i {
            0 => f64::NAN,
            _ => ratio(current - values[i - 1], values[i - 1]) * 100.0,
        })
        .collect()
}

/// Pearson correlation over the pairs where both values are present. NaN
/// when either side has no variance or fewer than two pairs remain.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(x, y)| (*x, *y))
        .collect();
    let n = pairs.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n as f64;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

fn correlate(view: &DerivedView<'_>, spec: &QuestionSpec) -> CorrelationMatrix {
    let all_rows: Vec<usize> = (0..view.dataset().len()).collect();
    let columns: Vec<Vec<f64>> = spec
        .measures
        .iter()
        .map(|measure| all_rows.iter().map(|row| view.measure(*measure, *row)).collect())
        .collect();

    let values = columns
        .iter()
        .map(|xs| columns.iter().map(|ys| pearson(xs, ys)).collect())
        .collect();

    CorrelationMatrix {
        title: spec.label(),
        chart: spec.chart,
        columns: spec.measures.iter().map(|m| m.label().to_string()).collect(),
        values,
    }
}

/// Orders by measure with NaN last. Callers rely on the sort being stable so
/// equal measures keep their key order.
fn compare_measures(a: f64, b: f64, descending: bool) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ordering = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        }
    }
}

fn rank(rows: &mut Vec<TableRow>, descending: bool, limit: Option<usize>) {
    rows.sort_by(|a, b| compare_measures(a.values[0], b.values[0], descending));
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
}

fn measure_labels(spec: &QuestionSpec) -> Vec<String> {
    match spec.aggregation {
        Aggregation::CountDistinct(field) => vec![format!("{} (distinct)", field)],
        Aggregation::SumPerDistinct(field) => spec
            .measures
            .iter()
            .map(|m| format!("{} per {}", m.label(), field))
            .collect(),
        Aggregation::Mean => spec
            .measures
            .iter()
            .map(|m| format!("Average {}", m.label()))
            .collect(),
        Aggregation::Sum | Aggregation::Correlation => spec
            .measures
            .iter()
            .map(|m| format!("Total {}", m.label()))
            .collect(),
    }
}

fn finish(spec: &QuestionSpec, mut rows: Vec<TableRow>) -> ReportResult {
    let mut labels = measure_labels(spec);

    match spec.post {
        PostProcess::None => {}
        PostProcess::SortAscending => rank(&mut rows, false, None),
        PostProcess::SortDescending => rank(&mut rows, true, None),
        PostProcess::Top(n) => rank(&mut rows, true, Some(n)),
        PostProcess::Bottom(n) => rank(&mut rows, false, Some(n)),
        PostProcess::ArgMax => return arg_max(spec, &rows, &labels[0]),
        PostProcess::PercentChange => {
            let totals: Vec<f64> = rows.iter().map(|row| row.values[0]).collect();
            for (row, growth) in rows.iter_mut().zip(percent_change(&totals)) {
                row.values = vec![growth];
            }
            labels = vec![format!("{} growth (%)", spec.measures[0].label())];
        }
    }

    let key_labels = spec.keys.iter().map(|k| k.label().to_string()).collect();
    if labels.len() == 1 {
        ReportResult::Series(Series {
            title: spec.label(),
            chart: spec.chart,
            key_labels,
            measure_label: labels.remove(0),
            points: rows
                .into_iter()
                .map(|row| Point {
                    key: row.key,
                    value: row.values[0],
                })
                .collect(),
        })
    } else {
        ReportResult::Table(Table {
            title: spec.label(),
            chart: spec.chart,
            key_labels,
            measure_labels: labels,
            rows,
        })
    }
}

/// First key holding the largest measure, like an idxmax.
fn arg_max(spec: &QuestionSpec, rows: &[TableRow], measure_label: &str) -> ReportResult {
    let best = rows
        .iter()
        .filter(|row| !row.values[0].is_nan())
        .fold(None::<&TableRow>, |best, row| match best {
            Some(current) if current.values[0] >= row.values[0] => Some(current),
            _ => Some(row),
        });

    let key_label = spec
        .keys
        .iter()
        .map(|k| k.label())
        .collect::<Vec<_>>()
        .join(" / ");
    ReportResult::Scalar(Scalar {
        title: spec.label(),
        label: format!("{} with highest {}", key_label, measure_label),
        key: best.map(|row| row.key.clone()),
        value: best.map(|row| row.values[0]).unwrap_or(f64::NAN),
    })
}
