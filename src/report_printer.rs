// report_printer.rs
use crate::csv_describer::{ColumnSummary, Overview};
use crate::csv_reporter::{CorrelationMatrix, ReportResult, Scalar, Series, Table};
use crate::questions::ChartKind;
use std::fmt::Write;

const BAR_WIDTH: usize = 40;
const MAX_CELL_WIDTH: usize = 45;

/// Turns a result into terminal text. Pure; printing is up to the caller.
pub fn render(result: &ReportResult) -> String {
    let body = match result {
        ReportResult::Series(series) => render_series(series),
        ReportResult::Table(table) => render_table(table),
        ReportResult::Scalar(scalar) => render_scalar(scalar),
        ReportResult::Correlation(matrix) => render_correlation(matrix),
        ReportResult::Overview(overview) => render_overview(overview),
    };
    format!("{}\n\n{}", result.title(), body)
}

pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{:.2}", value)
    }
}

fn render_series(series: &Series) -> String {
    match series.chart {
        ChartKind::Pie => render_shares(series),
        ChartKind::Heatmap | ChartKind::Line if series.key_labels.len() == 2 => {
            render_grid(series)
        }
        ChartKind::Bar | ChartKind::HorizontalBar | ChartKind::Line => render_bars(series),
        _ => {
            let mut headers = series.key_labels.clone();
            headers.push(series.measure_label.clone());
            let rows = series
                .points
                .iter()
                .map(|point| {
                    let mut cells: Vec<String> =
                        point.key.parts().iter().map(|p| p.to_string()).collect();
                    cells.push(format_value(point.value));
                    cells
                })
                .collect::<Vec<_>>();
            format_table(&headers, &rows)
        }
    }
}

fn render_bars(series: &Series) -> String {
    let labels: Vec<String> = series
        .points
        .iter()
        .map(|point| truncate(&point.key.to_string()))
        .collect();
    let label_width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let largest = series
        .points
        .iter()
        .map(|point| point.value.abs())
        .filter(|value| !value.is_nan())
        .fold(0.0_f64, f64::max);

    let mut out = String::new();
    let _ = writeln!(out, "{}", series.measure_label);
    for (label, point) in labels.iter().zip(&series.points) {
        let length = if largest > 0.0 && !point.value.is_nan() {
            ((point.value.abs() / largest) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let glyph = if point.value < 0.0 { "░" } else { "█" };
        let _ = writeln!(
            out,
            "{:<width$} |{} {}",
            label,
            glyph.repeat(length),
            format_value(point.value),
            width = label_width
        );
    }
    let _ = write!(out, "Total rows: {}", series.points.len());
    out
}

fn render_shares(series: &Series) -> String {
    let total: f64 = series
        .points
        .iter()
        .map(|point| point.value)
        .filter(|value| *value > 0.0)
        .sum();
    let headers = vec![
        series.key_labels.join(" / "),
        series.measure_label.clone(),
        "Share (%)".to_string(),
    ];
    let rows = series
        .points
        .iter()
        .map(|point| {
            let share = if total > 0.0 {
                point.value / total * 100.0
            } else {
                f64::NAN
            };
            vec![
                point.key.to_string(),
                format_value(point.value),
                format_value(share),
            ]
        })
        .collect::<Vec<_>>();
    format_table(&headers, &rows)
}

/// Two-part keys become a grid: first part down, second part across.
fn render_grid(series: &Series) -> String {
    let mut row_keys: Vec<String> = Vec::new();
    let mut column_keys: Vec<String> = Vec::new();
    for point in &series.points {
        let parts = point.key.parts();
        let (row, column) = (parts[0].to_string(), parts[1].to_string());
        if !row_keys.contains(&row) {
            row_keys.push(row);
        }
        if !column_keys.contains(&column) {
            column_keys.push(column);
        }
    }
    column_keys.sort();

    let mut headers = vec![series.key_labels[0].clone()];
    headers.extend(column_keys.iter().cloned());

    let rows = row_keys
        .iter()
        .map(|row_key| {
            let mut cells = vec![row_key.clone()];
            for column_key in &column_keys {
                let cell = series
                    .value_of(&[row_key.as_str(), column_key.as_str()])
                    .map(format_value)
                    .unwrap_or_default();
                cells.push(cell);
            }
            cells
        })
        .collect::<Vec<_>>();

    format!("{}\n{}", series.measure_label, format_table(&headers, &rows))
}

fn render_table(table: &Table) -> String {
    let mut headers = table.key_labels.clone();
    headers.extend(table.measure_labels.iter().cloned());
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let mut cells: Vec<String> = row.key.parts().iter().map(|p| p.to_string()).collect();
            cells.extend(row.values.iter().map(|v| format_value(*v)));
            cells
        })
        .collect::<Vec<_>>();
    format_table(&headers, &rows)
}

fn render_scalar(scalar: &Scalar) -> String {
    match &scalar.key {
        Some(key) => format!("{}: {} ({})", scalar.label, key, format_value(scalar.value)),
        None => format!("{}: n/a", scalar.label),
    }
}

fn render_correlation(matrix: &CorrelationMatrix) -> String {
    let mut headers = vec![String::new()];
    headers.extend(matrix.columns.iter().cloned());
    let rows = matrix
        .columns
        .iter()
        .zip(&matrix.values)
        .map(|(name, values)| {
            let mut cells = vec![name.clone()];
            cells.extend(values.iter().map(|v| {
                if v.is_nan() {
                    "NaN".to_string()
                } else {
                    format!("{:.3}", v)
                }
            }));
            cells
        })
        .collect::<Vec<_>>();
    format_table(&headers, &rows)
}

fn render_overview(overview: &Overview) -> String {
    let headers: Vec<String> = overview
        .columns
        .iter()
        .map(|field| field.header().to_string())
        .collect();
    let head_rows = overview
        .head
        .iter()
        .map(|record| {
            overview
                .columns
                .iter()
                .map(|field| record.display_value(*field))
                .collect()
        })
        .collect::<Vec<Vec<String>>>();

    let mut stat_headers = vec![String::new()];
    stat_headers.extend(overview.summaries.iter().map(|s| s.column.clone()));
    let stat_rows = ColumnSummary::STATISTICS
        .iter()
        .enumerate()
        .map(|(i, statistic)| {
            let mut cells = vec![statistic.to_string()];
            cells.extend(overview.summaries.iter().map(|s| format_value(s.values()[i])));
            cells
        })
        .collect::<Vec<_>>();

    format!(
        "First {} of {} rows\n{}\n\nSummary\n{}",
        overview.head.len(),
        overview.row_count,
        format_table(&headers, &head_rows),
        format_table(&stat_headers, &stat_rows)
    )
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
        cut.push_str("...");
        cut
    }
}

/// Pipe-delimited table with a dashed rule under the header.
pub fn format_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let headers: Vec<String> = headers.iter().map(|h| truncate(h)).collect();
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|cell| truncate(cell)).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| {
        let mut text = String::from("|");
        for (i, width) in widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let _ = write!(text, "{:<width$} |", cell, width = width);
        }
        text
    };

    let header_line = line(&headers);
    let mut out = String::new();
    let _ = writeln!(out, "{}", header_line);
    let _ = writeln!(out, "{}", "-".repeat(header_line.chars().count()));
    for row in &rows {
        let _ = writeln!(out, "{}", line(row));
    }
    let _ = write!(out, "Total rows: {}", rows.len());
    out
}
