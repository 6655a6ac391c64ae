// csv_exporter.rs
use crate::csv_describer::ColumnSummary;
use crate::csv_reporter::ReportResult;
use crate::errors::ExportError;
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern compiles"));

fn cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

/// `Q1: Sales by Category` becomes `q1_sales_by_category.csv`.
pub fn default_file_name(result: &ReportResult) -> String {
    let lowered = result.title().to_lowercase();
    let slug = NON_ALPHANUMERIC.replace_all(&lowered, "_");
    format!("{}.csv", slug.trim_matches('_'))
}

fn rows_of(result: &ReportResult) -> (Vec<String>, Vec<Vec<String>>) {
    match result {
        ReportResult::Series(series) => {
            let mut headers = series.key_labels.clone();
            headers.push(series.measure_label.clone());
            let rows = series
                .points
                .iter()
                .map(|point| {
                    let mut row: Vec<String> =
                        point.key.parts().iter().map(|p| p.to_string()).collect();
                    row.push(cell(point.value));
                    row
                })
                .collect();
            (headers, rows)
        }
        ReportResult::Table(table) => {
            let mut headers = table.key_labels.clone();
            headers.extend(table.measure_labels.iter().cloned());
            let rows = table
                .rows
                .iter()
                .map(|row| {
                    let mut cells: Vec<String> =
                        row.key.parts().iter().map(|p| p.to_string()).collect();
                    cells.extend(row.values.iter().map(|v| cell(*v)));
                    cells
                })
                .collect();
            (headers, rows)
        }
        ReportResult::Scalar(scalar) => (
            vec![scalar.label.clone(), "Value".to_string()],
            vec![vec![
                scalar.key.as_ref().map(|k| k.to_string()).unwrap_or_default(),
                cell(scalar.value),
            ]],
        ),
        ReportResult::Correlation(matrix) => {
            let mut headers = vec![String::new()];
            headers.extend(matrix.columns.iter().cloned());
            let rows = matrix
                .columns
                .iter()
                .zip(&matrix.values)
                .map(|(name, values)| {
                    let mut row = vec![name.clone()];
                    row.extend(values.iter().map(|v| cell(*v)));
                    row
                })
                .collect();
            (headers, rows)
        }
        ReportResult::Overview(overview) => {
            let mut headers = vec!["statistic".to_string()];
            headers.extend(overview.summaries.iter().map(|s| s.column.clone()));
            let rows = ColumnSummary::STATISTICS
                .iter()
                .enumerate()
                .map(|(i, statistic)| {
                    let mut row = vec![statistic.to_string()];
                    row.extend(overview.summaries.iter().map(|s| cell(s.values()[i])));
                    row
                })
                .collect();
            (headers, rows)
        }
    }
}

pub fn write_csv<W: Write>(result: &ReportResult, writer: W) -> Result<(), ExportError> {
    let (headers, rows) = rows_of(result);
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&headers)?;
    for row in rows {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Saves the result under `dir`, creating it if needed. Returns the file path.
pub fn save_csv(result: &ReportResult, dir: &Path, file_name: &str) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;
    let file_name = if file_name.ends_with(".csv") {
        file_name.to_string()
    } else {
        format!("{}.csv", file_name)
    };
    let path = dir.join(file_name);
    let file = fs::File::create(&path)?;
    write_csv(result, file)?;
    Ok(path)
}

pub fn to_json(result: &ReportResult) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_reporter::{Point, Series};
    use crate::questions::ChartKind;
    use crate::sales_data::{GroupKey, KeyPart, YearMonth};
    use tempfile::tempdir;

    fn growth() -> ReportResult {
        ReportResult::Series(Series {
            title: "Q38: Yearly Sales Growth".to_string(),
            chart: ChartKind::Line,
            key_labels: vec!["Year".to_string()],
            measure_label: "Sales growth (%)".to_string(),
            points: vec![
                Point {
                    key: GroupKey(vec![KeyPart::Year(2015)]),
                    value: f64::NAN,
                },
                Point {
                    key: GroupKey(vec![KeyPart::Year(2016)]),
                    value: 12.5,
                },
            ],
        })
    }

    #[test]
    fn nan_becomes_an_empty_cell() {
        let mut out = Vec::new();
        write_csv(&growth(), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Year,Sales growth (%)\n2015,\n2016,12.5\n"
        );
    }

    #[test]
    fn nan_becomes_json_null() {
        let json: serde_json::Value = serde_json::from_str(&to_json(&growth()).unwrap()).unwrap();
        assert_eq!(json["kind"], "series");
        assert!(json["points"][0]["value"].is_null());
        assert_eq!(json["points"][1]["key"][0], "2016");
    }

    #[test]
    fn file_names_come_from_the_title() {
        assert_eq!(default_file_name(&growth()), "q38_yearly_sales_growth.csv");
    }

    #[test]
    fn saves_into_a_fresh_directory() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("csv_db");
        let path = save_csv(&growth(), &dir, "growth").unwrap();
        assert_eq!(path, dir.join("growth.csv"));
        let text = fs::read_to_string(path).unwrap();
        assert!(text.starts_with("Year,"));
    }

    #[test]
    fn month_keys_export_as_periods() {
        let result = ReportResult::Series(Series {
            title: "Q8: Monthly Trends in Sales".to_string(),
            chart: ChartKind::Line,
            key_labels: vec!["Month".to_string()],
            measure_label: "Total Sales".to_string(),
            points: vec![Point {
                key: GroupKey(vec![KeyPart::Month(YearMonth { year: 2014, month: 1 })]),
                value: 14236.895,
            }],
        });
        let mut out = Vec::new();
        write_csv(&result, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("2014-01,14236.895"));
    }
}
