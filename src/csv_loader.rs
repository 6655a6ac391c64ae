// csv_loader.rs
use crate::errors::LoadError;
use crate::sales_data::{Dataset, Field, Transaction};
use calamine::{open_workbook_auto, DataType, Reader};
use chrono::{Days, NaiveDate};
use csv::ReaderBuilder;
use encoding_rs::{Encoding, WINDOWS_1252};
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_SOURCE: &str =
    "https://raw.githubusercontent.com/143Himanshujangid/supermart-data-anlaysis/main/pp/superstore.csv";

const WORKBOOK_EXTENSIONS: [&str; 4] = ["xls", "xlsx", "xlsm", "ods"];

const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
];

const SHORT_YEAR_FORMATS: [&str; 2] = ["%m/%d/%y", "%m-%d-%y"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataSource {
    Path(PathBuf),
    Url(String),
}

impl DataSource {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let lowered = raw.to_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            DataSource::Url(raw.to_string())
        } else {
            // One file reached through two spellings is one cache entry.
            let path = PathBuf::from(raw);
            DataSource::Path(std::fs::canonicalize(&path).unwrap_or(path))
        }
    }

    /// Cache key; two sources with the same id are the same dataset.
    pub fn id(&self) -> String {
        self.to_string()
    }

    fn is_workbook(&self) -> bool {
        match self {
            DataSource::Path(path) => path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| WORKBOOK_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false),
            DataSource::Url(_) => false,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Path(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => f.write_str(url),
        }
    }
}

/// What happened to the rows of a source during cleaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub dropped_bad_date: usize,
    pub dropped_malformed: usize,
}

struct CachedLoad {
    dataset: Arc<Dataset>,
    report: LoadReport,
}

/// Loads each source at most once per session.
#[derive(Default)]
pub struct DatasetCache {
    entries: HashMap<String, CachedLoad>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(&mut self, source: &DataSource) -> Result<Arc<Dataset>, LoadError> {
        let key = source.id();
        if let Some(cached) = self.entries.get(&key) {
            debug!(source = %key, "dataset served from cache");
            return Ok(Arc::clone(&cached.dataset));
        }

        let (dataset, report) = load_source(source).await?;
        let dataset = Arc::new(dataset);
        self.entries.insert(
            key,
            CachedLoad {
                dataset: Arc::clone(&dataset),
                report,
            },
        );
        Ok(dataset)
    }

    pub fn report(&self, source: &DataSource) -> Option<&LoadReport> {
        self.entries.get(&source.id()).map(|cached| &cached.report)
    }

    /// Forget a source so the next load reads it again.
    pub fn invalidate(&mut self, source: &DataSource) -> bool {
        self.entries.remove(&source.id()).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads and cleans a source without consulting any cache.
pub async fn load_source(source: &DataSource) -> Result<(Dataset, LoadReport), LoadError> {
    let source_id = source.id();
    let (dataset, report) = match source {
        DataSource::Path(path) if source.is_workbook() => read_workbook(path, &source_id)?,
        DataSource::Path(path) => {
            let bytes = tokio::fs::read(path).await.map_err(|error| LoadError::Io {
                source_id: source_id.clone(),
                error,
            })?;
            parse_csv_bytes(&bytes, &source_id)?
        }
        DataSource::Url(url) => {
            let bytes = fetch(url).await.map_err(|error| LoadError::Fetch {
                source_id: source_id.clone(),
                error,
            })?;
            parse_csv_bytes(&bytes, &source_id)?
        }
    };

    info!(
        source = %source_id,
        rows = report.rows_kept,
        "dataset loaded"
    );
    Ok((dataset, report))
}

async fn fetch(url: &str) -> Result<Vec<u8>, reqwest::Error> {
    let response = reqwest::get(url).await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

/// Parses comma-delimited bytes. Text is Latin-1 unless a byte order mark
/// says otherwise.
pub fn parse_csv_bytes(bytes: &[u8], source_id: &str) -> Result<(Dataset, LoadReport), LoadError> {
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_length)) => (encoding, &bytes[bom_length..]),
        None => (WINDOWS_1252, bytes),
    };

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body);

    let header: Vec<String> = rdr
        .byte_headers()
        .map_err(|error| LoadError::Csv {
            source_id: source_id.to_string(),
            error,
        })?
        .iter()
        .map(|field| decode_field(field, encoding).unwrap_or_default())
        .collect();
    let cleaner = RowCleaner::from_header(&header, source_id)?;

    let rows = rdr.byte_records().map(|result| match result {
        Ok(record) => record
            .iter()
            .map(|field| decode_field(field, encoding))
            .collect::<Option<Vec<String>>>()
            .ok_or_else(|| "undecodable bytes".to_string()),
        Err(error) => Err(error.to_string()),
    });

    collect_rows(&cleaner, rows, source_id)
}

fn decode_field(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(Cow::into_owned)
}

fn read_workbook(path: &Path, source_id: &str) -> Result<(Dataset, LoadReport), LoadError> {
    let workbook_error = |message: String| LoadError::Workbook {
        source_id: source_id.to_string(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| workbook_error(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| workbook_error("workbook has no sheets".to_string()))?
        .map_err(|e| workbook_error(e.to_string()))?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<String>>());
    let header = rows.next().unwrap_or_default();
    let cleaner = RowCleaner::from_header(&header, source_id)?;

    collect_rows(&cleaner, rows.map(Ok), source_id)
}

fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::Empty => String::new(),
        DataType::String(text) | DataType::DateTimeIso(text) => text.trim().to_string(),
        DataType::Int(value) => value.to_string(),
        DataType::Float(value) => value.to_string(),
        DataType::Bool(value) => value.to_string(),
        DataType::DateTime(serial) => excel_serial_date(*serial)
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        other => other.to_string(),
    }
}

/// Spreadsheet day numbers count from 1899-12-30.
fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

/// Coerces an `Order Date` cell. Month-first wins when a value is ambiguous.
pub fn parse_order_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.split(|c: char| c == ' ' || c == 'T').next()?;
    if date_part.is_empty() {
        return None;
    }

    let segments: Vec<&str> = date_part
        .split(|c: char| c == '/' || c == '-' || c == '.')
        .collect();
    let short_year = segments.len() == 3 && segments[0].len() <= 2 && segments[2].len() == 2;

    let formats: &[&str] = if short_year {
        &SHORT_YEAR_FORMATS
    } else {
        &DATE_FORMATS
    };
    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
}

fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn parse_quantity(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        parse_number(raw)
            .filter(|value| value.fract() == 0.0)
            .map(|value| value as i64)
    })
}

enum RowOutcome {
    Kept(Transaction),
    BadDate(String),
    Malformed(String),
}

/// Maps header positions to known fields and turns raw rows into records.
struct RowCleaner {
    layout: Vec<Option<Field>>,
    columns: BTreeSet<Field>,
    date_index: usize,
}

impl RowCleaner {
    fn from_header(header: &[String], source_id: &str) -> Result<Self, LoadError> {
        let layout: Vec<Option<Field>> = header
            .iter()
            .map(|name| Field::from_header(name))
            .collect();
        let date_index = layout
            .iter()
            .position(|field| *field == Some(Field::OrderDate))
            .ok_or_else(|| LoadError::MissingColumn {
                source_id: source_id.to_string(),
                column: Field::OrderDate.header().to_string(),
            })?;
        let columns = layout.iter().flatten().copied().collect();

        Ok(RowCleaner {
            layout,
            columns,
            date_index,
        })
    }

    fn clean(&self, fields: &[String]) -> RowOutcome {
        if fields.len() != self.layout.len() {
            return RowOutcome::Malformed(format!(
                "expected {} fields, found {}",
                self.layout.len(),
                fields.len()
            ));
        }

        let raw_date = &fields[self.date_index];
        let order_date = match parse_order_date(raw_date) {
            Some(date) => date,
            None => return RowOutcome::BadDate(raw_date.clone()),
        };

        let mut record = Transaction {
            order_id: String::new(),
            order_date,
            ship_mode: String::new(),
            customer_id: String::new(),
            region: String::new(),
            state: String::new(),
            segment: String::new(),
            category: String::new(),
            sub_category: String::new(),
            product_name: String::new(),
            sales: 0.0,
            quantity: None,
            discount: 0.0,
            profit: 0.0,
            salesperson: None,
        };

        for (field, raw) in self.layout.iter().zip(fields) {
            let Some(field) = field else { continue };
            let value = raw.clone();
            match field {
                Field::OrderDate => {}
                Field::OrderId => record.order_id = value,
                Field::ShipMode => record.ship_mode = value,
                Field::CustomerId => record.customer_id = value,
                Field::Region => record.region = value,
                Field::State => record.state = value,
                Field::Segment => record.segment = value,
                Field::Category => record.category = value,
                Field::SubCategory => record.sub_category = value,
                Field::ProductName => record.product_name = value,
                Field::Salesperson => {
                    record.salesperson = Some(value).filter(|name| !name.is_empty())
                }
                // Unreadable numbers stay missing; the row still counts.
                Field::Quantity => record.quantity = parse_quantity(raw),
                Field::Sales | Field::Discount | Field::Profit => {
                    let number = parse_number(raw).unwrap_or(f64::NAN);
                    match field {
                        Field::Sales => record.sales = number,
                        Field::Discount => record.discount = number,
                        _ => record.profit = number,
                    }
                }
            }
        }

        RowOutcome::Kept(record)
    }
}

fn collect_rows(
    cleaner: &RowCleaner,
    rows: impl Iterator<Item = Result<Vec<String>, String>>,
    source_id: &str,
) -> Result<(Dataset, LoadReport), LoadError> {
    let mut report = LoadReport::default();
    let mut records = Vec::new();

    for (index, row) in rows.enumerate() {
        report.rows_read += 1;
        // Header is line 1.
        let line = index + 2;
        let outcome = match row {
            Ok(fields) => cleaner.clean(&fields),
            Err(reason) => RowOutcome::Malformed(reason),
        };
        match outcome {
            RowOutcome::Kept(record) => records.push(record),
            RowOutcome::BadDate(raw) => {
                report.dropped_bad_date += 1;
                debug!(source = %source_id, line, value = %raw, "dropping row with unparseable Order Date");
            }
            RowOutcome::Malformed(reason) => {
                report.dropped_malformed += 1;
                debug!(source = %source_id, line, %reason, "skipping malformed row");
            }
        }
    }
    report.rows_kept = records.len();

    if report.dropped_bad_date + report.dropped_malformed > 0 {
        warn!(
            source = %source_id,
            bad_dates = report.dropped_bad_date,
            malformed = report.dropped_malformed,
            kept = report.rows_kept,
            "dropped rows while cleaning"
        );
    }

    if records.is_empty() {
        return Err(LoadError::Empty {
            source_id: source_id.to_string(),
        });
    }

    Ok((Dataset::new(cleaner.columns.iter().copied(), records), report))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Row ID,Order ID,Order Date,Ship Mode,Customer ID,Segment,State,Region,Product Name,Category,Sub-Category,Sales,Quantity,Discount,Profit";

    fn csv(rows: &[&str]) -> Vec<u8> {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text.into_bytes()
    }

    #[test]
    fn parses_common_order_date_shapes() {
        let expected = NaiveDate::from_ymd_opt(2016, 11, 8).unwrap();
        assert_eq!(parse_order_date("11/8/2016"), Some(expected));
        assert_eq!(parse_order_date("2016-11-08"), Some(expected));
        assert_eq!(parse_order_date("2016-11-08 00:00:00"), Some(expected));
        assert_eq!(parse_order_date("11/08/16"), Some(expected));
        assert_eq!(parse_order_date("31-12-2016"), NaiveDate::from_ymd_opt(2016, 12, 31));
        assert_eq!(parse_order_date("not a date"), None);
        assert_eq!(parse_order_date(""), None);
        assert_eq!(parse_order_date("13/45/2016"), None);
    }

    #[test]
    fn drops_rows_with_unparseable_dates() {
        let bytes = csv(&[
            "1,CA-1,11/8/2016,Second Class,CG-1,Consumer,Kentucky,South,Chair,Furniture,Chairs,731.94,3,0,219.58",
            "2,CA-2,someday,Second Class,CG-1,Consumer,Kentucky,South,Chair,Furniture,Chairs,10,1,0,1",
            "3,CA-3,6/12/2016,Standard Class,DV-1,Corporate,California,West,Labels,Office Supplies,Labels,14.62,2,0,6.87",
        ]);

        let (dataset, report) = parse_csv_bytes(&bytes, "fixture").unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.dropped_bad_date, 1);
        assert_eq!(report.rows_kept, 2);
        assert!(dataset.records().iter().all(|r| r.order_id != "CA-2"));
    }

    #[test]
    fn skips_rows_with_the_wrong_field_count() {
        let bytes = csv(&[
            "1,CA-1,11/8/2016,Second Class,CG-1,Consumer,Kentucky,South,Chair,Furniture,Chairs,731.94,3,0,219.58",
            "2,CA-2,11/8/2016,Second Class",
            "4,CA-4,11/10/2016,Second Class,CG-1,Consumer,Kentucky,South,Chair,Furniture,Chairs,5.5,1,0.2,-1.5",
        ]);

        let (dataset, report) = parse_csv_bytes(&bytes, "fixture").unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(report.dropped_malformed, 1);
        assert_eq!(dataset.records()[1].profit, -1.5);
        assert_eq!(dataset.records()[1].discount, 0.2);
    }

    #[test]
    fn unreadable_numbers_are_missing_not_fatal() {
        let bytes = csv(&[
            "1,CA-1,11/9/2016,Second Class,CG-1,Consumer,Kentucky,South,Chair,Furniture,Chairs,lots,3,,219.58",
            "2,CA-2,11/9/2016,Second Class,CG-1,Consumer,Kentucky,South,Desk,Furniture,Tables,\"1,200.50\",,0.1,20",
        ]);

        let (dataset, report) = parse_csv_bytes(&bytes, "fixture").unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(report.dropped_malformed, 0);

        let first = &dataset.records()[0];
        assert!(first.sales.is_nan() && first.discount.is_nan());
        assert_eq!(first.quantity, Some(3));
        assert_eq!(first.profit, 219.58);
        assert_eq!(first.display_value(Field::Sales), "");

        let second = &dataset.records()[1];
        assert_eq!(second.sales, 1200.5);
        assert_eq!(second.quantity, None);
        assert!(second.number(Field::Quantity).unwrap().is_nan());
    }

    #[test]
    fn decodes_latin1_bytes() {
        let mut bytes = csv(&[]);
        bytes.extend_from_slice(b"\n1,CA-1,1/2/2015,First Class,CG-1,Consumer,Texas,Central,Caf");
        bytes.push(0xE9);
        bytes.extend_from_slice(b" Table,Furniture,Tables,100,1,0,10");

        let (dataset, _) = parse_csv_bytes(&bytes, "fixture").unwrap();
        assert_eq!(dataset.records()[0].product_name, "Café Table");
    }

    #[test]
    fn honours_utf8_byte_order_mark() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend(csv(&[
            "1,CA-1,1/2/2015,First Class,CG-1,Consumer,Texas,Central,Café Table,Furniture,Tables,100,1,0,10",
        ]));

        let (dataset, _) = parse_csv_bytes(&bytes, "fixture").unwrap();
        assert!(dataset.has_column(Field::OrderDate));
        assert_eq!(dataset.records()[0].product_name, "Café Table");
    }

    #[test]
    fn records_which_columns_the_source_had() {
        let bytes = csv(&[
            "1,CA-1,1/2/2015,First Class,CG-1,Consumer,Texas,Central,Lamp,Furniture,Furnishings,100,1,0,10",
        ]);
        let (dataset, _) = parse_csv_bytes(&bytes, "fixture").unwrap();
        assert!(dataset.has_column(Field::Profit));
        assert!(!dataset.has_column(Field::Salesperson));
    }

    #[test]
    fn missing_order_date_column_is_a_load_error() {
        let bytes = b"Order ID,Sales\nCA-1,10\n".to_vec();
        let err = parse_csv_bytes(&bytes, "fixture").unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { ref column, .. } if column == "Order Date"));
    }

    #[test]
    fn nothing_left_after_cleaning_is_a_load_error() {
        let bytes = csv(&[
            "1,CA-1,never,First Class,CG-1,Consumer,Texas,Central,Lamp,Furniture,Furnishings,100,1,0,10",
        ]);
        let err = parse_csv_bytes(&bytes, "fixture").unwrap_err();
        assert!(matches!(err, LoadError::Empty { .. }));
    }

    #[test]
    fn sources_are_told_apart_by_scheme() {
        assert_eq!(
            DataSource::parse("https://example.com/superstore.csv"),
            DataSource::Url("https://example.com/superstore.csv".to_string())
        );
        assert_eq!(
            DataSource::parse(" data/superstore.csv "),
            DataSource::Path(PathBuf::from("data/superstore.csv"))
        );
        assert!(DataSource::parse("orders.XLSX").is_workbook());
    }

    #[test]
    fn spreadsheet_serials_become_dates() {
        assert_eq!(excel_serial_date(42682.0), NaiveDate::from_ymd_opt(2016, 11, 8));
        assert_eq!(excel_serial_date(-1.0), None);
    }
}
