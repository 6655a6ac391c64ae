// sales_data.rs
use crate::errors::ComputeError;
use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::fmt;

/// Columns of the superstore sheet the reports know about. Anything else in the
/// source header is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Field {
    OrderId,
    OrderDate,
    ShipMode,
    CustomerId,
    Region,
    State,
    Segment,
    Category,
    SubCategory,
    ProductName,
    Sales,
    Quantity,
    Discount,
    Profit,
    Salesperson,
}

impl Field {
    pub const ALL: [Field; 15] = [
        Field::OrderId,
        Field::OrderDate,
        Field::ShipMode,
        Field::CustomerId,
        Field::Region,
        Field::State,
        Field::Segment,
        Field::Category,
        Field::SubCategory,
        Field::ProductName,
        Field::Sales,
        Field::Quantity,
        Field::Discount,
        Field::Profit,
        Field::Salesperson,
    ];

    pub const NUMERIC: [Field; 4] = [Field::Sales, Field::Quantity, Field::Discount, Field::Profit];

    pub fn header(self) -> &'static str {
        match self {
            Field::OrderId => "Order ID",
            Field::OrderDate => "Order Date",
            Field::ShipMode => "Ship Mode",
            Field::CustomerId => "Customer ID",
            Field::Region => "Region",
            Field::State => "State",
            Field::Segment => "Segment",
            Field::Category => "Category",
            Field::SubCategory => "Sub-Category",
            Field::ProductName => "Product Name",
            Field::Sales => "Sales",
            Field::Quantity => "Quantity",
            Field::Discount => "Discount",
            Field::Profit => "Profit",
            Field::Salesperson => "Salesperson",
        }
    }

    pub fn from_header(name: &str) -> Option<Field> {
        let name = name.trim();
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.header().eq_ignore_ascii_case(name))
    }

    pub fn is_numeric(self) -> bool {
        Field::NUMERIC.contains(&self)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// One row of the sheet. Columns missing from the source header hold empty
/// strings or zeroes; `Dataset::require` guards every read of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub order_id: String,
    pub order_date: NaiveDate,
    pub ship_mode: String,
    pub customer_id: String,
    pub region: String,
    pub state: String,
    pub segment: String,
    pub category: String,
    pub sub_category: String,
    pub product_name: String,
    pub sales: f64,
    /// `None` when the cell was blank or not a whole number.
    pub quantity: Option<i64>,
    pub discount: f64,
    pub profit: f64,
    pub salesperson: Option<String>,
}

impl Transaction {
    pub fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::OrderId => Some(&self.order_id),
            Field::ShipMode => Some(&self.ship_mode),
            Field::CustomerId => Some(&self.customer_id),
            Field::Region => Some(&self.region),
            Field::State => Some(&self.state),
            Field::Segment => Some(&self.segment),
            Field::Category => Some(&self.category),
            Field::SubCategory => Some(&self.sub_category),
            Field::ProductName => Some(&self.product_name),
            Field::Salesperson => self.salesperson.as_deref(),
            Field::OrderDate
            | Field::Sales
            | Field::Quantity
            | Field::Discount
            | Field::Profit => None,
        }
    }

    pub fn number(&self, field: Field) -> Option<f64> {
        match field {
            Field::Sales => Some(self.sales),
            Field::Quantity => Some(self.quantity.map_or(f64::NAN, |q| q as f64)),
            Field::Discount => Some(self.discount),
            Field::Profit => Some(self.profit),
            _ => None,
        }
    }

    /// Cell as it would be printed in a table.
    pub fn display_value(&self, field: Field) -> String {
        match field {
            Field::OrderDate => self.order_date.format("%Y-%m-%d").to_string(),
            Field::Quantity => self.quantity.map(|q| q.to_string()).unwrap_or_default(),
            Field::Sales | Field::Discount | Field::Profit => match self.number(field) {
                Some(value) if !value.is_nan() => format!("{:.2}", value),
                _ => String::new(),
            },
            _ => self.text(field).unwrap_or_default().to_string(),
        }
    }
}

/// The cleaned sheet. Never mutated after load.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: BTreeSet<Field>,
    records: Vec<Transaction>,
}

impl Dataset {
    pub fn new(columns: impl IntoIterator<Item = Field>, records: Vec<Transaction>) -> Self {
        Dataset {
            columns: columns.into_iter().collect(),
            records,
        }
    }

    pub fn records(&self) -> &[Transaction] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, field: Field) -> bool {
        self.columns.contains(&field)
    }

    /// Columns present in the source header.
    pub fn columns(&self) -> Vec<Field> {
        self.columns.iter().copied().collect()
    }

    pub fn require(&self, field: Field) -> Result<(), ComputeError> {
        if self.has_column(field) {
            Ok(())
        } else {
            Err(ComputeError::MissingColumn(field.header().to_string()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl From<NaiveDate> for YearMonth {
    fn from(date: NaiveDate) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// One component of a grouping key. Variant order is irrelevant in practice
/// since a key position always holds the same variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyPart {
    Text(String),
    Month(YearMonth),
    Year(i32),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Text(text) => f.write_str(text),
            KeyPart::Month(month) => write!(f, "{}", month),
            KeyPart::Year(year) => write!(f, "{}", year),
        }
    }
}

impl Serialize for KeyPart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct GroupKey(pub Vec<KeyPart>);

impl GroupKey {
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// True when every part prints as the matching string.
    pub fn matches(&self, parts: &[&str]) -> bool {
        self.0.len() == parts.len()
            && self
                .0
                .iter()
                .zip(parts)
                .all(|(part, expected)| part.to_string() == *expected)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" / ")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum KeyColumn {
    Field(Field),
    Month,
    Year,
}

impl KeyColumn {
    pub fn label(self) -> &'static str {
        match self {
            KeyColumn::Field(field) => field.header(),
            KeyColumn::Month => "Month",
            KeyColumn::Year => "Year",
        }
    }

    pub fn source_field(self) -> Field {
        match self {
            KeyColumn::Field(field) => field,
            KeyColumn::Month | KeyColumn::Year => Field::OrderDate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MeasureColumn {
    Field(Field),
    ProfitMargin,
}

impl MeasureColumn {
    pub fn label(self) -> &'static str {
        match self {
            MeasureColumn::Field(field) => field.header(),
            MeasureColumn::ProfitMargin => "Profit Margin",
        }
    }

    pub fn source_fields(self) -> Vec<Field> {
        match self {
            MeasureColumn::Field(field) => vec![field],
            MeasureColumn::ProfitMargin => vec![Field::Profit, Field::Sales],
        }
    }
}

/// Profit as a percentage of sales; NaN when there were no sales.
pub fn profit_margin(profit: f64, sales: f64) -> f64 {
    if sales == 0.0 {
        f64::NAN
    } else {
        profit / sales * 100.0
    }
}

/// Request-scoped view that derives month, year and profit margin on first
/// use. The underlying dataset is only borrowed.
pub struct DerivedView<'a> {
    dataset: &'a Dataset,
    months: OnceCell<Vec<YearMonth>>,
    years: OnceCell<Vec<i32>>,
    margins: OnceCell<Vec<f64>>,
}

impl<'a> DerivedView<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        DerivedView {
            dataset,
            months: OnceCell::new(),
            years: OnceCell::new(),
            margins: OnceCell::new(),
        }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn months(&self) -> &[YearMonth] {
        self.months.get_or_init(|| {
            self.dataset
                .records()
                .iter()
                .map(|record| YearMonth::from(record.order_date))
                .collect()
        })
    }

    pub fn years(&self) -> &[i32] {
        self.years.get_or_init(|| {
            self.dataset
                .records()
                .iter()
                .map(|record| record.order_date.year())
                .collect()
        })
    }

    pub fn profit_margins(&self) -> &[f64] {
        self.margins.get_or_init(|| {
            self.dataset
                .records()
                .iter()
                .map(|record| profit_margin(record.profit, record.sales))
                .collect()
        })
    }

    /// Names of the derived columns computed so far.
    pub fn derived_columns(&self) -> Vec<&'static str> {
        let mut computed = Vec::new();
        if self.months.get().is_some() {
            computed.push("Month");
        }
        if self.years.get().is_some() {
            computed.push("Year");
        }
        if self.margins.get().is_some() {
            computed.push("Profit Margin");
        }
        computed
    }

    /// `None` when the row has no value in a key column, e.g. a blank Salesperson.
    pub fn key_part(&self, column: KeyColumn, row: usize) -> Option<KeyPart> {
        match column {
            KeyColumn::Month => Some(KeyPart::Month(self.months()[row])),
            KeyColumn::Year => Some(KeyPart::Year(self.years()[row])),
            KeyColumn::Field(field) => {
                let record = &self.dataset.records()[row];
                let text = match record.text(field) {
                    Some(text) => text.to_string(),
                    None => record.display_value(field),
                };
                (!text.is_empty()).then_some(KeyPart::Text(text))
            }
        }
    }

    pub fn measure(&self, column: MeasureColumn, row: usize) -> f64 {
        match column {
            MeasureColumn::ProfitMargin => self.profit_margins()[row],
            MeasureColumn::Field(field) => self.dataset.records()[row]
                .number(field)
                .unwrap_or(f64::NAN),
        }
    }
}
