// questions.rs
use crate::errors::ComputeError;
use crate::sales_data::{Field, KeyColumn, MeasureColumn};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Aggregation {
    Sum,
    Mean,
    CountDistinct(Field),
    /// Sum of the measure divided by the number of distinct values of a column.
    SumPerDistinct(Field),
    Correlation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PostProcess {
    None,
    SortAscending,
    SortDescending,
    Top(usize),
    Bottom(usize),
    ArgMax,
    PercentChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    HorizontalBar,
    Line,
    Pie,
    Scatter,
    Heatmap,
    Table,
    Text,
}

#[derive(Debug)]
pub struct QuestionSpec {
    pub id: u8,
    pub title: &'static str,
    pub keys: &'static [KeyColumn],
    pub measures: &'static [MeasureColumn],
    pub aggregation: Aggregation,
    pub post: PostProcess,
    pub chart: ChartKind,
}

impl QuestionSpec {
    pub fn label(&self) -> String {
        format!("Q{}: {}", self.id, self.title)
    }

    /// Source columns this question reads, derived columns resolved to
    /// what they are derived from.
    pub fn required_fields(&self) -> BTreeSet<Field> {
        let mut fields: BTreeSet<Field> = self.keys.iter().map(|key| key.source_field()).collect();
        for measure in self.measures {
            fields.extend(measure.source_fields());
        }
        match self.aggregation {
            Aggregation::CountDistinct(field) | Aggregation::SumPerDistinct(field) => {
                fields.insert(field);
            }
            Aggregation::Sum | Aggregation::Mean | Aggregation::Correlation => {}
        }
        fields
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Question {
    Overview,
    Catalog(&'static QuestionSpec),
}

impl Question {
    pub fn label(&self) -> String {
        match self {
            Question::Overview => OVERVIEW.to_string(),
            Question::Catalog(spec) => spec.label(),
        }
    }
}

pub const OVERVIEW: &str = "Overview";

const fn field(field: Field) -> KeyColumn {
    KeyColumn::Field(field)
}

const fn col(field: Field) -> MeasureColumn {
    MeasureColumn::Field(field)
}

const SALES: &[MeasureColumn] = &[col(Field::Sales)];
const PROFIT: &[MeasureColumn] = &[col(Field::Profit)];
const SALES_AND_PROFIT: &[MeasureColumn] = &[col(Field::Sales), col(Field::Profit)];
const NO_MEASURE: &[MeasureColumn] = &[];
const NO_KEY: &[KeyColumn] = &[];
const SALES_AND_DISCOUNT: &[MeasureColumn] = &[col(Field::Sales), col(Field::Discount)];
const DISCOUNT_AND_PROFIT: &[MeasureColumn] = &[col(Field::Discount), col(Field::Profit)];
const SALES_AND_QUANTITY: &[MeasureColumn] = &[col(Field::Sales), col(Field::Quantity)];
const ALL_NUMERIC: &[MeasureColumn] = &[
    col(Field::Sales),
    col(Field::Quantity),
    col(Field::Discount),
    col(Field::Profit),
];
const DISCOUNT: &[MeasureColumn] = &[col(Field::Discount)];
const QUANTITY: &[MeasureColumn] = &[col(Field::Quantity)];
const PROFIT_MARGIN: &[MeasureColumn] = &[MeasureColumn::ProfitMargin];

const CATEGORY: &[KeyColumn] = &[field(Field::Category)];
const SUB_CATEGORY: &[KeyColumn] = &[field(Field::SubCategory)];
const REGION: &[KeyColumn] = &[field(Field::Region)];
const STATE: &[KeyColumn] = &[field(Field::State)];
const SHIP_MODE: &[KeyColumn] = &[field(Field::ShipMode)];
const SEGMENT: &[KeyColumn] = &[field(Field::Segment)];
const PRODUCT: &[KeyColumn] = &[field(Field::ProductName)];
const MONTH: &[KeyColumn] = &[KeyColumn::Month];
const YEAR: &[KeyColumn] = &[KeyColumn::Year];
const CUSTOMER: &[KeyColumn] = &[field(Field::CustomerId)];
const SALESPERSON: &[KeyColumn] = &[field(Field::Salesperson)];
const STATE_AND_SEGMENT: &[KeyColumn] = &[field(Field::State), field(Field::Segment)];
const REGION_AND_CATEGORY: &[KeyColumn] = &[field(Field::Region), field(Field::Category)];
const SUB_CATEGORY_AND_REGION: &[KeyColumn] = &[field(Field::SubCategory), field(Field::Region)];
const CATEGORY_AND_SUB_CATEGORY: &[KeyColumn] = &[field(Field::Category), field(Field::SubCategory)];
const MONTH_AND_CATEGORY: &[KeyColumn] = &[KeyColumn::Month, field(Field::Category)];
const MONTH_AND_SEGMENT: &[KeyColumn] = &[KeyColumn::Month, field(Field::Segment)];

const fn question(
    id: u8,
    title: &'static str,
    keys: &'static [KeyColumn],
    measures: &'static [MeasureColumn],
    aggregation: Aggregation,
    post: PostProcess,
    chart: ChartKind,
) -> QuestionSpec {
    QuestionSpec {
        id,
        title,
        keys,
        measures,
        aggregation,
        post,
        chart,
    }
}

use Aggregation::{Correlation, CountDistinct, Mean, Sum, SumPerDistinct};
use ChartKind::{Bar, Heatmap, HorizontalBar, Line, Pie, Scatter, Table, Text};

#[rustfmt::skip]
pub static QUESTIONS: [QuestionSpec; 45] = [
    question(1, "Sales by Category", CATEGORY, SALES, Sum, PostProcess::None, Bar),
    question(2, "Sales by Sub-Category", SUB_CATEGORY, SALES, Sum, PostProcess::SortAscending, HorizontalBar),
    question(3, "Sales by Region", REGION, SALES, Sum, PostProcess::None, Bar),
    question(4, "Profit by Region", REGION, PROFIT, Sum, PostProcess::None, Bar),
    question(5, "Order Count by State", STATE, NO_MEASURE, CountDistinct(Field::OrderId), PostProcess::None, HorizontalBar),
    question(6, "Sales and Profit by State", STATE, SALES_AND_PROFIT, Sum, PostProcess::None, Table),
    question(7, "Sales by Ship Mode", SHIP_MODE, SALES, Sum, PostProcess::None, Bar),
    question(8, "Monthly Trends in Sales", MONTH, SALES, Sum, PostProcess::None, Line),
    question(9, "Monthly Profit Trends", MONTH, PROFIT, Sum, PostProcess::None, Line),
    question(10, "Average Order Value by Category", CATEGORY, SALES, Mean, PostProcess::None, Bar),
    question(11, "Most Profitable Products", PRODUCT, PROFIT, Sum, PostProcess::Top(10), Bar),
    question(12, "Product Category with Highest Sales", CATEGORY, SALES, Sum, PostProcess::ArgMax, Text),
    question(13, "Top 10 Selling Products", PRODUCT, SALES, Sum, PostProcess::Top(10), HorizontalBar),
    question(14, "Profitability by Sub-Category", SUB_CATEGORY, PROFIT, Sum, PostProcess::SortDescending, HorizontalBar),
    question(15, "Sales vs Discounts Analysis", NO_KEY, SALES_AND_DISCOUNT, Correlation, PostProcess::None, Heatmap),
    question(16, "Sales by Customer Segment", SEGMENT, SALES, Sum, PostProcess::None, Pie),
    question(17, "Average Sales per Order by Sub-Category", SUB_CATEGORY, SALES, SumPerDistinct(Field::OrderId), PostProcess::SortDescending, HorizontalBar),
    question(18, "Annual Order Counts", YEAR, NO_MEASURE, CountDistinct(Field::OrderId), PostProcess::None, Bar),
    question(19, "Profit by Ship Mode", SHIP_MODE, PROFIT, Sum, PostProcess::None, Bar),
    question(20, "Regional Sales Distribution", REGION, SALES, Sum, PostProcess::None, Pie),
    question(21, "Sales by State and Segment", STATE_AND_SEGMENT, SALES, Sum, PostProcess::None, Heatmap),
    question(22, "Product Sales Distribution by Region", REGION_AND_CATEGORY, SALES, Sum, PostProcess::None, Heatmap),
    question(23, "Profit vs Sales Analysis", NO_KEY, SALES_AND_PROFIT, Correlation, PostProcess::None, Scatter),
    question(24, "Monthly Order Counts", MONTH, NO_MEASURE, CountDistinct(Field::OrderId), PostProcess::None, Line),
    question(25, "Sales Trend by Product Type", MONTH_AND_CATEGORY, SALES, Sum, PostProcess::None, Line),
    question(26, "Profit by Customer Segment", SEGMENT, PROFIT, Sum, PostProcess::None, Bar),
    question(27, "Sales by Salesperson", SALESPERSON, SALES, Sum, PostProcess::SortDescending, HorizontalBar),
    question(28, "Monthly Discount Trends", MONTH, DISCOUNT, Mean, PostProcess::None, Line),
    question(29, "Regional Sales per Employee", REGION, SALES, SumPerDistinct(Field::Salesperson), PostProcess::None, Bar),
    question(30, "Best Performing Ship Mode", SHIP_MODE, PROFIT, Sum, PostProcess::ArgMax, Text),
    question(31, "Sales per Customer", CUSTOMER, SALES, Sum, PostProcess::Top(10), HorizontalBar),
    question(32, "Profit by Product", PRODUCT, PROFIT, Sum, PostProcess::Bottom(10), HorizontalBar),
    question(33, "Category vs Profit", CATEGORY, PROFIT, Sum, PostProcess::None, Bar),
    question(34, "Discount vs Profit", NO_KEY, DISCOUNT_AND_PROFIT, Correlation, PostProcess::None, Scatter),
    question(35, "Sales and Profit by Ship Mode", SHIP_MODE, SALES_AND_PROFIT, Sum, PostProcess::None, Table),
    question(36, "Profit Margin by Sub-Category", SUB_CATEGORY, PROFIT_MARGIN, Mean, PostProcess::SortDescending, HorizontalBar),
    question(37, "Sales Correlation Matrix", NO_KEY, ALL_NUMERIC, Correlation, PostProcess::None, Heatmap),
    question(38, "Yearly Sales Growth", YEAR, SALES, Sum, PostProcess::PercentChange, Line),
    question(39, "Sales vs Region by Sub-Category", SUB_CATEGORY_AND_REGION, SALES, Sum, PostProcess::None, Heatmap),
    question(40, "Product Profitability Comparison", CATEGORY_AND_SUB_CATEGORY, SALES_AND_PROFIT, Sum, PostProcess::None, Table),
    question(41, "Monthly Customer Purchase Frequency", MONTH, NO_MEASURE, CountDistinct(Field::CustomerId), PostProcess::None, Line),
    question(42, "Profit by Year", YEAR, PROFIT, Sum, PostProcess::None, Bar),
    question(43, "Top 5 Most Ordered Products", PRODUCT, QUANTITY, Sum, PostProcess::Top(5), HorizontalBar),
    question(44, "Correlation Between Sales and Quantity", NO_KEY, SALES_AND_QUANTITY, Correlation, PostProcess::None, Scatter),
    question(45, "Sales Trends by Customer", MONTH_AND_SEGMENT, SALES, Sum, PostProcess::None, Line),
];

static QUESTION_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)q?\s*(\d{1,3})\s*(?::.*)?$").expect("question id pattern compiles")
});

/// Menu entries in display order: the overview first, then every question.
pub fn menu_labels() -> Vec<String> {
    std::iter::once(OVERVIEW.to_string())
        .chain(QUESTIONS.iter().map(QuestionSpec::label))
        .collect()
}

pub fn find(id: u8) -> Option<&'static QuestionSpec> {
    QUESTIONS.iter().find(|spec| spec.id == id)
}

/// Accepts `Overview`, `Q12`, `q12`, `12`, or a full menu label.
pub fn resolve(question_id: &str) -> Result<Question, ComputeError> {
    let trimmed = question_id.trim();
    if trimmed.eq_ignore_ascii_case(OVERVIEW) {
        return Ok(Question::Overview);
    }

    if let Some(captures) = QUESTION_ID.captures(trimmed) {
        let spec = captures[1].parse::<u8>().ok().and_then(find);
        if let Some(spec) = spec {
            // A full label must carry the right title, not just a valid number.
            let title_matches = match trimmed.split_once(':') {
                Some((_, title)) => title.trim().eq_ignore_ascii_case(spec.title),
                None => true,
            };
            if title_matches {
                return Ok(Question::Catalog(spec));
            }
        }
    }

    QUESTIONS
        .iter()
        .find(|spec| spec.title.eq_ignore_ascii_case(trimmed))
        .map(Question::Catalog)
        .ok_or_else(|| ComputeError::UnknownQuestion(question_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_one_through_forty_five() {
        let ids: Vec<u8> = QUESTIONS.iter().map(|spec| spec.id).collect();
        assert_eq!(ids, (1..=45).collect::<Vec<u8>>());
    }

    #[test]
    fn resolves_every_spelling_of_a_question() {
        for spelling in ["Q12", "q12", "12", " Q 12 ", "Q12: Product Category with Highest Sales"] {
            match resolve(spelling) {
                Ok(Question::Catalog(spec)) => assert_eq!(spec.id, 12, "{}", spelling),
                other => panic!("{} resolved to {:?}", spelling, other),
            }
        }
        assert!(matches!(resolve("overview"), Ok(Question::Overview)));
        assert!(matches!(resolve("sales by region"), Ok(Question::Catalog(spec)) if spec.id == 3));
    }

    #[test]
    fn unknown_questions_are_errors() {
        assert_eq!(
            resolve("Q46").unwrap_err(),
            ComputeError::UnknownQuestion("Q46".to_string())
        );
        assert!(resolve("Q0").is_err());
        assert!(resolve("Q3: Profit by Year").is_err());
        assert!(resolve("").is_err());
    }

    #[test]
    fn derived_keys_require_the_order_date() {
        let monthly = find(8).unwrap();
        assert!(monthly.required_fields().contains(&Field::OrderDate));
        assert!(monthly.required_fields().contains(&Field::Sales));

        let margin = find(36).unwrap();
        let fields = margin.required_fields();
        assert!(fields.contains(&Field::Profit) && fields.contains(&Field::Sales));

        let per_employee = find(29).unwrap();
        assert!(per_employee.required_fields().contains(&Field::Salesperson));
    }

    #[test]
    fn menu_starts_with_the_overview() {
        let labels = menu_labels();
        assert_eq!(labels.len(), 46);
        assert_eq!(labels[0], "Overview");
        assert_eq!(labels[1], "Q1: Sales by Category");
        assert_eq!(labels[45], "Q45: Sales Trends by Customer");
    }
}
