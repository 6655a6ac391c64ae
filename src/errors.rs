// errors.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Couldn't read {source_id}: {error}")]
    Io {
        source_id: String,
        #[source]
        error: std::io::Error,
    },
    #[error("Couldn't fetch {source_id}: {error}")]
    Fetch {
        source_id: String,
        #[source]
        error: reqwest::Error,
    },
    #[error("Couldn't parse CSV header of {source_id}: {error}")]
    Csv {
        source_id: String,
        #[source]
        error: csv::Error,
    },
    #[error("Couldn't open workbook {source_id}: {message}")]
    Workbook { source_id: String, message: String },
    #[error("{source_id} has no '{column}' column")]
    MissingColumn { source_id: String, column: String },
    #[error("{source_id} has no usable rows after cleaning")]
    Empty { source_id: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComputeError {
    #[error("Unknown question: '{0}'")]
    UnknownQuestion(String),
    #[error("Dataset is missing the '{0}' column")]
    MissingColumn(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Export failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),
}
