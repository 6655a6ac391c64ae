pub mod config;
pub mod csv_describer;
pub mod csv_exporter;
pub mod csv_loader;
pub mod csv_manager;
pub mod csv_reporter;
pub mod errors;
pub mod questions;
pub mod report_printer;
pub mod sales_data;
pub mod user_experience;
pub mod user_interaction;
