// csv_manager.rs
use crate::config::{self, Config};
use crate::csv_exporter::{save_csv, to_json};
use crate::csv_loader::{DataSource, DatasetCache, LoadReport, DEFAULT_SOURCE};
use crate::csv_reporter::{run_with_overview_rows, ReportResult};
use crate::errors::LoadError;
use crate::questions::menu_labels;
use crate::report_printer::render;
use crate::sales_data::Dataset;
use crate::user_experience::{handle_back_flag, handle_quit_flag, handle_special_flag};
use crate::user_interaction::{
    determine_action_as_number, get_user_input, print_insight, print_insight_level_2, print_menu,
};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command line beats config, config beats the public Superstore CSV.
/// The flag is true when the source came from the command line.
pub fn resolve_source(cli_source: Option<&str>, config: &Config) -> (DataSource, bool) {
    match cli_source.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => (DataSource::parse(raw), true),
        None => (
            DataSource::parse(config.data_source().unwrap_or(DEFAULT_SOURCE)),
            false,
        ),
    }
}

/// Everything one interactive run holds on to between questions.
pub struct Session {
    cache: DatasetCache,
    source: DataSource,
    source_from_cli: bool,
    csv_db_path: PathBuf,
    config: Config,
    last_result: Option<ReportResult>,
}

impl Session {
    pub fn new(cli_source: Option<&str>, csv_db_path: PathBuf, config: Config) -> Self {
        let (source, source_from_cli) = resolve_source(cli_source, &config);
        Session {
            cache: DatasetCache::new(),
            source,
            source_from_cli,
            csv_db_path,
            config,
            last_result: None,
        }
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn csv_db_path(&self) -> &Path {
        &self.csv_db_path
    }

    pub fn load_report(&self) -> Option<&LoadReport> {
        self.cache.report(&self.source)
    }

    pub async fn dataset(&mut self) -> Result<Arc<Dataset>, LoadError> {
        self.cache.load(&self.source).await
    }

    /// Answers a question and keeps the result around for `@s` and `@j`.
    pub async fn answer(&mut self, question_id: &str) -> Result<&ReportResult, Box<dyn Error>> {
        let dataset = self.dataset().await?;
        let result = run_with_overview_rows(&dataset, question_id, self.config.overview_rows)?;
        let result: &ReportResult = self.last_result.insert(result);
        Ok(result)
    }

    /// Drops the cached dataset and loads the source again. Returns the new row count.
    pub async fn reload(&mut self) -> Result<usize, LoadError> {
        self.cache.invalidate(&self.source);
        self.last_result = None;
        Ok(self.dataset().await?.len())
    }

    pub fn last_result(&self) -> Option<&ReportResult> {
        self.last_result.as_ref()
    }

    pub fn save_last_result(&self, file_name: &str) -> Result<PathBuf, Box<dyn Error>> {
        let result = self
            .last_result
            .as_ref()
            .ok_or("Nothing to save yet, bro. Answer a question first.")?;
        Ok(save_csv(result, &self.csv_db_path, file_name)?)
    }

    pub fn last_result_json(&self) -> Result<String, Box<dyn Error>> {
        let result = self
            .last_result
            .as_ref()
            .ok_or("No report to show as JSON yet, bro. Answer a question first.")?;
        Ok(to_json(result)?)
    }

    /// Takes a new config. A changed data source applies unless one was given on the command line.
    pub fn apply_config(&mut self, config: Config) {
        if !self.source_from_cli {
            let (source, _) = resolve_source(None, &config);
            if source != self.source {
                self.source = source;
                self.last_result = None;
            }
        }
        self.config = config;
    }

    pub fn edit_config(&mut self) -> Result<(), Box<dyn Error>> {
        let config = config::edit_config(&self.csv_db_path)?;
        self.apply_config(config);
        Ok(())
    }
}

fn describe_load(source: &DataSource, report: &LoadReport) -> String {
    let dropped = report.dropped_bad_date + report.dropped_malformed;
    if dropped == 0 {
        format!("Loaded {} rows from {}.", report.rows_kept, source)
    } else {
        format!(
            "Loaded {} rows from {} ({} unusable rows skipped).",
            report.rows_kept, source, dropped
        )
    }
}

/// Loads the dataset up front so the first question does not stall. A failure leaves
/// the session usable: every question will retry the load.
pub async fn warm_up(session: &mut Session) {
    print_insight(&format!("Loading {} ...", session.source()));
    match session.dataset().await {
        Ok(_) => {
            if let Some(report) = session.load_report() {
                print_insight(&describe_load(session.source(), report));
            }
        }
        Err(e) => {
            print_insight(&format!("{}", e));
            print_insight_level_2("Fix the source with @config, or pick a question to retry.");
        }
    }
    println!();
}

pub async fn chain_reports(session: &mut Session) {
    let menu_options = menu_labels();

    loop {
        print_insight("Pick a question:");
        print_menu(&menu_options);
        let choice = get_user_input("Your move, bro: ");

        handle_quit_flag(&choice);

        if handle_back_flag(&choice) {
            print_insight("Already at the top, bro.");
            continue;
        }

        if handle_special_flag(&choice, session).await {
            continue;
        }

        // `Q12` and exact titles first, then the menu position or a fuzzy title.
        let question_id = match crate::questions::resolve(&choice) {
            Ok(_) => choice.trim().to_string(),
            Err(_) => match determine_action_as_number(&menu_options, &choice) {
                Some(index) => menu_options[index].clone(),
                None => {
                    print_insight("Dude, that question's a no-go. Give it another whirl, alright?");
                    continue;
                }
            },
        };

        match session.answer(&question_id).await {
            Ok(result) => {
                println!();
                println!("{}", render(result));
                println!();
                print_insight_level_2("@s saves this report, @j prints it as JSON.");
            }
            Err(e) if e.is::<LoadError>() => {
                print_insight(&format!("No dataset loaded, bro. {}", e));
                print_insight_level_2("Fix the source with @config, then @r to retry.");
            }
            Err(e) => print_insight(&format!("{}", e)),
        }
        println!();
    }
}
