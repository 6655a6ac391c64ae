// config.rs
use crate::csv_reporter::DEFAULT_OVERVIEW_ROWS;
use crate::user_interaction::{get_edited_user_config_input, print_insight_level_2};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const CONFIG_FILE_NAME: &str = "salesbro.config";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data_source: String,
    #[serde(default = "default_overview_rows")]
    pub overview_rows: usize,
}

fn default_overview_rows() -> usize {
    DEFAULT_OVERVIEW_ROWS
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_source: String::new(),
            overview_rows: DEFAULT_OVERVIEW_ROWS,
        }
    }
}

impl Config {
    /// The configured source, if one was filled in.
    pub fn data_source(&self) -> Option<&str> {
        let trimmed = self.data_source.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}

const DEFAULT_CONFIG_TEXT: &str = r#"{
  "data_source": "",
  "overview_rows": 10
}
"#;

const SYNTAX_TEXT: &str = r#"
SYNTAX
======
{
  "data_source": "", // a local .csv/.xls/.xlsx path or an http(s) URL; blank uses the public Superstore CSV
  "overview_rows": 10 // rows shown at the top of the Overview
}
"#;

pub fn config_path(csv_db_path: &Path) -> PathBuf {
    csv_db_path.join(CONFIG_FILE_NAME)
}

/// Parses the JSON part of a config file, ignoring the SYNTAX block.
pub fn parse_config(text: &str) -> Result<Config, serde_json::Error> {
    let json_part = text.split("SYNTAX").next().unwrap_or_default();
    serde_json::from_str(json_part)
}

fn ensure_config_file(path: &Path) -> io::Result<()> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(format!("{}{}", DEFAULT_CONFIG_TEXT, SYNTAX_TEXT).as_bytes())?;
    }
    Ok(())
}

/// Reads the config, writing the default file on first use. Any problem falls back to defaults.
pub fn load_config(csv_db_path: &Path) -> Config {
    let path = config_path(csv_db_path);
    if let Err(e) = ensure_config_file(&path) {
        warn!(path = %path.display(), error = %e, "could not create config file");
        return Config::default();
    }

    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read config file");
            return Config::default();
        }
    };

    match parse_config(&text) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid config, using defaults");
            Config::default()
        }
    }
}

/// Validates edited text and returns the content to write back, with a fresh SYNTAX block.
fn validated_config_text(edited: &str) -> Result<(Config, String), serde_json::Error> {
    let config = parse_config(edited)?;
    let json_part = edited.split("SYNTAX").next().unwrap_or_default().trim_end();
    Ok((config, format!("{}\n{}", json_part, SYNTAX_TEXT)))
}

pub fn edit_config(csv_db_path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let path = config_path(csv_db_path);
    ensure_config_file(&path)?;

    let current_config_text = fs::read_to_string(&path)?;
    let edited_config_text = get_edited_user_config_input(current_config_text);

    let (config, new_config_content) = match validated_config_text(&edited_config_text) {
        Ok(validated) => {
            print_insight_level_2("Config's all good, bro!");
            validated
        }
        Err(e) => {
            println!();
            print_insight_level_2(&format!(
                "Whoops, hit a snag with that JSON: {}. Mind tweaking the config and trying again?",
                e
            ));
            return Err(e.into());
        }
    };

    let mut file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(&path)?;
    file.write_all(new_config_content.as_bytes())?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn first_load_writes_the_default_file() {
        let dir = tempdir().unwrap();
        let csv_db = dir.path().join("csv_db");
        let config = load_config(&csv_db);
        assert_eq!(config, Config::default());
        let written = fs::read_to_string(config_path(&csv_db)).unwrap();
        assert!(written.contains("\"overview_rows\": 10"));
        assert!(written.contains("SYNTAX\n======"));
    }

    #[test]
    fn syntax_block_is_ignored() {
        let text = format!(
            "{{ \"data_source\": \"/tmp/sales.csv\", \"overview_rows\": 3 }}\n{}",
            SYNTAX_TEXT
        );
        let config = parse_config(&text).unwrap();
        assert_eq!(config.data_source(), Some("/tmp/sales.csv"));
        assert_eq!(config.overview_rows, 3);
    }

    #[test]
    fn missing_keys_take_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.data_source(), None);
        assert_eq!(config.overview_rows, DEFAULT_OVERVIEW_ROWS);
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        fs::write(config_path(dir.path()), "{ not json").unwrap();
        assert_eq!(load_config(dir.path()), Config::default());
    }

    #[test]
    fn edited_text_gets_a_fresh_syntax_block() {
        let edited = "{ \"data_source\": \"https://example.com/s.csv\" }\n\nSYNTAX\nstale";
        let (config, content) = validated_config_text(edited).unwrap();
        assert_eq!(config.data_source(), Some("https://example.com/s.csv"));
        assert!(!content.contains("stale"));
        assert!(content.ends_with(SYNTAX_TEXT));
        assert!(validated_config_text("{ broken").is_err());
    }
}
