use salesbro::config::load_config;
use salesbro::csv_manager::{chain_reports, warm_up, Session};
use salesbro::user_interaction::print_insight;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const BRO_VERSION: &str = env!("CARGO_PKG_VERSION");

fn set_up_csv_db() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let home_dir = env::var("HOME").map_err(|_| "Unable to determine user home directory")?;
    let csv_db_path = Path::new(&home_dir).join("Desktop").join("csv_db");
    fs::create_dir_all(&csv_db_path)?;
    Ok(csv_db_path)
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() {
    if env::args().any(|arg| arg == "--version") {
        print_insight(BRO_VERSION);
        std::process::exit(0);
    }

    init_tracing();

    let cli_source = env::args().skip(1).find(|arg| !arg.starts_with("--"));

    let csv_db_path = match set_up_csv_db() {
        Ok(path) => path,
        Err(e) => {
            print_insight(&format!("No csv_db for you, bro: {}", e));
            std::process::exit(1);
        }
    };
    let config = load_config(&csv_db_path);

    println!(
        r#"
            _            _
  ___  __ _| | ___  ___| |__  _ __ ___
 / __|/ _` | |/ _ \/ __| '_ \| '__/ _ \
 \__ \ (_| | |  __/\__ \ |_) | | | (_) |
 |___/\__,_|_|\___||___/_.__/|_|  \___/

 Superstore questions, answered. Type @f for flags.
"#
    );

    let mut session = Session::new(cli_source.as_deref(), csv_db_path, config);
    warm_up(&mut session).await;
    chain_reports(&mut session).await;
}
