// src/user_experience.rs
use crate::csv_exporter::default_file_name;
use crate::csv_manager::Session;
use crate::user_interaction::{
    get_user_input_level_2, print_insight, print_insight_level_2, print_list,
};

pub const FLAGS: [&str; 7] = [
    "@b           : Question prompt => Back (already at the top)",
    "@config      : Question prompt => Edit config",
    "@f / @flags  : Question prompt => View all flags",
    "@j           : After a report => Print it as JSON",
    "@r           : Question prompt => Reload the dataset from its source",
    "@s           : After a report => Save it as CSV to csv_db",
    "@q           : Anywhere => Quit salesbro",
];

/// Handles every non-navigation flag. Returns true when the input was a flag.
pub async fn handle_special_flag(flag: &str, session: &mut Session) -> bool {
    match flag.trim() {
        "@f" | "@flags" => {
            print_insight("Serving your flags ...");
            print_list(&FLAGS);
            println!();
            true
        }
        "@config" => {
            if let Err(e) = session.edit_config() {
                print_insight(&format!("Config left unchanged: {}", e));
            }
            true
        }
        "@r" => {
            print_insight(&format!("Reloading {} ...", session.source()));
            match session.reload().await {
                Ok(rows) => print_insight(&format!("Fresh data loaded: {} rows.", rows)),
                Err(e) => print_insight(&format!("Reload failed: {}", e)),
            }
            true
        }
        "@s" => {
            let Some(result) = session.last_result() else {
                print_insight("Nothing to save yet, bro. Answer a question first.");
                return true;
            };
            let suggested = default_file_name(result);
            let file_name = get_user_input_level_2(&format!(
                "Enter file name to save (blank for {}): ",
                suggested
            ));
            let file_name = if file_name.trim().is_empty() {
                suggested
            } else {
                file_name.trim().to_string()
            };
            match session.save_last_result(&file_name) {
                Ok(path) => print_insight(&format!("CSV file saved at {}", path.display())),
                Err(e) => print_insight(&format!("Save failed: {}", e)),
            }
            true
        }
        "@j" => {
            match session.last_result_json() {
                Ok(json) => println!("{}\n", json),
                Err(e) => print_insight(&format!("{}", e)),
            }
            true
        }
        _ => false,
    }
}

pub fn handle_back_flag(flag: &str) -> bool {
    matches!(flag.trim(), "@b")
}

pub fn handle_quit_flag(flag: &str) {
    if flag.trim() == "@q" {
        print_insight_level_2("Later, bro.");
        std::process::exit(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn back_flag_is_exact() {
        assert!(handle_back_flag("@b"));
        assert!(handle_back_flag(" @b "));
        assert!(!handle_back_flag("@bb"));
        assert!(!handle_back_flag("b"));
    }

    #[test]
    fn every_flag_is_listed() {
        for flag in ["@b", "@config", "@f", "@j", "@r", "@s", "@q"] {
            assert!(FLAGS.iter().any(|line| line.starts_with(flag)), "{}", flag);
        }
    }
}
