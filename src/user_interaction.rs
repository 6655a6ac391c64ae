// user_interaction.rs
use fuzzywuzzy::fuzz;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use vim_edit::vim_edit;

/// Fuzzy matches scoring at or below this are treated as no match.
const FUZZY_THRESHOLD: u8 = 60;

pub fn get_user_input(prompt: &str) -> String {
    let mut rl = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            println!("Failed to initialize editor: {:?}", err);
            return String::new();
        }
    };

    // ANSI escape codes for styling
    let bold_orange = "\x1b[1;38;5;208m";
    let reset = "\x1b[0m";

    let custom_prompt = format!("{}@BIGbro: {}{}{}", bold_orange, bold_orange, prompt, reset);

    match rl.readline(&custom_prompt) {
        Ok(line) => {
            let _ = rl.add_history_entry(line.as_str());
            line
        }
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
            println!("Input interrupted or end of file reached.");
            // Ctrl-C / Ctrl-D at a prompt behaves like @q.
            "@q".to_string()
        }
        Err(err) => {
            println!("Error reading line: {:?}", err);
            String::new()
        }
    }
}

pub fn get_user_input_level_2(prompt: &str) -> String {
    let mut rl = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            println!("Failed to initialize editor: {:?}", err);
            return String::new();
        }
    };

    let bold_orange = "\x1b[0;38;5;208m";
    let reset = "\x1b[0m";

    let custom_prompt = format!(
        "  {}@LILbro: {}{}{}",
        bold_orange, bold_orange, prompt, reset
    );

    match rl.readline(&custom_prompt) {
        Ok(line) => {
            let _ = rl.add_history_entry(line.as_str());
            line
        }
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
            println!("Input interrupted or end of file reached.");
            String::new()
        }
        Err(err) => {
            println!("Error reading line: {:?}", err);
            String::new()
        }
    }
}

/// Opens the config text in vim and hands back whatever was saved.
pub fn get_edited_user_config_input(current_config: String) -> String {
    vim_edit(current_config)
}

/// Prints options in bold yellow, numbered from 1.
pub fn print_list(options: &[&str]) {
    let bold_yellow = "\x1b[1;33m";
    let reset = "\x1b[0m";

    let max_digits = options.len().to_string().len();

    for (index, option) in options.iter().enumerate() {
        let padded_index = format!("{:width$}:", index + 1, width = max_digits);
        println!("  {}{} {}{}", bold_yellow, padded_index, option, reset);
    }
}

/// Prints a menu numbered from 0, so that `Qn` sits at position n.
pub fn print_menu(options: &[String]) {
    let bold_yellow = "\x1b[1;33m";
    let reset = "\x1b[0m";

    let max_digits = options.len().saturating_sub(1).to_string().len();

    for (index, option) in options.iter().enumerate() {
        let padded_index = format!("{:width$}:", index, width = max_digits);
        println!("  {}{} {}{}", bold_yellow, padded_index, option, reset);
    }
}

/// Menu text without a `Qn:` style prefix.
fn option_title(option: &str) -> &str {
    option.split_once(": ").map_or(option, |(_, title)| title)
}

/// Picks a menu position from a 0-based number or a fuzzy title match.
pub fn determine_action_as_number(menu_options: &[String], choice: &str) -> Option<usize> {
    let choice = choice.trim().to_lowercase();
    if choice.is_empty() {
        return None;
    }

    if let Ok(index) = choice.parse::<usize>() {
        return (index < menu_options.len()).then_some(index);
    }

    let (best_match_index, best_score) = menu_options
        .iter()
        .enumerate()
        .map(|(index, option)| {
            let title = option_title(option).to_lowercase();
            (index, fuzz::ratio(&choice, &title))
        })
        // On equal scores keep the earlier option.
        .fold((0, 0), |best, candidate| {
            if candidate.1 > best.1 {
                candidate
            } else {
                best
            }
        });

    (best_score > FUZZY_THRESHOLD).then_some(best_match_index)
}

pub fn print_insight(message: &str) {
    let bold_orange = "\x1b[1;38;5;208m";
    let reset = "\x1b[0m";

    println!("{}@BIGBro: {}{}", bold_orange, message, reset);
}

pub fn print_insight_level_2(message: &str) {
    let orange = "\x1b[0;38;5;208m";
    let reset = "\x1b[0m";

    println!("  {}@LILBro: {}{}", orange, message, reset);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu() -> Vec<String> {
        vec![
            "Overview".to_string(),
            "Q1: Sales by Category".to_string(),
            "Q2: Profit by Sub-Category".to_string(),
            "Q3: Sales by Region".to_string(),
        ]
    }

    #[test]
    fn numbers_index_from_zero() {
        assert_eq!(determine_action_as_number(&menu(), "0"), Some(0));
        assert_eq!(determine_action_as_number(&menu(), " 3 "), Some(3));
        assert_eq!(determine_action_as_number(&menu(), "4"), None);
    }

    #[test]
    fn titles_match_fuzzily() {
        assert_eq!(determine_action_as_number(&menu(), "sales by regoin"), Some(3));
        assert_eq!(determine_action_as_number(&menu(), "overveiw"), Some(0));
    }

    #[test]
    fn gibberish_matches_nothing() {
        assert_eq!(determine_action_as_number(&menu(), "zzzzqqqq"), None);
        assert_eq!(determine_action_as_number(&menu(), ""), None);
    }
}
