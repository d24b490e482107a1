use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use tracing::warn;

use crate::identity::Identity;
use crate::rewrite::Operation;

/// Abstraction over a string input prompt.
///
/// Implementors define how string input is collected from the user,
/// including any styling or interactivity. This trait enables testability
/// by decoupling user input from the logic that consumes it.
pub trait StringPrompter {
    /// Prompt the user for a string input.
    ///
    /// # Parameters
    /// - `prompt`: The message shown to the user.
    /// - `default`: Default value if the user presses Enter without input.
    ///
    /// # Returns
    /// `Ok(String)` if input is successfully collected, or an `Err(String)` describing the failure.
    fn prompt(&mut self, prompt: &str, default: &str) -> Result<String, String>;
}

/// Abstraction over a boolean (yes/no) confirmation prompt.
pub trait ConfirmPrompter {
    /// Prompt the user for a yes/no confirmation.
    ///
    /// Returns `Ok(true)` if confirmed, `Ok(false)` if declined, or `Err(String)` on input failure.
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, String>;
}

/// `StringPrompter` backed by `dialoguer::Input` with the `ColorfulTheme`.
pub struct DialoguerStringPrompter;

impl StringPrompter for DialoguerStringPrompter {
    fn prompt(&mut self, prompt: &str, default: &str) -> Result<String, String> {
        let theme = ColorfulTheme::default();
        let input = Input::<String>::with_theme(&theme)
            .with_prompt(prompt)
            .default(default.to_string());
        match input.interact_text() {
            Ok(v) => Ok(v),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// `ConfirmPrompter` backed by `dialoguer::Confirm`.
pub struct DialoguerConfirmPrompter;

impl ConfirmPrompter for DialoguerConfirmPrompter {
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, String> {
        let theme = ColorfulTheme::default();
        let confirm = Confirm::with_theme(&theme)
            .with_prompt(prompt)
            .default(default);
        match confirm.interact() {
            Ok(v) => Ok(v),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Maps a menu answer to an operation.
///
/// Accepts the menu number or the operation name, case-insensitively.
pub fn parse_operation(input: &str) -> Option<Operation> {
    match input.trim().to_lowercase().as_str() {
        "1" | "authors" => Some(Operation::Authors),
        "2" | "messages" => Some(Operation::Messages),
        "3" | "dates" => Some(Operation::Dates),
        _ => None,
    }
}

/// Shows the operation menu and reads the choice (default `1`).
///
/// Returns `Ok(None)` for an answer that names no operation.
pub fn choose_operation<P: StringPrompter>(prompter: &mut P) -> Result<Option<Operation>, String> {
    println!();
    println!("Choose operation:");
    println!("1. Change authors");
    println!("2. Change commit messages");
    println!("3. Change commit dates");
    let answer = prompter.prompt("Select [1/2/3]", "1")?;
    Ok(parse_operation(&answer))
}

/// Asks for the replacement of `old`; blank answers keep the old values.
pub fn ask_identity<P: StringPrompter>(prompter: &mut P, old: &Identity) -> Result<Identity, String> {
    let name = prompter.prompt("  New name", &old.name)?;
    let email = prompter.prompt("  New email", &old.email)?;

    let name = match name.trim() {
        "" => old.name.clone(),
        n => n.to_string(),
    };
    let email = match email.trim() {
        "" => old.email.clone(),
        e => e.to_string(),
    };
    Ok(Identity { name, email })
}

/// Reads a signed number of years. Unparsable answers count as `0`.
pub fn ask_years<P: StringPrompter>(prompter: &mut P, label: &str) -> Result<f64, String> {
    let answer = prompter.prompt(label, "0")?;
    let trimmed = answer.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => {
            warn!(input = trimmed, "not a number of years, using 0");
            Ok(0.0)
        }
    }
}

/// Ask the user to confirm the rewrite before anything is planned.
pub fn confirm_start<P: ConfirmPrompter>(prompter: &mut P) -> Result<bool, String> {
    prompter.confirm("Start now? (history of every ref will be rewritten)", true)
}

/// Ask whether author identities should be randomized instead of prompted for.
pub fn confirm_randomize<P: ConfirmPrompter>(prompter: &mut P) -> Result<bool, String> {
    prompter.confirm("Randomize author names/emails?", false)
}

/// Ask whether backup refs should be removed after a rewrite.
pub fn confirm_cleanup<P: ConfirmPrompter>(prompter: &mut P) -> Result<bool, String> {
    prompter.confirm(
        "Remove backup refs (refs/original) and clean git history?",
        false,
    )
}
