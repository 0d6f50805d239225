//! Plain-text rendering of a [`ViewSnapshot`] for the terminal.

use sous_lib::sous_core::types::{ViewSnapshot, ViewState};

pub fn render(snap: &ViewSnapshot) -> String {
    match snap.view {
        ViewState::Input => "What would you like to cook? (blank line to quit)".to_string(),
        ViewState::Loading => format!("Writing a recipe for {}…", snap.dish),
        ViewState::Error => format!(
            "{}\n[enter] try again",
            snap.error.as_deref().unwrap_or("Something went wrong.")
        ),
        ViewState::Recipe => {
            let step = snap.step.as_deref().unwrap_or_default();
            format!(
                "{}\nStep {} of {}: {}\n{}",
                snap.dish,
                snap.step_number,
                snap.total_steps,
                step,
                controls(snap)
            )
        }
    }
}

fn controls(snap: &ViewSnapshot) -> String {
    let previous = if snap.can_previous { "[p] previous" } else { "[-] previous" };
    let next = if snap.can_next { "[n] next" } else { "[-] next" };
    format!("{previous}  {next}  [r] repeat  [s] start over  [q] quit")
}

/// A key typed in the recipe view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeKey {
    Next,
    Previous,
    Repeat,
    StartOver,
    Quit,
}

pub fn parse_recipe_key(line: &str) -> Option<RecipeKey> {
    match line.trim().to_ascii_lowercase().as_str() {
        "n" | "next" | "" => Some(RecipeKey::Next),
        "p" | "prev" | "previous" => Some(RecipeKey::Previous),
        "r" | "repeat" => Some(RecipeKey::Repeat),
        "s" | "start over" | "restart" => Some(RecipeKey::StartOver),
        "q" | "quit" | "exit" => Some(RecipeKey::Quit),
        _ => None,
    }
}
