//! Error types.
//!
//! [`RecipeError`] covers everything that can go wrong getting a recipe on
//! screen. Each variant ends up in the Error view through
//! [`RecipeError::user_message`]; none of them is fatal.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecipeError {
    #[error("no API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,
    #[error("network error: {0}")]
    Network(String),
    #[error("recipe service returned {status}: {body}")]
    Service { status: u16, body: String },
    #[error("malformed recipe response: {0}")]
    Malformed(String),
    #[error("the recipe came back without any steps")]
    EmptyRecipe,
}

impl RecipeError {
    /// Text shown in the Error view.
    pub fn user_message(&self) -> String {
        format!("Something went wrong: {self}. Please try again.")
    }
}

/// A submission that was refused before any request was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("enter a dish name first")]
    BlankDish,
    #[error("a recipe is already being generated")]
    Busy,
}
