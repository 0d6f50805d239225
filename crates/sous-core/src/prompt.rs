//! Prompt and schema for recipe generation, and parsing of the reply.
//!
//! The model is asked for `{"steps": [string, ...]}` under a strict response
//! schema. Anything else is a [`RecipeError::Malformed`]; a well-formed but
//! empty list is a [`RecipeError::EmptyRecipe`].

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::RecipeError;

/// Trim a dish name and collapse inner whitespace. `None` if nothing is left.
pub fn normalize_dish(input: &str) -> Option<String> {
    let dish = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if dish.is_empty() { None } else { Some(dish) }
}

pub fn build_prompt(dish: &str) -> String {
    format!(
        "Give me a recipe for {dish}. Return the cooking instructions as an ordered list \
         of short, plain-text steps, each one a single instruction that can be read aloud. \
         Do not number the steps and do not use markdown."
    )
}

/// `responseSchema` for a Gemini `generationConfig`.
pub fn steps_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "steps": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            }
        },
        "required": ["steps"]
    })
}

#[derive(Deserialize)]
struct StepsPayload {
    steps: Vec<String>,
}

/// Parse the model's JSON reply into a step list.
///
/// Steps are trimmed and blank entries dropped.
pub fn parse_steps(text: &str) -> Result<Vec<String>, RecipeError> {
    let body = strip_code_fence(text.trim());
    let payload: StepsPayload =
        serde_json::from_str(body).map_err(|e| RecipeError::Malformed(e.to_string()))?;

    let steps: Vec<String> = payload
        .steps
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if steps.is_empty() {
        return Err(RecipeError::EmptyRecipe);
    }
    Ok(steps)
}

/// Remove a surrounding ```` ```json ```` fence if the model added one.
fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop an info string such as `json` on the opening line.
    match inner.find('\n') {
        Some(pos) if !inner[..pos].contains('{') => inner[pos + 1..].trim(),
        _ => inner.trim(),
    }
}
