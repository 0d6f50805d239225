//! Recipe session — the ordered steps and the cursor into them.
//!
//! Transitions hand back the step that should be read aloud; the caller owns
//! the speech side effect. A `None` from `next`/`previous` means the move was
//! a boundary no-op and nothing should be spoken.

use crate::error::RecipeError;

#[derive(Debug, Clone, Default)]
pub struct RecipeSession {
    steps: Vec<String>,
    /// Always `< steps.len()` when steps is non-empty, `0` otherwise.
    index: usize,
}

impl RecipeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the recipe and rewind to the first step.
    ///
    /// An empty list is rejected and leaves the session untouched.
    pub fn load(&mut self, steps: Vec<String>) -> Result<&str, RecipeError> {
        if steps.is_empty() {
            return Err(RecipeError::EmptyRecipe);
        }
        self.steps = steps;
        self.index = 0;
        Ok(&self.steps[0])
    }

    pub fn next(&mut self) -> Option<&str> {
        if !self.can_next() {
            return None;
        }
        self.index += 1;
        self.current_step()
    }

    pub fn previous(&mut self) -> Option<&str> {
        if !self.can_previous() {
            return None;
        }
        self.index -= 1;
        self.current_step()
    }

    /// The current step again, without moving.
    pub fn repeat(&self) -> Option<&str> {
        self.current_step()
    }

    pub fn reset(&mut self) {
        self.steps.clear();
        self.index = 0;
    }

    pub fn current_step(&self) -> Option<&str> {
        self.steps.get(self.index).map(String::as_str)
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn can_previous(&self) -> bool {
        !self.steps.is_empty() && self.index > 0
    }

    pub fn can_next(&self) -> bool {
        self.index + 1 < self.steps.len()
    }
}
