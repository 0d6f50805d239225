//! Where recipes come from.

use async_trait::async_trait;

use sous_core::error::RecipeError;

/// A service that turns a dish name into ordered recipe steps.
#[async_trait]
pub trait RecipeSource: Send + Sync {
    async fn fetch_steps(&self, dish: &str) -> Result<Vec<String>, RecipeError>;
}

/// Stand-in used when the generator could not be configured at startup.
/// Every fetch fails with the startup error so the user sees why.
pub struct Unconfigured(pub RecipeError);

#[async_trait]
impl RecipeSource for Unconfigured {
    async fn fetch_steps(&self, _dish: &str) -> Result<Vec<String>, RecipeError> {
        Err(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_always_fails() {
        let source = Unconfigured(RecipeError::MissingApiKey);
        assert_eq!(source.fetch_steps("omelette").await, Err(RecipeError::MissingApiKey));
        assert_eq!(source.fetch_steps("soup").await, Err(RecipeError::MissingApiKey));
    }
}
