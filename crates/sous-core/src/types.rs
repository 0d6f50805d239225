//! Shared types for the sous recipe walker.
//!
//! Kept here so the CLI and any HTTP consumer can depend on the snapshot and
//! config shapes without pulling in tokio, rodio, or reqwest.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::session::RecipeSession;
use crate::view::ViewController;

// ─── Generation config ─────────────────────────────────────────────────────

pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Settings for the recipe generation service.
#[derive(Clone)]
pub struct GeneratorConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// `None` leaves the request without a timeout.
    pub timeout_secs: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_GEMINI_MODEL.into(),
            base_url: DEFAULT_GEMINI_URL.into(),
            timeout_secs: None,
        }
    }
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// ─── Speech config ─────────────────────────────────────────────────────────

/// Fixed spoken-language tag attached to every utterance.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Narration settings.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub kokoro_url: String,
    pub voice: String,
    pub speed: f32,
    pub language: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            kokoro_url: "http://localhost:8880".into(),
            voice: "af_heart".into(),
            speed: 1.0,
            language: DEFAULT_LANGUAGE.into(),
        }
    }
}

// ─── View types ────────────────────────────────────────────────────────────

/// Which of the four views is visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewState {
    #[default]
    Input,
    Recipe,
    Loading,
    Error,
}

/// Everything a front end needs to draw the current view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    pub view: ViewState,
    pub dish: String,
    pub step: Option<String>,
    /// 1-based, `0` when no recipe is loaded.
    pub step_number: usize,
    pub total_steps: usize,
    pub can_previous: bool,
    pub can_next: bool,
    pub error: Option<String>,
    pub pending: bool,
}

impl ViewSnapshot {
    pub fn capture(
        view: &ViewController,
        session: &RecipeSession,
        dish: &str,
        pending: bool,
    ) -> Self {
        let step = session.current_step().map(str::to_owned);
        Self {
            view: view.current(),
            dish: dish.to_string(),
            step_number: if step.is_some() {
                session.current_index() + 1
            } else {
                0
            },
            step,
            total_steps: session.len(),
            can_previous: session.can_previous(),
            can_next: session.can_next(),
            error: view.error_message().map(str::to_owned),
            pending,
        }
    }
}
