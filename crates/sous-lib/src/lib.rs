//! sous-lib — Recipe walker engine.
//!
//! Recipe generation, narration, the session owner, and the HTTP API.
//! Depends on sous-core for pure types and session logic.

pub mod app;
pub mod gemini;
pub mod kokoro;
pub mod narrator;
pub mod server;
pub mod source;
pub mod streaming_source;

// Re-export sous-core for convenience
pub use sous_core;
