//! sous-core — Pure types and session logic.
//!
//! No async runtime, no I/O, no platform dependencies.

pub mod error;
pub mod prompt;
pub mod session;
pub mod text_prep;
pub mod types;
pub mod view;
