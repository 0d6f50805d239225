//! View controller — which view is visible, and the error text when it's
//! the Error view.

use crate::types::ViewState;

#[derive(Debug, Clone, Default)]
pub struct ViewController {
    current: ViewState,
    error: Option<String>,
}

impl ViewController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `state` the only visible view. Showing anything but Error drops
    /// the pending error message.
    pub fn show(&mut self, state: ViewState) {
        self.current = state;
        if state != ViewState::Error {
            self.error = None;
        }
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.current = ViewState::Error;
        self.error = Some(message.into());
    }

    /// The recovery control. Returns `true` if an error was dismissed.
    pub fn dismiss_error(&mut self) -> bool {
        if self.current != ViewState::Error {
            return false;
        }
        self.show(ViewState::Input);
        true
    }

    pub fn current(&self) -> ViewState {
        self.current
    }

    pub fn visible(&self, state: ViewState) -> bool {
        self.current == state
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
