//! RecipeApp — the session object every front end drives.
//!
//! Owns the view controller, the recipe session, the dish being cooked, and
//! the narrator. Cloneable handle; all methods are cheap except `submit`,
//! which awaits the recipe fetch.
//!
//! The state lock is never held across the fetch. The fetch itself runs in a
//! spawned task so that dropping a `submit` future (for instance an HTTP
//! client hanging up) still lands the result and clears the pending flag.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use sous_core::error::{RecipeError, SubmitError};
use sous_core::prompt::normalize_dish;
use sous_core::session::RecipeSession;
use sous_core::types::{ViewSnapshot, ViewState};
use sous_core::view::ViewController;

use crate::narrator::Narrator;
use crate::source::RecipeSource;

#[derive(Clone)]
pub struct RecipeApp {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<AppState>,
    source: Arc<dyn RecipeSource>,
    narrator: Narrator,
}

#[derive(Default)]
struct AppState {
    view: ViewController,
    session: RecipeSession,
    dish: String,
    pending: bool,
}

impl AppState {
    fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot::capture(&self.view, &self.session, &self.dish, self.pending)
    }

    /// Back to a blank Input view.
    fn clear(&mut self) {
        self.session.reset();
        self.dish.clear();
        self.view.show(ViewState::Input);
    }
}

impl RecipeApp {
    pub fn new(source: Arc<dyn RecipeSource>, narrator: Narrator) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(AppState::default()),
                source,
                narrator,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, AppState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.state().snapshot()
    }

    /// Generate a recipe for `dish` and show it.
    ///
    /// Shows Loading straight away, then exactly one of Recipe or Error.
    /// Refused without touching the view if the dish is blank or another
    /// fetch is still running.
    pub async fn submit(&self, dish: &str) -> Result<ViewSnapshot, SubmitError> {
        let dish = normalize_dish(dish).ok_or(SubmitError::BlankDish)?;

        {
            let mut state = self.state();
            if state.pending {
                warn!("submit: {dish:?} refused, a fetch is already running");
                return Err(SubmitError::Busy);
            }
            state.pending = true;
            state.session.reset();
            state.dish = dish.clone();
            state.view.show(ViewState::Loading);
            self.inner.narrator.silence();
        }
        info!("submit: fetching recipe for {dish:?}");

        let app = self.clone();
        let task = tokio::spawn(async move {
            let result = app.inner.source.fetch_steps(&dish).await;
            app.finish_fetch(result)
        });

        Ok(match task.await {
            Ok(snapshot) => snapshot,
            Err(e) => self.finish_fetch(Err(RecipeError::Network(format!(
                "recipe fetch did not complete: {e}"
            )))),
        })
    }

    fn finish_fetch(&self, result: Result<Vec<String>, RecipeError>) -> ViewSnapshot {
        let mut state = self.state();
        state.pending = false;

        let loaded = result.and_then(|steps| state.session.load(steps).map(str::to_owned));
        match loaded {
            Ok(first) => {
                info!("submit: loaded {} steps", state.session.len());
                state.view.show(ViewState::Recipe);
                self.inner.narrator.say(&first);
            }
            Err(e) => {
                error!("submit: {e}");
                state.session.reset();
                state.view.show_error(e.user_message());
            }
        }
        state.snapshot()
    }

    pub fn next(&self) -> ViewSnapshot {
        self.navigate("next", |session| session.next().map(str::to_owned))
    }

    pub fn previous(&self) -> ViewSnapshot {
        self.navigate("previous", |session| session.previous().map(str::to_owned))
    }

    pub fn repeat(&self) -> ViewSnapshot {
        self.navigate("repeat", |session| session.repeat().map(str::to_owned))
    }

    fn navigate(
        &self,
        op: &str,
        f: impl FnOnce(&mut RecipeSession) -> Option<String>,
    ) -> ViewSnapshot {
        let mut state = self.state();
        if !state.view.visible(ViewState::Recipe) {
            debug!("{op}: ignored outside the recipe view");
            return state.snapshot();
        }
        match f(&mut state.session) {
            Some(step) => {
                debug!("{op}: step {}", state.session.current_index() + 1);
                self.inner.narrator.say(&step);
            }
            None => debug!("{op}: at boundary"),
        }
        state.snapshot()
    }

    /// Drop the recipe and return to Input. Ignored while a fetch is pending.
    pub fn start_over(&self) -> ViewSnapshot {
        let mut state = self.state();
        if state.pending {
            debug!("start over: ignored while loading");
            return state.snapshot();
        }
        self.inner.narrator.silence();
        state.clear();
        state.snapshot()
    }

    /// The Error view's recovery control.
    pub fn dismiss_error(&self) -> ViewSnapshot {
        let mut state = self.state();
        if state.view.visible(ViewState::Error) {
            self.inner.narrator.silence();
            state.clear();
        }
        state.snapshot()
    }

    /// Put `err` on screen, e.g. a configuration problem found at startup.
    pub fn report_error(&self, err: &RecipeError) -> ViewSnapshot {
        let mut state = self.state();
        if state.pending {
            return state.snapshot();
        }
        state.session.reset();
        state.view.show_error(err.user_message());
        state.snapshot()
    }
}
