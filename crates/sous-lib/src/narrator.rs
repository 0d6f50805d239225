//! Narrator — reads steps aloud through a pluggable speech backend.
//!
//! Holds a single slot for the current utterance. Saying something new
//! cancels whatever is in the slot first, so at most one utterance is ever
//! active and the latest request wins.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use sous_core::text_prep::prepare_for_speech;

/// One unit of spoken output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub id: u64,
    pub text: String,
    pub language: String,
}

/// Cancellation handle for a started utterance. Clones share state.
#[derive(Debug, Clone)]
pub struct UtteranceHandle {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

impl UtteranceHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// A text-to-speech sink.
///
/// `start` must not block; synthesis and playback happen in the background
/// and should stop promptly once the handle is cancelled.
pub trait SpeechBackend: Send + Sync {
    fn start(&self, utterance: Utterance, handle: UtteranceHandle);

    /// Called after `handle` has been marked cancelled.
    fn cancel(&self, handle: &UtteranceHandle);
}

pub struct Narrator {
    backend: Arc<dyn SpeechBackend>,
    language: String,
    next_id: AtomicU64,
    current: Mutex<Option<UtteranceHandle>>,
}

impl Narrator {
    pub fn new(backend: Arc<dyn SpeechBackend>, language: impl Into<String>) -> Self {
        Self {
            backend,
            language: language.into(),
            next_id: AtomicU64::new(1),
            current: Mutex::new(None),
        }
    }

    /// Cancel the current utterance and start reading `step`.
    /// Returns the new utterance id.
    pub fn say(&self, step: &str) -> u64 {
        let mut slot = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = slot.take() {
            self.cancel_handle(&prev);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let handle = UtteranceHandle::new(id);
        let utterance = Utterance {
            id,
            text: prepare_for_speech(step),
            language: self.language.clone(),
        };
        debug!("narrator: utterance {id} ({} chars)", utterance.text.len());
        self.backend.start(utterance, handle.clone());
        *slot = Some(handle);
        id
    }

    /// Cancel the current utterance, if any.
    pub fn silence(&self) {
        let mut slot = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = slot.take() {
            self.cancel_handle(&prev);
        }
    }

    /// Id of the utterance in the slot.
    pub fn current(&self) -> Option<u64> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(UtteranceHandle::id)
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn cancel_handle(&self, handle: &UtteranceHandle) {
        debug!("narrator: cancelling utterance {}", handle.id());
        handle.cancel();
        self.backend.cancel(handle);
    }
}

/// Backend that only logs what would be spoken. Used with `--mute` and as a
/// fallback when no audio output is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogBackend;

impl SpeechBackend for LogBackend {
    fn start(&self, utterance: Utterance, _handle: UtteranceHandle) {
        info!(
            id = utterance.id,
            lang = %utterance.language,
            "speak: {}",
            utterance.text
        );
    }

    fn cancel(&self, handle: &UtteranceHandle) {
        debug!(id = handle.id(), "speak: cancelled");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Event {
        Start(Utterance),
        Cancel(u64),
    }

    /// Records every backend call, and keeps the handles it was given.
    #[derive(Default)]
    pub(crate) struct RecordingBackend {
        pub events: Mutex<Vec<Event>>,
        pub handles: Mutex<Vec<UtteranceHandle>>,
    }

    impl RecordingBackend {
        pub fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        pub fn spoken(&self) -> Vec<String> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Start(u) => Some(u.text),
                    Event::Cancel(_) => None,
                })
                .collect()
        }

        /// Handles that were started and never cancelled.
        pub fn active(&self) -> usize {
            self.handles
                .lock()
                .unwrap()
                .iter()
                .filter(|h| !h.is_cancelled())
                .count()
        }
    }

    impl SpeechBackend for RecordingBackend {
        fn start(&self, utterance: Utterance, handle: UtteranceHandle) {
            self.events.lock().unwrap().push(Event::Start(utterance));
            self.handles.lock().unwrap().push(handle);
        }

        fn cancel(&self, handle: &UtteranceHandle) {
            self.events.lock().unwrap().push(Event::Cancel(handle.id()));
        }
    }

    fn narrator() -> (Narrator, Arc<RecordingBackend>) {
        let backend = Arc::new(RecordingBackend::default());
        (Narrator::new(backend.clone(), "en-US"), backend)
    }

    #[test]
    fn first_say_starts_without_cancel() {
        let (narrator, backend) = narrator();
        let id = narrator.say("Crack eggs");
        assert_eq!(
            backend.events(),
            vec![Event::Start(Utterance {
                id,
                text: "Crack eggs".into(),
                language: "en-US".into(),
            })]
        );
        assert_eq!(narrator.current(), Some(id));
    }

    #[test]
    fn new_say_cancels_previous_first() {
        let (narrator, backend) = narrator();
        let first = narrator.say("Crack eggs");
        let second = narrator.say("Whisk");

        let events = backend.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1], Event::Cancel(first));
        assert!(matches!(&events[2], Event::Start(u) if u.id == second));
        assert_eq!(backend.active(), 1);
        assert_eq!(narrator.current(), Some(second));
    }

    #[test]
    fn at_most_one_active_utterance() {
        let (narrator, backend) = narrator();
        for step in ["a step", "another", "a third", "fourth"] {
            narrator.say(step);
            assert_eq!(backend.active(), 1);
        }
    }

    #[test]
    fn silence_empties_the_slot() {
        let (narrator, backend) = narrator();
        let id = narrator.say("Cook");
        narrator.silence();
        assert_eq!(narrator.current(), None);
        assert_eq!(backend.active(), 0);
        assert_eq!(backend.events().last(), Some(&Event::Cancel(id)));

        // Nothing left to cancel.
        narrator.silence();
        assert_eq!(backend.events().len(), 2);
    }

    #[test]
    fn speaks_prepared_text() {
        let (narrator, backend) = narrator();
        narrator.say("1. **Preheat** the oven");
        assert_eq!(backend.spoken(), vec!["Preheat the oven"]);
    }
}
