//! Kokoro speech backend — streamed PCM from a Kokoro server into rodio.
//!
//! ```text
//! start(utterance) → fetch task: POST /v1/audio/speech, stream PCM
//!     → [play_tx] → playback thread: rodio sink
//! cancel(handle)  → [play_tx] Stop: clear the sink
//! ```
//!
//! Each utterance carries its own cancellation handle. The narrator marks
//! the handle cancelled before `cancel` sends Stop. The fetch task checks the
//! handle before the request and between chunks. The playback thread checks
//! it again when a Play arrives. A Play queued behind the Stop is therefore
//! always seen as stale and dropped, whatever the fetch task was doing when
//! the cancel happened.

use std::sync::mpsc;

use futures_util::StreamExt;
use rodio::{OutputStream, Sink};
use tracing::{debug, error};

use sous_core::types::SpeechConfig;

use crate::narrator::{SpeechBackend, Utterance, UtteranceHandle};
use crate::streaming_source::{PcmChunk, StreamingSource};

/// Kokoro PCM streaming format: 24 kHz mono 16-bit signed LE.
const PCM_SAMPLE_RATE: u32 = 24_000;
const PCM_CHANNELS: u16 = 1;

enum PlayCmd {
    Play(StreamingSource, UtteranceHandle),
    Stop,
}

impl PlayCmd {
    /// A Play whose utterance was cancelled after it was queued.
    fn is_stale(&self) -> bool {
        matches!(self, PlayCmd::Play(_, handle) if handle.is_cancelled())
    }
}

pub struct KokoroBackend {
    client: reqwest::Client,
    url: String,
    voice: String,
    speed: f32,
    play_tx: mpsc::Sender<PlayCmd>,
}

impl KokoroBackend {
    /// Spawn the playback thread. Fails only if the thread can't be spawned;
    /// a missing audio device is logged by the thread itself.
    pub fn new(config: &SpeechConfig) -> std::io::Result<Self> {
        let (play_tx, play_rx) = mpsc::channel::<PlayCmd>();
        // rodio OutputStream is !Send, so it lives on its own OS thread.
        std::thread::Builder::new()
            .name("sous-playback".into())
            .spawn(move || playback_thread(play_rx))?;

        Ok(Self {
            client: reqwest::Client::new(),
            url: format!("{}/v1/audio/speech", config.kokoro_url.trim_end_matches('/')),
            voice: config.voice.clone(),
            speed: config.speed,
            play_tx,
        })
    }
}

impl SpeechBackend for KokoroBackend {
    fn start(&self, utterance: Utterance, handle: UtteranceHandle) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!("kokoro: no async runtime, dropping utterance {}", utterance.id);
            return;
        };

        let body = serde_json::json!({
            "input": utterance.text,
            "voice": self.voice,
            "model": "kokoro",
            "response_format": "pcm",
            "stream": true,
            "speed": self.speed,
        });
        let client = self.client.clone();
        let url = self.url.clone();
        let play_tx = self.play_tx.clone();

        runtime.spawn(async move {
            fetch_utterance(client, url, body, handle, play_tx).await;
        });
    }

    fn cancel(&self, handle: &UtteranceHandle) {
        debug!("kokoro: stop for utterance {}", handle.id());
        let _ = self.play_tx.send(PlayCmd::Stop);
    }
}

async fn fetch_utterance(
    client: reqwest::Client,
    url: String,
    body: serde_json::Value,
    handle: UtteranceHandle,
    play_tx: mpsc::Sender<PlayCmd>,
) {
    let id = handle.id();
    if handle.is_cancelled() {
        debug!("kokoro[{id}]: cancelled before request");
        return;
    }
    debug!("kokoro[{id}]: POST {url}");

    let resp = match client.post(&url).json(&body).send().await {
        Ok(resp) if resp.status().is_success() => resp,
        Ok(resp) => {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!("kokoro[{id}]: error {status}: {text}");
            return;
        }
        Err(e) => {
            error!("kokoro[{id}]: request failed: {e}");
            return;
        }
    };

    let mut stream = resp.bytes_stream();
    let mut leftover: Option<u8> = None;
    let mut pcm_tx: Option<mpsc::Sender<PcmChunk>> = None;

    while let Some(chunk) = stream.next().await {
        if handle.is_cancelled() {
            debug!("kokoro[{id}]: cancelled mid-stream");
            break;
        }

        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                error!("kokoro[{id}]: stream error: {e}");
                break;
            }
        };

        let (samples, lo) = bytes_to_i16(&chunk, leftover.take());
        leftover = lo;
        if samples.is_empty() {
            continue;
        }

        match &pcm_tx {
            Some(tx) => {
                if tx.send(PcmChunk::Data(samples)).is_err() {
                    break;
                }
            }
            None => {
                // Prime the source before the sink sees it.
                let (tx, rx) = mpsc::channel();
                let _ = tx.send(PcmChunk::Data(samples));
                let source = StreamingSource::new(rx, PCM_CHANNELS, PCM_SAMPLE_RATE);
                if play_tx.send(PlayCmd::Play(source, handle.clone())).is_err() {
                    break;
                }
                pcm_tx = Some(tx);
            }
        }
    }

    if let Some(tx) = pcm_tx {
        let _ = tx.send(PcmChunk::Done);
    }
}

/// Convert raw bytes to i16 PCM samples (little-endian), carrying an odd
/// trailing byte over to the next chunk.
fn bytes_to_i16(bytes: &[u8], leftover: Option<u8>) -> (Vec<i16>, Option<u8>) {
    let joined;
    let slice = match leftover {
        Some(lo) => {
            joined = [&[lo][..], bytes].concat();
            &joined[..]
        }
        None => bytes,
    };

    let pairs = slice.chunks_exact(2);
    let remainder = pairs.remainder().first().copied();
    let samples = pairs.map(|p| i16::from_le_bytes([p[0], p[1]])).collect();
    (samples, remainder)
}

fn playback_thread(cmd_rx: mpsc::Receiver<PlayCmd>) {
    let (_stream, stream_handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            error!("playback: failed to open audio output: {e}");
            return;
        }
    };

    let new_sink = || match Sink::try_new(&stream_handle) {
        Ok(sink) => Some(sink),
        Err(e) => {
            error!("playback: failed to create sink: {e}");
            None
        }
    };

    let Some(mut sink) = new_sink() else {
        return;
    };

    while let Ok(cmd) = cmd_rx.recv() {
        if cmd.is_stale() {
            debug!("playback: dropping cancelled utterance");
            continue;
        }
        match cmd {
            PlayCmd::Play(source, handle) => {
                debug!("playback: utterance {} appended", handle.id());
                sink.append(source);
            }
            PlayCmd::Stop => {
                sink.stop();
                match new_sink() {
                    Some(fresh) => sink = fresh,
                    None => return,
                }
            }
        }
    }
    sink.stop();
}
