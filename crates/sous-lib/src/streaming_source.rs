//! rodio `Source` fed by a channel of PCM chunks as they stream in.
//!
//! The source is only handed to the sink once the first chunk is queued, so
//! playback never starts on an empty buffer. While waiting for more data it
//! polls for up to 10ms and plays silence on a miss. It ends on
//! [`PcmChunk::Done`] or when the sender goes away.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use rodio::Source;

const POLL: Duration = Duration::from_millis(10);

pub enum PcmChunk {
    /// Interleaved i16 samples.
    Data(Vec<i16>),
    Done,
}

pub struct StreamingSource {
    rx: Receiver<PcmChunk>,
    pending: VecDeque<i16>,
    channels: u16,
    sample_rate: u32,
    ended: bool,
}

impl StreamingSource {
    pub fn new(rx: Receiver<PcmChunk>, channels: u16, sample_rate: u32) -> Self {
        Self {
            rx,
            pending: VecDeque::with_capacity(8192),
            channels,
            sample_rate,
            ended: false,
        }
    }

    fn take(&mut self, chunk: PcmChunk) {
        match chunk {
            PcmChunk::Data(samples) => self.pending.extend(samples),
            PcmChunk::Done => self.ended = true,
        }
    }

    fn refill(&mut self) {
        while !self.ended {
            match self.rx.try_recv() {
                Ok(chunk) => self.take(chunk),
                Err(_) => break,
            }
        }

        if self.pending.is_empty() && !self.ended {
            match self.rx.recv_timeout(POLL) {
                Ok(chunk) => self.take(chunk),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => self.ended = true,
            }
        }
    }
}

impl Iterator for StreamingSource {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        if self.pending.is_empty() && !self.ended {
            self.refill();
        }
        match self.pending.pop_front() {
            Some(sample) => Some(sample),
            None if self.ended => None,
            // Underrun: keep the sink alive with silence.
            None => Some(0),
        }
    }
}

impl Source for StreamingSource {
    fn current_frame_len(&self) -> Option<usize> {
        match (self.pending.len(), self.ended) {
            (0, true) => Some(0),
            (0, false) => Some(1),
            (n, _) => Some(n),
        }
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn plays_chunks_in_order_then_ends() {
        let (tx, rx) = mpsc::channel();
        let source = StreamingSource::new(rx, 1, 24_000);

        tx.send(PcmChunk::Data(vec![10, 20])).unwrap();
        tx.send(PcmChunk::Data(vec![30])).unwrap();
        tx.send(PcmChunk::Done).unwrap();

        assert_eq!(source.collect::<Vec<_>>(), vec![10, 20, 30]);
    }

    #[test]
    fn dropped_sender_ends_stream() {
        let (tx, rx) = mpsc::channel();
        let source = StreamingSource::new(rx, 1, 24_000);
        tx.send(PcmChunk::Data(vec![7])).unwrap();
        drop(tx);

        assert_eq!(source.collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn underrun_yields_silence() {
        let (tx, rx) = mpsc::channel();
        let mut source = StreamingSource::new(rx, 1, 24_000);
        assert_eq!(source.next(), Some(0));
        tx.send(PcmChunk::Data(vec![5])).unwrap();
        assert_eq!(source.next(), Some(5));
    }

    #[test]
    fn reports_format() {
        let (_tx, rx) = mpsc::channel();
        let source = StreamingSource::new(rx, 1, 24_000);
        assert_eq!(source.channels(), 1);
        assert_eq!(source.sample_rate(), 24_000);
        assert_eq!(source.total_duration(), None);
    }
}
