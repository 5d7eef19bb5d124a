//! Energy-gated chunk assembly.
//!
//! Turns a stream of fixed-size audio frames into speech chunks: leading
//! silence is dropped, a chunk closes when it reaches the record timeout or
//! when the speaker pauses long enough. The real-time consumer treats each
//! emitted chunk as one queue entry.

use super::meter::rms_db;

/// Trailing silence that closes an utterance early (before the record
/// timeout forces a flush).
pub(super) const SILENCE_CLOSE_MS: u64 = 800;

#[derive(Debug, Clone)]
pub(super) struct ChunkerConfig {
    pub(super) sample_rate: u32,
    pub(super) threshold_db: f32,
    pub(super) max_chunk_ms: u64,
    pub(super) silence_close_ms: u64,
}

impl ChunkerConfig {
    pub(super) fn new(sample_rate: u32, threshold_db: f32, max_chunk_ms: u64) -> Self {
        Self {
            sample_rate,
            threshold_db,
            max_chunk_ms: max_chunk_ms.max(1),
            silence_close_ms: SILENCE_CLOSE_MS,
        }
    }
}

/// Accumulates frames into speech chunks.
///
/// State: idle until a frame crosses the energy gate, then recording until
/// either `max_chunk_ms` of audio is buffered or `silence_close_ms` of
/// consecutive quiet frames arrive.
pub(super) struct ChunkAssembler {
    cfg: ChunkerConfig,
    buffer: Vec<f32>,
    recording: bool,
    silence_run_ms: u64,
}

impl ChunkAssembler {
    pub(super) fn new(cfg: ChunkerConfig) -> Self {
        Self {
            cfg,
            buffer: Vec::new(),
            recording: false,
            silence_run_ms: 0,
        }
    }

    fn buffered_ms(&self) -> u64 {
        (self.buffer.len() as u64 * 1000) / u64::from(self.cfg.sample_rate.max(1))
    }

    /// Feed one frame; returns a finished chunk when one closes.
    pub(super) fn push_frame(&mut self, frame: &[f32]) -> Option<Vec<f32>> {
        if frame.is_empty() {
            return None;
        }
        let frame_ms = (frame.len() as u64 * 1000) / u64::from(self.cfg.sample_rate.max(1));
        let loud = rms_db(frame) >= self.cfg.threshold_db;

        if !self.recording {
            if !loud {
                return None; // leading silence is dropped
            }
            self.recording = true;
            self.silence_run_ms = 0;
        }

        self.buffer.extend_from_slice(frame);
        if loud {
            self.silence_run_ms = 0;
        } else {
            self.silence_run_ms = self.silence_run_ms.saturating_add(frame_ms.max(1));
        }

        if self.buffered_ms() >= self.cfg.max_chunk_ms
            || self.silence_run_ms >= self.cfg.silence_close_ms
        {
            return Some(self.take_chunk());
        }
        None
    }

    /// Flush whatever is buffered, if anything. Used at shutdown so the last
    /// partial utterance is not lost.
    pub(super) fn flush(&mut self) -> Option<Vec<f32>> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.take_chunk())
        }
    }

    fn take_chunk(&mut self) -> Vec<f32> {
        self.recording = false;
        self.silence_run_ms = 0;
        std::mem::take(&mut self.buffer)
    }
}
