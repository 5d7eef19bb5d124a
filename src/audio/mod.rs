//! Audio capture and conditioning for the transcription pipelines.
//!
//! Microphone input is captured via CPAL, downmixed to mono, resampled to
//! 16 kHz (Whisper's expected format), gated by an energy threshold, and
//! delivered as chunks over a bounded channel.

/// Sample rate Whisper expects.
pub const TARGET_RATE: u32 = 16_000;

mod chunker;
mod listener;
mod meter;
mod resample;
#[cfg(test)]
mod tests;
pub mod wav;

pub use listener::{BackgroundCapture, Chunk, Listener, ListenerConfig};
pub(crate) use meter::{calibrated_threshold_db, threshold_db_from_energy};
pub(crate) use resample::resample;
