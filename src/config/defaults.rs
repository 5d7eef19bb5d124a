use std::env;
use std::path::PathBuf;

/// Default mic energy gate, on the i16 amplitude scale (0..32768).
pub const DEFAULT_ENERGY_THRESHOLD: u32 = 1000;

/// Upper bound on a single recorded chunk (seconds). Smaller values make the
/// display feel more real-time at the cost of more inference calls.
pub const DEFAULT_RECORD_TIMEOUT_SECS: f64 = 2.0;

/// Silence gap that ends a phrase and starts a new transcript line (seconds).
pub const DEFAULT_PHRASE_TIMEOUT_SECS: f64 = 3.0;

pub const DEFAULT_OUTPUT_FILE: &str = "transcription.txt";
pub const DEFAULT_OUTDIR: &str = "output";

/// Export rate for batch clips; matches the Tacotron2 training pipeline.
pub const DEFAULT_FRAME_RATE: u32 = 22_050;

/// Beam width for Whisper decoding; >1 enables beam search.
pub const DEFAULT_BEAM_SIZE: u32 = 5;

pub const MIN_ENERGY_THRESHOLD: u32 = 1;
pub const MAX_ENERGY_THRESHOLD: u32 = 32_768;
pub const MIN_RECORD_TIMEOUT_SECS: f64 = 0.1;
pub const MAX_RECORD_TIMEOUT_SECS: f64 = 30.0;
pub const MIN_PHRASE_TIMEOUT_SECS: f64 = 0.2;
pub const MAX_PHRASE_TIMEOUT_SECS: f64 = 120.0;
pub const MIN_FRAME_RATE: u32 = 8_000;
pub const MAX_FRAME_RATE: u32 = 96_000;
pub const MAX_BEAM_SIZE: u32 = 16;

/// Directory searched for `ggml-<model>.bin` files when `--model_path` is not
/// given: `$WHISPER_MODEL_DIR`, else `~/.cache/whisper`.
pub fn default_model_dir() -> PathBuf {
    if let Some(dir) = env::var_os("WHISPER_MODEL_DIR") {
        return PathBuf::from(dir);
    }
    let home = env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
    home.join(".cache").join("whisper")
}
