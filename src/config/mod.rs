//! Command-line parsing and validation helpers.

mod defaults;
mod validation;

use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;

pub use defaults::{
    default_model_dir, DEFAULT_BEAM_SIZE, DEFAULT_ENERGY_THRESHOLD, DEFAULT_FRAME_RATE,
    DEFAULT_OUTDIR, DEFAULT_OUTPUT_FILE, DEFAULT_PHRASE_TIMEOUT_SECS, DEFAULT_RECORD_TIMEOUT_SECS,
};
pub use validation::resolve_model_path;

/// Whisper checkpoint sizes accepted by `--model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
    #[value(name = "large-v1")]
    LargeV1,
    #[value(name = "large-v2")]
    LargeV2,
}

impl ModelSize {
    pub fn base_name(self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
            ModelSize::LargeV1 => "large-v1",
            ModelSize::LargeV2 => "large-v2",
        }
    }

    pub fn is_large(self) -> bool {
        matches!(
            self,
            ModelSize::Large | ModelSize::LargeV1 | ModelSize::LargeV2
        )
    }

    /// Checkpoint name to load. English-only variants carry a `.en` suffix;
    /// the large checkpoints are multilingual-only and never get one.
    pub fn resolve_name(self, non_english: bool) -> String {
        if self.is_large() || non_english {
            self.base_name().to_string()
        } else {
            format!("{}.en", self.base_name())
        }
    }
}

/// Model and logging options shared by both binaries.
#[derive(Debug, Args, Clone)]
pub struct ModelOpts {
    /// Path to a GGML model file; overrides the --model lookup
    #[arg(long = "model_path")]
    pub model_path: Option<PathBuf>,

    /// Language passed to Whisper ("auto" enables detection)
    #[arg(long, default_value = "en")]
    pub lang: String,

    /// Beam width for decoding; >1 enables beam search
    #[arg(long = "beam_size", default_value_t = DEFAULT_BEAM_SIZE)]
    pub beam_size: u32,

    /// Enable debug file logging
    #[arg(long = "logs", env = "VOXSCRIBE_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs)
    #[arg(long = "no-logs", default_value_t = false)]
    pub no_logs: bool,
}

impl ModelOpts {
    pub fn logging_enabled(&self) -> bool {
        self.logs && !self.no_logs
    }
}

/// CLI options for the real-time transcriber.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "transcribe-rt",
    about = "voxscribe: real-time microphone transcription",
    author,
    version
)]
pub struct LiveConfig {
    /// Whisper model size to use
    #[arg(long, value_enum, default_value_t = ModelSize::Medium)]
    pub model: ModelSize,

    /// Don't use the English-only model variant
    #[arg(long = "non_english", default_value_t = false)]
    pub non_english: bool,

    /// Energy level the microphone must exceed to count as speech
    #[arg(long = "energy_threshold", default_value_t = DEFAULT_ENERGY_THRESHOLD)]
    pub energy_threshold: u32,

    /// How real-time the recording is: max seconds per captured chunk
    #[arg(long = "record_timeout", default_value_t = DEFAULT_RECORD_TIMEOUT_SECS)]
    pub record_timeout: f64,

    /// Empty space between recordings before a new transcript line starts
    #[arg(long = "phrase_timeout", default_value_t = DEFAULT_PHRASE_TIMEOUT_SECS)]
    pub phrase_timeout: f64,

    /// Transcript destination; rewritten in full on every update
    #[arg(long = "output_file", default_value = DEFAULT_OUTPUT_FILE)]
    pub output_file: PathBuf,

    /// Microphone name to capture from; pass `list` to print devices and exit
    #[cfg(target_os = "linux")]
    #[arg(long = "default_microphone", default_value = "pulse")]
    pub default_microphone: String,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    #[command(flatten)]
    pub opts: ModelOpts,
}

impl LiveConfig {
    /// Device override requested on the command line, if any.
    pub fn preferred_device(&self) -> Option<&str> {
        #[cfg(target_os = "linux")]
        {
            match self.default_microphone.as_str() {
                "" | "pulse" => None,
                name => Some(name),
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            None
        }
    }

    /// Whether the device-listing fast path was requested.
    pub fn wants_device_list(&self) -> bool {
        if self.list_input_devices {
            return true;
        }
        #[cfg(target_os = "linux")]
        {
            return self.default_microphone == "list";
        }
        #[cfg(not(target_os = "linux"))]
        {
            false
        }
    }
}

/// CLI options for the batch file transcriber.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "transcribe-file",
    about = "voxscribe: transcribe a WAV file into per-utterance clips and a manifest",
    author,
    version
)]
pub struct BatchConfig {
    /// Whisper model size to use
    #[arg(long, value_enum, default_value_t = ModelSize::LargeV2)]
    pub model: ModelSize,

    /// Don't use the English-only model variant
    #[arg(long = "non_english", default_value_t = true)]
    pub non_english: bool,

    /// Energy level the microphone must exceed to count as speech
    #[arg(long = "energy_threshold", default_value_t = DEFAULT_ENERGY_THRESHOLD)]
    pub energy_threshold: u32,

    /// How real-time the recording is: max seconds per captured chunk
    #[arg(long = "record_timeout", default_value_t = DEFAULT_RECORD_TIMEOUT_SECS)]
    pub record_timeout: f64,

    /// Empty space between recordings before a new transcript line starts
    #[arg(long = "phrase_timeout", default_value_t = DEFAULT_PHRASE_TIMEOUT_SECS)]
    pub phrase_timeout: f64,

    /// Input WAV file to transcribe
    #[arg(long = "file")]
    pub file: PathBuf,

    /// Output directory for clips and the filelist manifest
    #[arg(long = "outdir", default_value = DEFAULT_OUTDIR)]
    pub outdir: PathBuf,

    /// Sample rate for exported clips (Hz)
    #[arg(long = "frame_rate", default_value_t = DEFAULT_FRAME_RATE)]
    pub frame_rate: u32,

    #[command(flatten)]
    pub opts: ModelOpts,
}
