//! Whisper speech-to-text integration.
//!
//! Wraps `whisper_rs` to provide a simple transcription API. The model is
//! loaded once and reused across calls to avoid repeated initialization
//! overhead.

/// One model-emitted utterance: seconds-denominated bounds plus its text.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[cfg(unix)]
mod platform {
    use super::Segment;
    use crate::config::ModelOpts;
    use crate::log_debug;
    use anyhow::{anyhow, Context, Result};
    use std::io;
    use std::os::raw::{c_char, c_uint, c_void};
    use std::os::unix::io::AsRawFd;
    use std::path::Path;
    use std::sync::Once;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    /// Whisper model context for speech-to-text transcription.
    ///
    /// Holds the loaded GGML model in memory. Create once at startup and
    /// reuse for all transcription requests.
    pub struct Transcriber {
        ctx: WhisperContext,
    }

    impl Transcriber {
        /// Loads the Whisper model from disk.
        ///
        /// Temporarily redirects stderr to `/dev/null` during loading because
        /// whisper.cpp emits verbose initialization messages.
        ///
        /// # Errors
        ///
        /// Returns an error if the model file cannot be loaded or stderr
        /// redirection fails.
        pub fn new(model_path: &Path) -> Result<Self> {
            install_whisper_log_silencer();

            let model_path = model_path
                .to_str()
                .ok_or_else(|| anyhow!("model path is not valid UTF-8"))?;

            let null = std::fs::OpenOptions::new()
                .write(true)
                .open("/dev/null")
                .context("failed to open /dev/null")?;
            let null_fd = null.as_raw_fd();

            // SAFETY: dup(2) duplicates the stderr file descriptor. We restore
            // it after model loading completes. This is safe because we hold
            // the only reference and restore before returning.
            let orig_stderr = unsafe { libc::dup(2) };
            if orig_stderr < 0 {
                return Err(anyhow!(
                    "failed to dup stderr: {}",
                    io::Error::last_os_error()
                ));
            }

            // Redirect stderr to /dev/null temporarily
            let dup_result = unsafe { libc::dup2(null_fd, 2) };
            if dup_result < 0 {
                unsafe {
                    libc::close(orig_stderr);
                }
                return Err(anyhow!(
                    "failed to redirect stderr: {}",
                    io::Error::last_os_error()
                ));
            }

            // Load model (output will be suppressed)
            let ctx_result =
                WhisperContext::new_with_params(model_path, WhisperContextParameters::default());

            // Restore original stderr
            let restore_result = unsafe { libc::dup2(orig_stderr, 2) };
            unsafe {
                libc::close(orig_stderr);
            }
            if restore_result < 0 {
                return Err(anyhow!(
                    "failed to restore stderr: {}",
                    io::Error::last_os_error()
                ));
            }

            let ctx = ctx_result.context("failed to load whisper model")?;
            Ok(Self { ctx })
        }

        /// Transcribe PCM samples and return the concatenated text:
        /// each segment trimmed, joined by single spaces.
        pub fn transcribe(&self, samples: &[f32], opts: &ModelOpts) -> Result<String> {
            let segments = self.transcribe_segments(samples, opts)?;
            let text = segments
                .iter()
                .map(|segment| segment.text.as_str())
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            Ok(text)
        }

        /// Transcribe PCM samples and return the timed segments in order.
        pub fn transcribe_segments(
            &self,
            samples: &[f32],
            opts: &ModelOpts,
        ) -> Result<Vec<Segment>> {
            let mut state = self
                .ctx
                .create_state()
                .context("failed to create whisper state")?;
            let mut params = if opts.beam_size > 1 {
                FullParams::new(SamplingStrategy::BeamSearch {
                    beam_size: opts.beam_size as i32,
                    patience: -1.0,
                })
            } else {
                FullParams::new(SamplingStrategy::Greedy { best_of: 1 })
            };
            if opts.lang.eq_ignore_ascii_case("auto") {
                params.set_language(None);
                params.set_detect_language(true);
            } else {
                params.set_language(Some(&opts.lang));
                params.set_detect_language(false);
            }
            // Limit CPU usage so laptops don't max out all cores.
            params.set_n_threads(num_cpus::get().min(8) as i32);
            params.set_print_progress(false);
            params.set_print_timestamps(false);
            params.set_print_special(false);
            params.set_print_realtime(false);
            params.set_translate(false);
            params.set_token_timestamps(false);
            state.full(params, samples)?;

            let num_segments = match state.full_n_segments() {
                Ok(count) => count,
                Err(err) => {
                    log_debug(&format!("Whisper failed to read segment count: {err}"));
                    return Ok(Vec::new());
                }
            };
            if num_segments < 0 {
                log_debug("Whisper returned a negative segment count");
                return Ok(Vec::new());
            }

            let mut segments = Vec::with_capacity(num_segments as usize);
            for i in 0..num_segments {
                let text = match state.full_get_segment_text_lossy(i) {
                    Ok(text) => text,
                    Err(err) => {
                        log_debug(&format!("Failed to read whisper segment {i}: {err}"));
                        continue;
                    }
                };
                // Scrub Whisper's [BLANK_AUDIO] token and skip empty results.
                let text = text.replace("[BLANK_AUDIO]", "").trim().to_string();
                if text.is_empty() {
                    continue;
                }
                // Segment bounds are reported in centiseconds.
                let start = state.full_get_segment_t0(i).unwrap_or(0) as f64 / 100.0;
                let end = state.full_get_segment_t1(i).unwrap_or(0) as f64 / 100.0;
                segments.push(Segment { start, end, text });
            }
            Ok(segments)
        }
    }

    fn install_whisper_log_silencer() {
        static INSTALL_LOG_CALLBACK: Once = Once::new();
        INSTALL_LOG_CALLBACK.call_once(|| unsafe {
            whisper_rs::set_log_callback(Some(whisper_log_callback), std::ptr::null_mut());
        });
    }

    #[allow(unused_variables)]
    unsafe extern "C" fn whisper_log_callback(
        _level: c_uint,
        _text: *const c_char,
        _user_data: *mut c_void,
    ) {
        // Silence the default whisper.cpp logger so it does not corrupt the
        // transcript display.
    }
}

#[cfg(unix)]
pub use platform::Transcriber;

#[cfg(not(unix))]
mod platform {
    use super::Segment;
    use crate::config::ModelOpts;
    use anyhow::{anyhow, Result};
    use std::path::Path;

    /// Stub implementation for unsupported targets such as Windows.
    pub struct Transcriber;

    impl Transcriber {
        pub fn new(_: &Path) -> Result<Self> {
            Err(anyhow!(
                "Whisper transcription is currently supported only on Unix-like platforms"
            ))
        }

        pub fn transcribe(&self, _: &[f32], _: &ModelOpts) -> Result<String> {
            Err(anyhow!(
                "Whisper transcription is currently supported only on Unix-like platforms"
            ))
        }

        pub fn transcribe_segments(&self, _: &[f32], _: &ModelOpts) -> Result<Vec<Segment>> {
            Err(anyhow!(
                "Whisper transcription is currently supported only on Unix-like platforms"
            ))
        }
    }
}

#[cfg(not(unix))]
pub use platform::Transcriber;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[cfg(unix)]
    #[test]
    fn transcriber_rejects_missing_model() {
        let result = Transcriber::new(Path::new("/no/such/model.bin"));
        assert!(result.is_err());
    }
}
