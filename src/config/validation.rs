use super::defaults::{
    default_model_dir, MAX_BEAM_SIZE, MAX_ENERGY_THRESHOLD, MAX_FRAME_RATE,
    MAX_PHRASE_TIMEOUT_SECS, MAX_RECORD_TIMEOUT_SECS, MIN_ENERGY_THRESHOLD, MIN_FRAME_RATE,
    MIN_PHRASE_TIMEOUT_SECS, MIN_RECORD_TIMEOUT_SECS,
};
use super::{BatchConfig, LiveConfig, ModelOpts, ModelSize};
use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

impl LiveConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_energy_threshold(self.energy_threshold)?;
        check_record_timeout(self.record_timeout)?;
        check_phrase_timeout(self.phrase_timeout)?;
        check_model_opts(&self.opts)?;
        if self.output_file.as_os_str().is_empty() {
            bail!("--output_file must not be empty");
        }
        Ok(())
    }
}

impl BatchConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_energy_threshold(self.energy_threshold)?;
        check_record_timeout(self.record_timeout)?;
        check_phrase_timeout(self.phrase_timeout)?;
        check_model_opts(&self.opts)?;
        if !(MIN_FRAME_RATE..=MAX_FRAME_RATE).contains(&self.frame_rate) {
            bail!(
                "--frame_rate must be between {MIN_FRAME_RATE} and {MAX_FRAME_RATE} Hz, got {}",
                self.frame_rate
            );
        }
        if self.file.as_os_str().is_empty() {
            bail!("--file must not be empty");
        }
        if self.outdir.as_os_str().is_empty() {
            bail!("--outdir must not be empty");
        }
        Ok(())
    }
}

fn check_energy_threshold(value: u32) -> Result<()> {
    if !(MIN_ENERGY_THRESHOLD..=MAX_ENERGY_THRESHOLD).contains(&value) {
        bail!(
            "--energy_threshold must be between {MIN_ENERGY_THRESHOLD} and {MAX_ENERGY_THRESHOLD}, got {value}"
        );
    }
    Ok(())
}

fn check_record_timeout(value: f64) -> Result<()> {
    if !value.is_finite() || !(MIN_RECORD_TIMEOUT_SECS..=MAX_RECORD_TIMEOUT_SECS).contains(&value)
    {
        bail!(
            "--record_timeout must be between {MIN_RECORD_TIMEOUT_SECS} and {MAX_RECORD_TIMEOUT_SECS} seconds, got {value}"
        );
    }
    Ok(())
}

fn check_phrase_timeout(value: f64) -> Result<()> {
    if !value.is_finite() || !(MIN_PHRASE_TIMEOUT_SECS..=MAX_PHRASE_TIMEOUT_SECS).contains(&value)
    {
        bail!(
            "--phrase_timeout must be between {MIN_PHRASE_TIMEOUT_SECS} and {MAX_PHRASE_TIMEOUT_SECS} seconds, got {value}"
        );
    }
    Ok(())
}

fn check_model_opts(opts: &ModelOpts) -> Result<()> {
    if opts.beam_size == 0 || opts.beam_size > MAX_BEAM_SIZE {
        bail!(
            "--beam_size must be between 1 and {MAX_BEAM_SIZE}, got {}",
            opts.beam_size
        );
    }
    let lang = opts.lang.as_str();
    if lang.is_empty() || lang.len() > 8 || !lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        bail!("--lang must be a short language code or 'auto', got {lang:?}");
    }
    Ok(())
}

/// Resolve the GGML file to load: an explicit `--model_path` wins, otherwise
/// `ggml-<name>.bin` under the model directory. Fails with the expected path
/// in the message so users know what to download.
pub fn resolve_model_path(
    size: ModelSize,
    non_english: bool,
    override_path: Option<&PathBuf>,
) -> Result<PathBuf> {
    if let Some(path) = override_path {
        if !path.is_file() {
            bail!("model file {} does not exist", path.display());
        }
        return Ok(path.clone());
    }
    let name = size.resolve_name(non_english);
    let candidate = default_model_dir().join(format!("ggml-{name}.bin"));
    if !candidate.is_file() {
        bail!(
            "model file {} not found; download a ggml-{name}.bin checkpoint or pass --model_path",
            candidate.display()
        );
    }
    Ok(candidate)
}
