//! WAV container helpers for the batch pipeline.

use anyhow::{anyhow, bail, Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

/// Mono PCM audio plus its sample rate.
#[derive(Debug, Clone)]
pub struct WavAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl WavAudio {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Slice by millisecond bounds, clamped to the audio length.
    pub fn slice_ms(&self, start_ms: u64, end_ms: u64) -> &[f32] {
        let rate = u64::from(self.sample_rate);
        let start = ((start_ms * rate) / 1000).min(self.samples.len() as u64) as usize;
        let end = ((end_ms * rate) / 1000).min(self.samples.len() as u64) as usize;
        if start >= end {
            return &[];
        }
        &self.samples[start..end]
    }
}

/// Load a WAV file, downmixing to mono f32 at the container's native rate.
pub fn load_mono(path: &Path) -> Result<WavAudio> {
    let mut reader = WavReader::open(path)
        .with_context(|| format!("failed to open WAV file {}", path.display()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read float samples")?,
        (SampleFormat::Int, bits) if bits <= 16 => {
            let scale = 1.0 / f32::from(i16::MAX);
            reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()
                .context("failed to read 16-bit samples")?
        }
        (SampleFormat::Int, bits) if bits <= 32 => {
            let scale = 1.0 / (1u64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()
                .context("failed to read 32-bit samples")?
        }
        (format, bits) => bail!("unsupported WAV encoding: {format:?} {bits}-bit"),
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    if samples.is_empty() {
        bail!("WAV file {} contains no audio", path.display());
    }

    Ok(WavAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}

/// Write mono f32 samples as 16-bit PCM at `sample_rate`.
pub fn save_mono(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("failed to create WAV file {}", path.display()))?;
    for sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16;
        writer
            .write_sample(value)
            .context("failed to write WAV sample")?;
    }
    writer
        .finalize()
        .map_err(|err| anyhow!("failed to finalize WAV file {}: {err}", path.display()))
}
