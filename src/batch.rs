//! Batch file transcription: one Whisper pass over a WAV file, then one
//! exported clip plus one manifest line per segment.
//!
//! The manifest (`filelist.txt`) pairs each clip path with its text, the
//! format Tacotron2-style training pipelines consume.

use crate::audio::{resample, wav, TARGET_RATE};
use crate::config::{resolve_model_path, BatchConfig};
use crate::stt::{Segment, Transcriber};
use anyhow::{bail, Context, Result};
use chrono::Local;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::Path;
use tracing::{info, warn};

const MANIFEST_NAME: &str = "filelist.txt";

/// Run the batch pipeline end to end.
pub fn run(config: &BatchConfig) -> Result<()> {
    let model_path = resolve_model_path(
        config.model,
        config.non_english,
        config.opts.model_path.as_ref(),
    )?;
    let transcriber = Transcriber::new(&model_path)?;
    status(&format!(
        "Model loaded: {}",
        config.model.resolve_name(config.non_english)
    ));

    status(&format!(
        "Processing file: {} frame_rate {}",
        config.file.display(),
        config.frame_rate
    ));
    let source = wav::load_mono(&config.file)?;
    let duration = source.duration_seconds();
    if duration <= 0.0 {
        bail!(
            "input file {} has zero duration",
            config.file.display()
        );
    }

    let whisper_input = resample(&source.samples, source.sample_rate, TARGET_RATE);
    let segments = transcriber.transcribe_segments(&whisper_input, &config.opts)?;

    let clips = wav::WavAudio {
        samples: resample(&source.samples, source.sample_rate, config.frame_rate),
        sample_rate: config.frame_rate,
    };
    status(&format!(
        "File: {} length {duration:.2}s frame_rate {}",
        config.file.display(),
        clips.sample_rate
    ));

    ensure_outdir(&config.outdir)?;
    let written = export_segments(&segments, &clips, &config.outdir, duration)?;
    if written == 0 {
        warn!(file = %config.file.display(), "no segments produced");
        status("No segments produced; manifest is empty");
    } else {
        status(&format!("Done: {written} clips"));
    }
    Ok(())
}

/// Create the output directory if absent. Non-recursive: a missing parent is
/// an error rather than silently created.
fn ensure_outdir(outdir: &Path) -> Result<()> {
    match fs::create_dir(outdir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(err) => Err(err).with_context(|| {
            format!("failed to create output directory {}", outdir.display())
        }),
    }
}

/// Export one clip and one manifest line per segment. The manifest is
/// truncated first so re-runs produce a consistent file list. Returns the
/// number of clips written.
fn export_segments(
    segments: &[Segment],
    clips: &wav::WavAudio,
    outdir: &Path,
    duration: f64,
) -> Result<usize> {
    let manifest_path = outdir.join(MANIFEST_NAME);
    let mut manifest = File::create(&manifest_path)
        .with_context(|| format!("failed to create manifest {}", manifest_path.display()))?;

    let mut written = 0usize;
    for (index, segment) in segments.iter().enumerate() {
        let num = index + 1;
        let percent = completion_percent(segment.end, duration);
        status(&format!(
            "Segment #{num} {percent:02}% [{:.2} - {:.2}]: {}",
            segment.start, segment.end, segment.text
        ));
        info!(
            segment = num,
            percent,
            start = segment.start,
            end = segment.end,
            "exporting clip"
        );

        let filename = clip_filename(num);
        let clip_path = outdir.join(&filename);
        let slice = clips.slice_ms(
            seconds_to_ms(segment.start),
            seconds_to_ms(segment.end),
        );
        wav::save_mono(&clip_path, slice, clips.sample_rate)?;

        writeln!(manifest, "{}|{}", clip_path.display(), segment.text)
            .context("failed to append manifest line")?;
        manifest.flush().context("failed to flush manifest")?;
        written = num;
    }
    Ok(written)
}

fn clip_filename(num: usize) -> String {
    format!("chunk-{num:06}.wav")
}

fn completion_percent(end: f64, duration: f64) -> u32 {
    ((end / duration) * 100.0) as u32
}

fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

/// Timestamped console status line, the batch tool's progress channel.
fn status(msg: &str) {
    println!(" {}: {msg}", Local::now().format("%Y-%m-%d %H:%M:%S"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn temp_outdir(name: &str) -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "voxscribe_batch_{}_{n}_{name}",
            std::process::id()
        ))
    }

    fn tone(duration_secs: f64, rate: u32) -> wav::WavAudio {
        let count = (duration_secs * f64::from(rate)) as usize;
        wav::WavAudio {
            samples: (0..count)
                .map(|i| (i as f32 * 0.05).sin() * 0.4)
                .collect(),
            sample_rate: rate,
        }
    }

    #[test]
    fn clip_filenames_are_six_digit_one_based() {
        assert_eq!(clip_filename(1), "chunk-000001.wav");
        assert_eq!(clip_filename(42), "chunk-000042.wav");
        assert_eq!(clip_filename(999_999), "chunk-999999.wav");
    }

    #[test]
    fn completion_percent_matches_worked_example() {
        assert_eq!(completion_percent(1.2, 2.5), 48);
        assert_eq!(completion_percent(2.5, 2.5), 100);
    }

    #[test]
    fn export_writes_one_clip_and_line_per_segment() {
        let outdir = temp_outdir("export");
        fs::create_dir(&outdir).expect("create outdir");
        let clips = tone(2.5, 22_050);
        let segments = vec![
            Segment {
                start: 0.0,
                end: 1.2,
                text: "hello".into(),
            },
            Segment {
                start: 1.2,
                end: 2.5,
                text: "world".into(),
            },
        ];

        let written = export_segments(&segments, &clips, &outdir, 2.5).expect("export");
        assert_eq!(written, 2);

        let manifest = fs::read_to_string(outdir.join(MANIFEST_NAME)).expect("manifest");
        let lines: Vec<&str> = manifest.lines().collect();
        assert_eq!(lines.len(), segments.len());
        assert_eq!(
            lines[0],
            format!("{}|hello", outdir.join("chunk-000001.wav").display())
        );
        assert_eq!(
            lines[1],
            format!("{}|world", outdir.join("chunk-000002.wav").display())
        );

        let clip = wav::load_mono(&outdir.join("chunk-000001.wav")).expect("clip 1");
        assert_eq!(clip.sample_rate, 22_050);
        let expected = ((1.2f64 * 22_050.0) as i64 - clip.samples.len() as i64).abs();
        assert!(expected <= 22, "clip length off by {expected} samples");

        fs::remove_dir_all(&outdir).ok();
    }

    #[test]
    fn export_truncates_a_stale_manifest() {
        let outdir = temp_outdir("truncate");
        fs::create_dir(&outdir).expect("create outdir");
        fs::write(outdir.join(MANIFEST_NAME), "stale/clip.wav|old text\n").expect("seed");
        let clips = tone(1.0, 22_050);
        let segments = vec![Segment {
            start: 0.0,
            end: 1.0,
            text: "fresh".into(),
        }];

        export_segments(&segments, &clips, &outdir, 1.0).expect("export");
        let manifest = fs::read_to_string(outdir.join(MANIFEST_NAME)).expect("manifest");
        assert!(!manifest.contains("stale"));
        assert_eq!(manifest.lines().count(), 1);

        fs::remove_dir_all(&outdir).ok();
    }

    #[test]
    fn export_handles_empty_segment_list() {
        let outdir = temp_outdir("empty");
        fs::create_dir(&outdir).expect("create outdir");
        let clips = tone(1.0, 22_050);

        let written = export_segments(&[], &clips, &outdir, 1.0).expect("export");
        assert_eq!(written, 0);
        let manifest = fs::read_to_string(outdir.join(MANIFEST_NAME)).expect("manifest");
        assert!(manifest.is_empty());

        fs::remove_dir_all(&outdir).ok();
    }

    #[test]
    fn ensure_outdir_accepts_existing_directory() {
        let outdir = temp_outdir("exists");
        fs::create_dir(&outdir).expect("create outdir");
        ensure_outdir(&outdir).expect("existing dir is fine");
        fs::remove_dir_all(&outdir).ok();
    }

    #[test]
    fn ensure_outdir_rejects_missing_parent() {
        let outdir = temp_outdir("no_parent").join("child");
        assert!(ensure_outdir(&outdir).is_err());
    }
}
