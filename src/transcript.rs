//! Transcript state for the live session.
//!
//! A phrase is one contiguous span of speech; while it accumulates, each new
//! transcription refines the last line in place. Once the gap between chunk
//! arrivals exceeds the phrase timeout, the line is sealed and the next text
//! starts a fresh one.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

/// Whether the current cycle continues the active phrase or starts a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseState {
    /// More audio arrived within the timeout; the last line is still open.
    Accumulating,
    /// The silence gap exceeded the timeout; the previous phrase is sealed.
    BoundaryCrossed,
}

/// Tracks chunk-arrival gaps against the phrase timeout.
#[derive(Debug)]
pub struct PhraseTracker {
    timeout: Duration,
    last_chunk_at: Option<Instant>,
}

impl PhraseTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_chunk_at: None,
        }
    }

    /// Record a chunk arrival and classify it. The first arrival always
    /// accumulates; later ones cross a boundary when the gap since the
    /// previous arrival exceeds the timeout.
    pub fn observe(&mut self, now: Instant) -> PhraseState {
        let state = match self.last_chunk_at {
            Some(prev) if now.duration_since(prev) > self.timeout => PhraseState::BoundaryCrossed,
            _ => PhraseState::Accumulating,
        };
        self.last_chunk_at = Some(now);
        state
    }
}

/// Ordered transcript lines. The line count never decreases.
#[derive(Debug)]
pub struct Transcript {
    lines: Vec<String>,
}

impl Transcript {
    /// Starts with one empty line so the first phrase has a slot to refine.
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Apply one cycle's text: boundary crossed appends a new line,
    /// otherwise the last line is replaced in place.
    pub fn update(&mut self, state: PhraseState, text: String) {
        match state {
            PhraseState::BoundaryCrossed => self.lines.push(text),
            PhraseState::Accumulating => match self.lines.last_mut() {
                Some(last) => *last = text,
                None => self.lines.push(text),
            },
        }
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

/// Rewrite the output file in full: a timestamp header with the line count,
/// blank-line framing, then every transcript line. Truncates first, so the
/// file always reflects exactly the current transcript.
pub fn rewrite_output_file(path: &Path, lines: &[String]) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("failed to open output file {}", path.display()))?;
    writeln!(
        file,
        " *** {}: lines {}",
        Local::now().format("%Y-%m-%d %H:%M:%S%.6f"),
        lines.len()
    )?;
    writeln!(file)?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    writeln!(file)?;
    file.flush().context("failed to flush output file")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn temp_path(name: &str) -> std::path::PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "voxscribe_transcript_{}_{n}_{name}.txt",
            std::process::id()
        ))
    }

    #[test]
    fn first_chunk_accumulates() {
        let mut tracker = PhraseTracker::new(Duration::from_secs(3));
        assert_eq!(tracker.observe(Instant::now()), PhraseState::Accumulating);
    }

    #[test]
    fn gap_over_timeout_crosses_boundary() {
        let mut tracker = PhraseTracker::new(Duration::from_secs(3));
        let start = Instant::now();
        tracker.observe(start);
        assert_eq!(
            tracker.observe(start + Duration::from_secs(4)),
            PhraseState::BoundaryCrossed
        );
    }

    #[test]
    fn gap_within_timeout_keeps_accumulating() {
        let mut tracker = PhraseTracker::new(Duration::from_secs(3));
        let start = Instant::now();
        tracker.observe(start);
        assert_eq!(
            tracker.observe(start + Duration::from_secs(2)),
            PhraseState::Accumulating
        );
        // The boundary clock restarts from each arrival, not the first one.
        assert_eq!(
            tracker.observe(start + Duration::from_secs(4)),
            PhraseState::Accumulating
        );
    }

    #[test]
    fn accumulating_replaces_last_line() {
        let mut transcript = Transcript::new();
        transcript.update(PhraseState::Accumulating, "hello".into());
        transcript.update(PhraseState::Accumulating, "hello world".into());
        assert_eq!(transcript.lines(), ["hello world"]);
    }

    #[test]
    fn boundary_appends_a_new_line() {
        let mut transcript = Transcript::new();
        transcript.update(PhraseState::Accumulating, "hello".into());
        transcript.update(PhraseState::BoundaryCrossed, "world".into());
        assert_eq!(transcript.lines(), ["hello", "world"]);
    }

    #[test]
    fn line_count_never_decreases() {
        let mut transcript = Transcript::new();
        let updates = [
            (PhraseState::Accumulating, "a"),
            (PhraseState::BoundaryCrossed, "b"),
            (PhraseState::Accumulating, "b refined"),
            (PhraseState::Accumulating, ""),
            (PhraseState::BoundaryCrossed, "c"),
        ];
        let mut prev_len = transcript.len();
        for (state, text) in updates {
            transcript.update(state, text.to_string());
            assert!(transcript.len() >= prev_len);
            prev_len = transcript.len();
        }
        assert_eq!(transcript.len(), 3);
    }

    #[test]
    fn rewrite_emits_header_and_framed_lines() {
        let path = temp_path("framed");
        let lines = vec!["hello".to_string(), "world".to_string()];
        rewrite_output_file(&path, &lines).expect("rewrite");
        let content = fs::read_to_string(&path).expect("read back");
        fs::remove_file(&path).ok();
        let got: Vec<&str> = content.lines().collect();
        assert!(got[0].starts_with(" *** "));
        assert!(got[0].ends_with("lines 2"));
        assert_eq!(&got[1..], ["", "hello", "world", ""]);
    }

    #[test]
    fn rewrite_is_idempotent_modulo_header() {
        let path_a = temp_path("idem_a");
        let path_b = temp_path("idem_b");
        let lines = vec!["one".to_string(), "two".to_string()];
        rewrite_output_file(&path_a, &lines).expect("first write");
        rewrite_output_file(&path_b, &lines).expect("second write");
        let a = fs::read_to_string(&path_a).expect("read a");
        let b = fs::read_to_string(&path_b).expect("read b");
        fs::remove_file(&path_a).ok();
        fs::remove_file(&path_b).ok();
        let tail = |s: &str| s.lines().skip(1).collect::<Vec<_>>().join("\n");
        assert_eq!(tail(&a), tail(&b));
    }

    #[test]
    fn rewrite_truncates_previous_content() {
        let path = temp_path("truncate");
        rewrite_output_file(&path, &vec!["a long first line".to_string()]).expect("first");
        rewrite_output_file(&path, &vec!["x".to_string()]).expect("second");
        let content = fs::read_to_string(&path).expect("read back");
        fs::remove_file(&path).ok();
        assert!(!content.contains("a long first line"));
        assert!(content.contains("\nx\n"));
    }
}
