use super::chunker::{ChunkAssembler, ChunkerConfig, SILENCE_CLOSE_MS};
use super::resample::{basic_resample, downsampling_tap_count, resample_linear};
use super::wav::{load_mono, save_mono, WavAudio};
use super::TARGET_RATE;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

const FRAME: usize = 512; // 32ms at 16 kHz
const FRAME_MS: u64 = 32;
const THRESHOLD_DB: f32 = -30.0;

fn speech_frame() -> Vec<f32> {
    vec![0.5; FRAME]
}

fn silence_frame() -> Vec<f32> {
    vec![0.0; FRAME]
}

fn assembler(max_chunk_ms: u64) -> ChunkAssembler {
    ChunkAssembler::new(ChunkerConfig::new(TARGET_RATE, THRESHOLD_DB, max_chunk_ms))
}

fn temp_wav(name: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "voxscribe_test_{}_{n}_{name}.wav",
        std::process::id()
    ))
}

#[test]
fn chunker_drops_pure_silence() {
    let mut chunker = assembler(2_000);
    for _ in 0..100 {
        assert!(chunker.push_frame(&silence_frame()).is_none());
    }
    assert!(chunker.flush().is_none());
}

#[test]
fn chunker_emits_at_record_timeout() {
    let max_ms = 2_000;
    let mut chunker = assembler(max_ms);
    let mut emitted = None;
    for i in 0..200 {
        if let Some(chunk) = chunker.push_frame(&speech_frame()) {
            emitted = Some((i, chunk));
            break;
        }
    }
    let (frames, chunk) = emitted.expect("continuous speech must flush a chunk");
    let chunk_ms = (chunk.len() as u64 * 1000) / u64::from(TARGET_RATE);
    assert!(chunk_ms >= max_ms, "flushed after only {chunk_ms}ms");
    assert!(chunk_ms < max_ms + 2 * FRAME_MS);
    assert!(u64::from(frames as u32) * FRAME_MS <= max_ms + FRAME_MS);
}

#[test]
fn chunker_closes_on_trailing_silence() {
    let mut chunker = assembler(60_000);
    for _ in 0..10 {
        assert!(chunker.push_frame(&speech_frame()).is_none());
    }
    let mut emitted = None;
    for i in 0..100 {
        if let Some(chunk) = chunker.push_frame(&silence_frame()) {
            emitted = Some((i, chunk));
            break;
        }
    }
    let (silent_frames, chunk) = emitted.expect("trailing silence must close the utterance");
    let silence_ms = (silent_frames as u64 + 1) * FRAME_MS;
    assert!(silence_ms >= SILENCE_CLOSE_MS);
    // chunk holds the speech plus the silence tail that closed it
    assert!(chunk.len() >= 10 * FRAME);
}

#[test]
fn chunker_skips_leading_silence() {
    let mut chunker = assembler(60_000);
    for _ in 0..50 {
        assert!(chunker.push_frame(&silence_frame()).is_none());
    }
    assert!(chunker.push_frame(&speech_frame()).is_none());
    let chunk = chunker.flush().expect("buffered speech must flush");
    assert_eq!(chunk.len(), FRAME);
}

#[test]
fn chunker_resets_after_emitting() {
    let mut chunker = assembler(60_000);
    chunker.push_frame(&speech_frame());
    let first = chunker.flush().expect("first chunk");
    assert_eq!(first.len(), FRAME);
    assert!(chunker.flush().is_none());
    for _ in 0..3 {
        chunker.push_frame(&speech_frame());
    }
    let second = chunker.flush().expect("second chunk");
    assert_eq!(second.len(), 3 * FRAME);
}

#[test]
fn resample_identity_at_equal_rates() {
    let input = vec![0.1, 0.2, 0.3, 0.4];
    assert_eq!(basic_resample(&input, 16_000, 16_000), input);
}

#[test]
fn resample_halves_length_when_downsampling() {
    let input = vec![0.25; 3_200];
    let output = basic_resample(&input, 32_000, 16_000);
    let expected = input.len() / 2;
    assert!((output.len() as i64 - expected as i64).abs() <= 2);
}

#[test]
fn resample_grows_length_when_upsampling() {
    let input = vec![0.25; 1_600];
    let output = basic_resample(&input, 16_000, 22_050);
    let expected = (input.len() as f64 * 22_050.0 / 16_000.0).round() as i64;
    assert!((output.len() as i64 - expected).abs() <= 2);
}

#[test]
fn resample_linear_preserves_constant_signals() {
    let input = vec![0.5; 1_000];
    let output = resample_linear(&input, 0.5);
    assert!(output.iter().all(|s| (s - 0.5).abs() < 1e-6));
}

#[test]
fn tap_count_is_odd_and_bounded() {
    for from in [22_050u32, 44_100, 48_000, 96_000] {
        let taps = downsampling_tap_count(from, 16_000);
        assert_eq!(taps % 2, 1, "{from}");
        assert!(taps <= 129);
    }
}

#[test]
fn wav_round_trip_preserves_samples() {
    let path = temp_wav("round_trip");
    let original: Vec<f32> = (0..4_410).map(|i| ((i % 100) as f32 - 50.0) / 64.0).collect();
    save_mono(&path, &original, 22_050).expect("save");
    let loaded = load_mono(&path).expect("load");
    std::fs::remove_file(&path).ok();
    assert_eq!(loaded.sample_rate, 22_050);
    assert_eq!(loaded.samples.len(), original.len());
    for (a, b) in loaded.samples.iter().zip(&original) {
        assert!((a - b).abs() < 1.0 / 16_384.0, "{a} vs {b}");
    }
}

#[test]
fn wav_load_rejects_missing_file() {
    assert!(load_mono(&PathBuf::from("/no/such/file.wav")).is_err());
}

#[test]
fn slice_ms_respects_bounds() {
    let audio = WavAudio {
        samples: (0..22_050).map(|i| i as f32).collect(),
        sample_rate: 22_050,
    };
    assert_eq!(audio.slice_ms(0, 1_000).len(), 22_050);
    assert_eq!(audio.slice_ms(0, 500).len(), 11_025);
    assert_eq!(audio.slice_ms(900, 2_000).len(), 22_050 - 19_845);
    assert!(audio.slice_ms(500, 500).is_empty());
    assert!(audio.slice_ms(2_000, 3_000).is_empty());
}

#[test]
fn duration_handles_zero_rate() {
    let audio = WavAudio {
        samples: vec![0.0; 10],
        sample_rate: 0,
    };
    assert_eq!(audio.duration_seconds(), 0.0);
}
