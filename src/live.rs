//! Real-time capture-and-transcribe session.
//!
//! A background producer pushes speech chunks over a bounded channel; this
//! loop drains it, grows the phrase buffer, re-transcribes it, and redraws
//! the terminal plus the output file on every update. SIGINT ends the
//! session with one final rewrite.

use crate::audio::{
    calibrated_threshold_db, threshold_db_from_energy, Listener, ListenerConfig,
};
use crate::config::{resolve_model_path, LiveConfig};
use crate::stt::Transcriber;
use crate::transcript::{rewrite_output_file, PhraseState, PhraseTracker, Transcript};
use crate::log_debug;
use anyhow::{bail, Result};
use chrono::Local;
use crossbeam_channel::RecvTimeoutError;
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long to wait on the chunk channel before re-checking the stop flag.
const POLL_TIMEOUT_MS: u64 = 100;

/// Ambient noise sampling window before capture starts.
const AMBIENT_SAMPLE_MS: u64 = 1_000;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn handle_sigint(_: libc::c_int) {
    INTERRUPTED.store(true, Ordering::Relaxed);
}

#[cfg(unix)]
fn install_sigint_handler() {
    // SAFETY: the handler only stores into an atomic, which is async-signal-safe.
    unsafe {
        libc::signal(
            libc::SIGINT,
            handle_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t,
        );
    }
}

#[cfg(not(unix))]
fn install_sigint_handler() {}

fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::Relaxed)
}

/// Run the live transcription session until interrupted.
pub fn run(config: &LiveConfig) -> Result<()> {
    let listener = Listener::new(config.preferred_device())?;
    log_debug(&format!("capturing from '{}'", listener.device_name()));

    let model_path = resolve_model_path(
        config.model,
        config.non_english,
        config.opts.model_path.as_ref(),
    )?;
    let transcriber = Transcriber::new(&model_path)?;

    // Sample the room so the energy gate sits above background noise,
    // mirroring the recognizer's ambient-noise adjustment.
    let ambient_db = listener.measure_ambient(Duration::from_millis(AMBIENT_SAMPLE_MS))?;
    let threshold_db = calibrated_threshold_db(
        threshold_db_from_energy(config.energy_threshold),
        ambient_db,
    );
    log_debug(&format!(
        "energy gate: cli={} ambient={ambient_db:.1}dB effective={threshold_db:.1}dB",
        config.energy_threshold
    ));

    let stop = Arc::new(AtomicBool::new(false));
    let (capture, chunks) = listener.start(
        ListenerConfig {
            threshold_db,
            record_timeout: Duration::from_secs_f64(config.record_timeout),
        },
        stop.clone(),
    )?;
    install_sigint_handler();

    let mut stdout = io::stdout();
    execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
    println!("{}: Model loaded. OK", Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("Output file: {}", config.output_file.display());
    stdout.flush()?;

    let mut tracker = PhraseTracker::new(Duration::from_secs_f64(config.phrase_timeout));
    let mut phrase_buffer: Vec<f32> = Vec::new();
    let mut transcript = Transcript::new();

    while !interrupted() {
        let first = match chunks.recv_timeout(Duration::from_millis(POLL_TIMEOUT_MS)) {
            Ok(chunk) => chunk,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                if interrupted() {
                    break;
                }
                bail!("audio capture stopped unexpectedly");
            }
        };

        let state = tracker.observe(Instant::now());
        if state == PhraseState::BoundaryCrossed {
            // The previous cycle's buffer was a completed phrase; start over.
            phrase_buffer.clear();
        }
        phrase_buffer.extend_from_slice(&first.samples);
        // Drain everything else already queued into the same phrase.
        while let Ok(chunk) = chunks.try_recv() {
            phrase_buffer.extend_from_slice(&chunk.samples);
        }

        let inference_start = Instant::now();
        let text = transcriber.transcribe(&phrase_buffer, &config.opts)?;
        let inference = inference_start.elapsed();

        transcript.update(state, text);
        redraw(&mut stdout, &transcript, state, inference)?;
        rewrite_output_file(&config.output_file, transcript.lines())?;
    }

    stop.store(true, Ordering::Relaxed);
    if capture.dropped() > 0 {
        log_debug(&format!("capture dropped {} frames", capture.dropped()));
    }
    capture.shutdown();
    rewrite_output_file(&config.output_file, transcript.lines())?;
    println!(
        " *** {}: transcription end",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    Ok(())
}

fn redraw(
    stdout: &mut io::Stdout,
    transcript: &Transcript,
    state: PhraseState,
    inference: Duration,
) -> Result<()> {
    execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
    println!(
        " *** {}: phrase_complete {} lines {} infer_time {:.3}s",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        state == PhraseState::BoundaryCrossed,
        transcript.len(),
        inference.as_secs_f64()
    );
    for line in transcript.lines() {
        println!("{line}");
    }
    stdout.flush()?;
    Ok(())
}
