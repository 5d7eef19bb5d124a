//! System microphone capture via CPAL.
//!
//! The stream callback downmixes to mono and cuts fixed device-rate frames;
//! a producer thread normalizes them to 16 kHz, runs the energy gate, and
//! publishes finished chunks on a bounded channel. The consumer side does a
//! timed receive instead of polling.

use super::chunker::{ChunkAssembler, ChunkerConfig};
use super::meter::rms_db;
use super::resample::{convert_frame_to_target, resample};
use super::TARGET_RATE;
use crate::log_debug;
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Frame length cut by the stream callback.
const FRAME_MS: u64 = 32;

/// Max device-rate frames queued between the callback and the producer.
const FRAME_CHANNEL_CAPACITY: usize = 64;

/// Max finished chunks queued for the consumer loop.
const CHUNK_CHANNEL_CAPACITY: usize = 32;

/// One gated span of 16 kHz mono audio plus its arrival time.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub samples: Vec<f32>,
    pub received_at: Instant,
}

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Energy gate in dBFS; frames below it count as silence.
    pub threshold_db: f32,
    /// Upper bound on a single chunk's audio span.
    pub record_timeout: Duration,
}

/// Audio input device wrapper.
pub struct Listener {
    device: cpal::Device,
}

impl Listener {
    /// List microphone names so the CLI can expose a human-friendly selector.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Create a listener, optionally forcing a specific device so users can
    /// pick the right microphone when a machine exposes multiple inputs.
    pub fn new(preferred_device: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();
        let device = match preferred_device {
            Some(name) => {
                let mut devices = host.input_devices().context("no input devices available")?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| anyhow!("input device '{name}' not found"))?
            }
            None => host
                .default_input_device()
                .context("no default input device available")?,
        };
        Ok(Self { device })
    }

    /// Name of the active recording device.
    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string())
    }

    /// Sample the room for `duration` and return the ambient floor in dBFS.
    /// Used to lift the energy gate above background noise before capture.
    pub fn measure_ambient(&self, duration: Duration) -> Result<f32> {
        let default_config = self.device.default_input_config()?;
        let format = default_config.sample_format();
        let device_config: StreamConfig = default_config.clone().into();
        let device_sample_rate = device_config.sample_rate.0;
        let channels = usize::from(device_config.channels.max(1));

        let expected =
            (duration.as_secs_f64() * device_sample_rate as f64).ceil() as usize;
        let buffer = Arc::new(Mutex::new(Vec::<f32>::with_capacity(expected)));
        let buffer_clone = buffer.clone();

        let err_fn = |err| log_debug(&format!("audio_stream_error: {err}"));
        let stream = match format {
            SampleFormat::F32 => self.device.build_input_stream(
                &device_config,
                move |data: &[f32], _| {
                    if let Ok(mut buf) = buffer_clone.lock() {
                        append_downmixed_samples(&mut buf, data, channels, |sample| sample);
                    }
                },
                err_fn,
                None,
            )?,
            SampleFormat::I16 => self.device.build_input_stream(
                &device_config,
                move |data: &[i16], _| {
                    if let Ok(mut buf) = buffer_clone.lock() {
                        append_downmixed_samples(&mut buf, data, channels, |sample| {
                            sample as f32 / 32_768.0_f32
                        });
                    }
                },
                err_fn,
                None,
            )?,
            SampleFormat::U16 => self.device.build_input_stream(
                &device_config,
                move |data: &[u16], _| {
                    if let Ok(mut buf) = buffer_clone.lock() {
                        append_downmixed_samples(&mut buf, data, channels, |sample| {
                            (sample as f32 - 32_768.0_f32) / 32_768.0_f32
                        });
                    }
                },
                err_fn,
                None,
            )?,
            other => return Err(anyhow!("unsupported sample format: {other:?}")),
        };

        stream.play()?;
        std::thread::sleep(duration);
        if let Err(err) = stream.pause() {
            log_debug(&format!("failed to pause audio stream: {err}"));
        }
        drop(stream);

        let samples = buffer
            .lock()
            .map_err(|_| anyhow!("audio buffer lock poisoned"))?;
        if samples.is_empty() {
            return Err(anyhow!(
                "no samples captured from '{}'; check microphone permissions and availability. {}",
                self.device_name(),
                mic_permission_hint()
            ));
        }
        let normalized = resample(&samples, device_sample_rate, TARGET_RATE);
        Ok(rms_db(&normalized))
    }

    /// Start background capture. Returns the handle keeping the stream and
    /// producer thread alive plus the chunk receiver for the consumer loop.
    pub fn start(
        &self,
        cfg: ListenerConfig,
        stop: Arc<AtomicBool>,
    ) -> Result<(BackgroundCapture, Receiver<Chunk>)> {
        let default_config = self.device.default_input_config()?;
        let format = default_config.sample_format();
        let device_config: StreamConfig = default_config.clone().into();
        let device_sample_rate = device_config.sample_rate.0;
        let channels = usize::from(device_config.channels.max(1));
        let device_frame_samples =
            ((u64::from(device_sample_rate) * FRAME_MS) / 1000).max(1) as usize;
        let target_frame_samples = ((u64::from(TARGET_RATE) * FRAME_MS) / 1000).max(1) as usize;

        log_debug(&format!(
            "Listener config: format={format:?} sample_rate={device_sample_rate}Hz channels={channels}"
        ));

        let (frame_tx, frame_rx) = bounded::<Vec<f32>>(FRAME_CHANNEL_CAPACITY);
        let (chunk_tx, chunk_rx) = bounded::<Chunk>(CHUNK_CHANNEL_CAPACITY);
        let dropped = Arc::new(AtomicUsize::new(0));
        let pump = Arc::new(Mutex::new(FramePump::new(
            device_frame_samples,
            frame_tx,
            dropped.clone(),
        )));

        let err_fn = |err| log_debug(&format!("audio_stream_error: {err}"));
        let stream = match format {
            SampleFormat::F32 => {
                let pump = pump.clone();
                let dropped = dropped.clone();
                self.device.build_input_stream(
                    &device_config,
                    move |data: &[f32], _| {
                        if let Ok(mut pump) = pump.try_lock() {
                            pump.push(data, channels, |sample| sample);
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            SampleFormat::I16 => {
                let pump = pump.clone();
                let dropped = dropped.clone();
                self.device.build_input_stream(
                    &device_config,
                    move |data: &[i16], _| {
                        if let Ok(mut pump) = pump.try_lock() {
                            pump.push(data, channels, |sample| sample as f32 / 32_768.0);
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            SampleFormat::U16 => {
                let pump = pump.clone();
                let dropped = dropped.clone();
                self.device.build_input_stream(
                    &device_config,
                    move |data: &[u16], _| {
                        if let Ok(mut pump) = pump.try_lock() {
                            pump.push(data, channels, |sample| {
                                (sample as f32 - 32_768.0) / 32_768.0
                            });
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            other => return Err(anyhow!("unsupported sample format: {other:?}")),
        };

        stream.play()?;

        let chunker_cfg = ChunkerConfig::new(
            TARGET_RATE,
            cfg.threshold_db,
            cfg.record_timeout.as_millis().max(1) as u64,
        );
        let producer_stop = stop.clone();
        let producer_dropped = dropped.clone();
        let producer = std::thread::Builder::new()
            .name("chunk-producer".into())
            .spawn(move || {
                run_producer(
                    frame_rx,
                    chunk_tx,
                    chunker_cfg,
                    device_sample_rate,
                    target_frame_samples,
                    producer_stop,
                    producer_dropped,
                );
            })
            .context("failed to spawn chunk producer thread")?;

        Ok((
            BackgroundCapture {
                _stream: stream,
                producer: Some(producer),
                dropped,
            },
            chunk_rx,
        ))
    }
}

/// Keeps the CPAL stream and producer thread alive for the session.
pub struct BackgroundCapture {
    _stream: cpal::Stream,
    producer: Option<JoinHandle<()>>,
    dropped: Arc<AtomicUsize>,
}

impl BackgroundCapture {
    /// Frames or chunks discarded because a queue was full.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Tear down the stream and wait for the producer to drain.
    pub fn shutdown(mut self) {
        if let Err(err) = self._stream.pause() {
            log_debug(&format!("failed to pause audio stream: {err}"));
        }
        drop(self._stream);
        if let Some(handle) = self.producer.take() {
            let _ = handle.join();
        }
    }
}

fn run_producer(
    frames: Receiver<Vec<f32>>,
    chunks: Sender<Chunk>,
    chunker_cfg: ChunkerConfig,
    device_sample_rate: u32,
    target_frame_samples: usize,
    stop: Arc<AtomicBool>,
    dropped: Arc<AtomicUsize>,
) {
    let mut assembler = ChunkAssembler::new(chunker_cfg);
    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        match frames.recv_timeout(Duration::from_millis(100)) {
            Ok(frame) => {
                let frame = convert_frame_to_target(
                    frame,
                    device_sample_rate,
                    TARGET_RATE,
                    target_frame_samples,
                );
                if frame.is_empty() {
                    continue;
                }
                if let Some(samples) = assembler.push_frame(&frame) {
                    deliver(&chunks, samples, &dropped);
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    if let Some(samples) = assembler.flush() {
        deliver(&chunks, samples, &dropped);
    }
}

fn deliver(chunks: &Sender<Chunk>, samples: Vec<f32>, dropped: &Arc<AtomicUsize>) {
    let chunk = Chunk {
        samples,
        received_at: Instant::now(),
    };
    if let Err(TrySendError::Full(_)) = chunks.try_send(chunk) {
        dropped.fetch_add(1, Ordering::Relaxed);
    }
}

fn mic_permission_hint() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "macOS: System Settings > Privacy & Security > Microphone (enable your terminal)."
    }
    #[cfg(target_os = "linux")]
    {
        "Linux: check PipeWire/PulseAudio permissions and ensure the device is not muted."
    }
    #[cfg(target_os = "windows")]
    {
        "Windows: Settings > Privacy & Security > Microphone (allow access for your terminal)."
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        "Check OS microphone permissions."
    }
}

/// Downmix multi-channel input to mono while applying the provided converter
/// so downstream code sees a single channel regardless of the mic layout.
pub(super) fn append_downmixed_samples<T, F>(
    buf: &mut Vec<f32>,
    data: &[T],
    channels: usize,
    mut convert: F,
) where
    T: Copy,
    F: FnMut(T) -> f32,
{
    if channels <= 1 {
        buf.extend(data.iter().copied().map(&mut convert));
        return;
    }

    // Average each interleaved frame to produce a mono representation.
    let mut acc = 0.0f32;
    let mut count = 0usize;
    for sample in data.iter().copied() {
        acc += convert(sample);
        count += 1;
        if count == channels {
            buf.push(acc / channels as f32);
            acc = 0.0;
            count = 0;
        }
    }
    if count > 0 {
        buf.push(acc / count as f32);
    }
}

pub(super) struct FramePump {
    frame_samples: usize,
    pending: Vec<f32>,
    scratch: Vec<f32>,
    sender: Sender<Vec<f32>>,
    dropped: Arc<AtomicUsize>,
}

impl FramePump {
    pub(super) fn new(
        frame_samples: usize,
        sender: Sender<Vec<f32>>,
        dropped: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            frame_samples: frame_samples.max(1),
            pending: Vec::with_capacity(frame_samples),
            scratch: Vec::new(),
            sender,
            dropped,
        }
    }

    pub(super) fn push<T, F>(&mut self, data: &[T], channels: usize, convert: F)
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        self.scratch.clear();
        append_downmixed_samples(&mut self.scratch, data, channels, convert);
        self.pending.extend_from_slice(&self.scratch);

        while self.pending.len() >= self.frame_samples {
            let frame: Vec<f32> = self.pending.drain(..self.frame_samples).collect();
            if let Err(err) = self.sender.try_send(frame) {
                match err {
                    TrySendError::Full(_) => {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    TrySendError::Disconnected(_) => break,
                }
            }
        }
    }
}
