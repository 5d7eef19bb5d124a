//! Real-time microphone transcription entrypoint.

use anyhow::Result;
use voxscribe::audio::Listener;
use voxscribe::config::LiveConfig;
use voxscribe::{init_logging, init_tracing, live};

fn main() -> Result<()> {
    let config = LiveConfig::parse_args()?;
    init_logging(config.opts.logging_enabled());
    init_tracing(config.opts.logging_enabled());

    if config.wants_device_list() {
        print_device_list();
        return Ok(());
    }

    live::run(&config)
}

fn print_device_list() {
    match Listener::list_devices() {
        Ok(names) if names.is_empty() => {
            println!("No audio input devices detected.");
        }
        Ok(names) => {
            println!("Detected audio input devices:");
            for name in names {
                println!("  {name}");
            }
        }
        Err(err) => {
            println!("Failed to list audio input devices: {err}");
        }
    }
}
