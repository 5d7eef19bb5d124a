//! Batch WAV-file transcription entrypoint.

use anyhow::Result;
use voxscribe::config::BatchConfig;
use voxscribe::{batch, init_logging, init_tracing};

fn main() -> Result<()> {
    let config = BatchConfig::parse_args()?;
    init_logging(config.opts.logging_enabled());
    init_tracing(config.opts.logging_enabled());
    batch::run(&config)
}
