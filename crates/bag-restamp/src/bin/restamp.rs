// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! bag-restamp - Restamp bag messages from their header stamps.
//!
//! Usage:
//!   bag-restamp --input capture.jsonl --output restamped.jsonl
//!   bag-restamp --input capture.jsonl --output out.jsonl --invert
//!   bag-restamp --input capture.jsonl --output out.jsonl -u "/camera/.*" -c 0.25 --offset-header

use anyhow::{Context, Result};
use bag_restamp::{BagReader, BagWriter, JsonCodec, RestampConfig, RestampEngine, TimeValue};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "bag-restamp")]
#[command(author = "naskel.com")]
#[command(about = "Restamp bag messages from their header stamps")]
#[command(version)]
struct Args {
    /// Input bag file (.jsonl)
    #[arg(long)]
    input: PathBuf,

    /// Output bag file (.jsonl)
    #[arg(short, long)]
    output: PathBuf,

    /// Configuration file (TOML); command-line flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Apply filter in reverse by setting header stamps to bag message timestamps
    #[arg(short, long)]
    invert: bool,

    /// Topics to restamp with offset, as regex strings
    #[arg(short = 'u', long = "offset-topic", num_args = 1..)]
    offset_topics: Vec<String>,

    /// Constant offset in seconds (float) or nanoseconds (int) applied to offset topics
    #[arg(short = 'c', long, allow_hyphen_values = true)]
    offset: Option<String>,

    /// Apply offset to header if offset is enabled
    #[arg(long)]
    offset_header: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Quiet mode (minimal output)
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();

    let config = build_config(&args)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let mut reader = BagReader::open(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    let metadata = reader.metadata().clone();

    let codec = JsonCodec::from_catalogue(&metadata.topics);
    let mut engine = RestampEngine::from_config(&config, &metadata.topics, codec)
        .context("Invalid restamp configuration")?;

    if !args.quiet {
        info!("Bag Restamp v{}", env!("CARGO_PKG_VERSION"));
        info!("Input: {}", args.input.display());
        info!("Output: {}", args.output.display());
        info!("Topics: {}", metadata.topics.len());
        for topic in engine.policy().topics() {
            info!("  offset topic: {}", topic);
        }
    }

    let mut writer = BagWriter::create(&args.output, &metadata)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    while let Some(record) = reader.read_record()? {
        let emissions = engine
            .process_serialized(&record.topic, &record.data, record.timestamp)
            .with_context(|| {
                format!(
                    "Failed to restamp {} message at {}",
                    record.topic, record.timestamp
                )
            })?;

        for emission in &emissions {
            writer.write_emission(emission)?;
        }
    }

    let written = writer.finalize()?;

    if engine.pending() > 0 {
        warn!(
            "{} deferred message(s) never received a valid timestamp and were discarded",
            engine.pending()
        );
        for topic in engine.pending_topics() {
            warn!("  discarded: {}", topic);
        }
    }

    if !args.quiet {
        let stats = engine.stats();
        info!("Restamp complete");
        info!("  Messages read: {}", stats.records_in);
        info!("  Messages written: {}", stats.emitted);
        info!("  Dropped (invalid stamp): {}", stats.dropped);
        info!("  Deferred: {} ({} flushed)", stats.deferred, stats.flushed);
        info!("  Bag timestamp kept: {}", stats.fallback);
        if let Some(min_valid) = engine.min_valid_time() {
            info!("  Minimum valid stamp: {}", format_time(min_valid));
        }
        for (topic, count) in &written {
            info!("    - {}: {} messages", topic, count);
        }
    }

    Ok(())
}

/// Merge the config file (if any) with command-line flags.
fn build_config(args: &Args) -> Result<RestampConfig> {
    let mut config = match &args.config {
        Some(path) => RestampConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RestampConfig::new(),
    };

    if args.invert {
        config = config.invert(true);
    }
    if !args.offset_topics.is_empty() {
        config.offset_topics = args.offset_topics.clone();
    }
    if let Some(offset) = &args.offset {
        config = config.offset(offset.clone());
    }
    if args.offset_header {
        config = config.offset_header(true);
    }

    Ok(config)
}

fn format_time(t: TimeValue) -> String {
    let (sec, nanosec) = t.to_stamp();
    format!("{}.{:09}s", sec, nanosec)
}
