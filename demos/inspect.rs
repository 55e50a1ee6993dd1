//! Print a summary of a Smooth Streaming manifest.
//!
//! ```text
//! MSS_ENCODING=utf16le cargo run --example inspect -- \
//!     http://playready.directtaps.net/smoothstreaming/SSWSS720H264/SuperSpeedway_720.ism/Manifest
//! cargo run --example inspect -- ./Manifest.xml --json
//! ```

use mss_parser::config::Config;
use mss_parser::fetch::fetch_manifest;
use mss_parser::{Manifest, ManifestAccumulator, MssError, StreamType};
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Read buffer size when streaming a manifest from disk
const FILE_CHUNK_SIZE: usize = 8 * 1024;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(source) = args.next() else {
        error!("usage: inspect <manifest-url|manifest-file> [--json]");
        std::process::exit(2);
    };
    let as_json = args.any(|arg| arg == "--json");

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    info!("Reading {} as {}", source, config.encoding);

    let result = if source.starts_with("http://") || source.starts_with("https://") {
        fetch_manifest(&reqwest::Client::new(), &source, &config.fetch, config.encoding).await
    } else {
        read_manifest_file(&source, &config).await
    };

    let manifest = match result {
        Ok(manifest) => manifest,
        Err(e) => {
            error!("Failed to parse manifest: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = print_manifest(&manifest, as_json) {
        error!("Failed to write output: {}", e);
        std::process::exit(1);
    }
}

async fn read_manifest_file(path: &str, config: &Config) -> Result<Arc<Manifest>, MssError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| MssError::Fetch(format!("{}: {}", path, e)))?;

    let mut accumulator = ManifestAccumulator::new(config.encoding);
    let mut buf = vec![0u8; FILE_CHUNK_SIZE];
    loop {
        let read = file
            .read(&mut buf)
            .await
            .map_err(|e| MssError::Fetch(format!("{}: {}", path, e)))?;
        if read == 0 {
            break;
        }
        accumulator.write(&buf[..read])?;
    }
    accumulator.end()
}

fn print_manifest(manifest: &Manifest, as_json: bool) -> io::Result<()> {
    let mut out = io::stdout().lock();

    if as_json {
        serde_json::to_writer_pretty(&mut out, manifest)?;
        return writeln!(out);
    }

    let header = manifest.header();
    writeln!(
        out,
        "Microsoft Smooth Streaming {}, live={}",
        header.version.as_deref().unwrap_or("?"),
        header.is_live
    )?;

    for stream in manifest.streams() {
        let kind = stream
            .stream_type
            .as_ref()
            .map(|t| t.as_str().to_uppercase())
            .unwrap_or_else(|| "UNKNOWN".to_string());
        writeln!(out, "{}:", kind)?;
        writeln!(out, "   url: {}", stream.url.as_deref().unwrap_or("-"))?;

        for level in &stream.quality_levels {
            let index = level.index.as_deref().unwrap_or("?");
            let bitrate = display_opt(level.bitrate);
            let codec = level.codec.as_deref().unwrap_or("unknown");
            match stream.stream_type {
                Some(StreamType::Video) => writeln!(
                    out,
                    "   - [{}]/{} {}:{} ({})",
                    index,
                    bitrate,
                    display_opt(level.max_width),
                    display_opt(level.max_height),
                    codec
                )?,
                Some(StreamType::Audio) => writeln!(
                    out,
                    "   - [{}]/{} {}ch, {}bit {}Hz ({})",
                    index,
                    bitrate,
                    display_opt(level.channels),
                    display_opt(level.bits_per_sample),
                    display_opt(level.sampling_rate),
                    codec
                )?,
                _ => writeln!(out, "   - [{}]/{} ({})", index, bitrate, codec)?,
            }
        }
    }
    Ok(())
}

fn display_opt(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
