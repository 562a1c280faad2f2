// src/main.rs
// Command-line front end for NDT Reader

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, warn};
use ndt_reader::{
    decode_civa_scan, decode_lecroy, decode_saft, decode_ultravision, ChannelSet, LabeledArray,
    LecroyCapture, ScanKind,
};

#[derive(Parser, Debug)]
#[command(name = "ndt_reader", version, about = "Decode ultrasonic NDE data files")]
struct Cli {
    /// Print the decoded entity as JSON instead of a summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// CIVA text export (cscan, true_cscan, bscan, beam)
    Civa {
        kind: ScanKind,
        file: PathBuf,
    },
    /// LeCroy binary waveform (.trc)
    Lecroy { file: PathBuf },
    /// SAFT binary volume
    Saft { file: PathBuf },
    /// Ultravision multi-channel text export
    Ultravision {
        file: PathBuf,
        /// Sampling frequency of the A-scans in Hz
        #[arg(long = "fs", env = "NDT_SAMPLING_FREQUENCY")]
        sampling_frequency: Option<f64>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    debug!("{:?}", cli);

    match cli.command {
        Command::Civa { kind, file } => {
            let text = read_text(&file)?;
            let scan = decode_civa_scan(&text, kind)
                .with_context(|| format!("decoding CIVA {} export '{}'", kind, file.display()))?;
            if cli.json {
                print_json(&scan)?;
            } else {
                println!("CIVA {} export: {}", kind, file.display());
                println!();
                print_array_info(&scan);
            }
        }

        Command::Lecroy { file } => {
            let bytes = read_bytes(&file)?;
            let capture = decode_lecroy(&bytes)
                .with_context(|| format!("decoding LeCroy waveform '{}'", file.display()))?;
            if cli.json {
                print_json(&capture)?;
            } else {
                print_capture_info(&file, &capture);
            }
        }

        Command::Saft { file } => {
            let bytes = read_bytes(&file)?;
            let volume = decode_saft(&bytes)
                .with_context(|| format!("decoding SAFT volume '{}'", file.display()))?;
            if cli.json {
                print_json(&volume)?;
            } else {
                println!("SAFT volume: {}", file.display());
                println!();
                print_array_info(&volume);
            }
        }

        Command::Ultravision {
            file,
            sampling_frequency,
        } => {
            let text = read_text(&file)?;
            let channels = decode_ultravision(&text, sampling_frequency)
                .with_context(|| format!("decoding Ultravision export '{}'", file.display()))?;
            if cli.json {
                print_json(&channels)?;
            } else {
                print_channels_info(&file, &channels);
            }
        }
    }

    Ok(())
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("reading '{}'", path.display()))
}

/// Read a text export, falling back to Latin-1 for files that are not UTF-8.
fn read_text(path: &Path) -> Result<String> {
    let bytes = read_bytes(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            warn!("'{}' is not UTF-8, reading it as Latin-1", path.display());
            Ok(err.into_bytes().iter().map(|&b| b as char).collect())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serializing decoded data")?;
    println!("{}", text);
    Ok(())
}

fn value_range(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let min = values.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    Some((min, max))
}

fn print_array_info(array: &LabeledArray) {
    println!("Dimensions:");
    for axis in array.axes() {
        match (axis.first(), axis.last()) {
            (Some(first), Some(last)) => println!(
                "  {:<3} {:>6} points  {:.6e} .. {:.6e} {}",
                axis.name(),
                axis.len(),
                first,
                last,
                axis.unit()
            ),
            _ => println!("  {:<3} {:>6} points", axis.name(), axis.len()),
        }
    }
    if let Some((min, max)) = value_range(array.data()) {
        println!("  Data range: {:.3} to {:.3}", min, max);
    }

    if !array.attrs().is_empty() {
        println!();
        println!("Attributes:");
        for (key, value) in array.attrs() {
            println!("  {}: {}", key, value);
        }
    }
}

fn print_capture_info(file: &Path, capture: &LecroyCapture) {
    println!("LeCroy Waveform Information");
    println!("===========================");
    println!();
    println!("File: {}", file.display());
    println!();

    println!("Acquisition:");
    for (key, value) in &capture.info {
        println!("  {}: {}", key, value);
    }
    println!();

    // Show statistics for first few segments
    let shown = capture.waveforms.len().min(3);
    println!("Segment Statistics (first {} of {}):", shown, capture.waveforms.len());
    for (i, wave) in capture.waveforms.iter().take(shown).enumerate() {
        let Some((min, max)) = value_range(&wave.vertical) else {
            println!("  Segment {}: empty", i);
            continue;
        };
        let avg = wave.vertical.iter().sum::<f64>() / wave.len() as f64;
        let rms = (wave.vertical.iter().map(|&x| x * x).sum::<f64>() / wave.len() as f64).sqrt();
        println!(
            "  Segment {}: {} samples, min={:.3}{unit}, max={:.3}{unit}, avg={:.3}{unit}, rms={:.3}{unit}",
            i,
            wave.len(),
            min,
            max,
            avg,
            rms,
            unit = wave.vertical_tag.unit
        );
    }
}

fn print_channels_info(file: &Path, channels: &ChannelSet) {
    println!("Ultravision export: {}", file.display());
    println!("Channels: {}", channels.len());
    for (name, scan) in channels.iter() {
        println!();
        println!("[{}]", name);
        print_array_info(scan);
    }
}
