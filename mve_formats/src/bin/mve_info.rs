use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mve_formats::MveDecoder;
use serde::Serialize;

#[derive(Parser)]
#[command(about = "Inspect an Interplay MVE container", version)]
struct Args {
    /// Path to an .mve file to inspect.
    input: PathBuf,

    /// Emit the summary as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Summary {
    width: usize,
    height: usize,
    frames: u32,
    frames_per_second: Option<f64>,
    audio_sample_rate: Option<u32>,
    audio_bytes: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let file =
        File::open(&args.input).with_context(|| format!("opening {}", args.input.display()))?;
    let mut decoder = MveDecoder::load(BufReader::new(file))
        .with_context(|| format!("loading {}", args.input.display()))?;

    let audio = decoder.audio_stream();
    let mut frames = 0u32;
    while decoder.advance_frame()? {
        frames += 1;
    }

    let mut audio_bytes = 0usize;
    if let Some(stream) = &audio {
        while let Some(buffer) = stream.try_next() {
            audio_bytes += buffer.len();
        }
    }

    let (width, height) = decoder.dimensions().unwrap_or((0, 0));
    let summary = Summary {
        width,
        height,
        frames,
        frames_per_second: decoder.frame_rate().map(|rate| rate.frames_per_second()),
        audio_sample_rate: audio.as_ref().map(|stream| stream.sample_rate()),
        audio_bytes,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "MVE {}: {} frames, {}x{}",
        args.input.display(),
        summary.frames,
        summary.width,
        summary.height
    );
    match summary.frames_per_second {
        Some(fps) => println!("Timing: {fps:.3} frames/s"),
        None => println!("Timing: no timer opcode seen"),
    }
    match summary.audio_sample_rate {
        Some(rate) => println!(
            "Audio: {rate} Hz, unsigned 8-bit mono, {} bytes queued",
            summary.audio_bytes
        ),
        None => println!("Audio: not present"),
    }
    Ok(())
}
