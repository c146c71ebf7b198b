use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use image::RgbImage;
use mve_formats::MveDecoder;

#[derive(Parser)]
#[command(about = "Export frames and audio from an Interplay MVE container", version)]
struct Args {
    /// Path to an .mve file.
    input: PathBuf,

    /// Directory that receives frame_NNNN.png files.
    #[arg(long, value_name = "DIR", default_value = "mve_frames")]
    out: PathBuf,

    /// Stop after this many frames (0 = all).
    #[arg(long, default_value_t = 0)]
    limit: u32,

    /// Also concatenate the unsigned 8-bit PCM stream to this file.
    #[arg(long, value_name = "PATH")]
    audio: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let file =
        File::open(&args.input).with_context(|| format!("opening {}", args.input.display()))?;
    let mut decoder = MveDecoder::load(BufReader::new(file))
        .with_context(|| format!("loading {}", args.input.display()))?;
    fs::create_dir_all(&args.out)
        .with_context(|| format!("creating output directory {}", args.out.display()))?;

    let audio = decoder.audio_stream();
    let mut exported = 0u32;
    while decoder.advance_frame()? {
        let surface = decoder
            .current_surface()
            .context("frame presented without video initialization")?;
        let mut frame = RgbImage::new(surface.width() as u32, surface.height() as u32);
        for (y, row) in surface.data().chunks_exact(surface.width()).enumerate() {
            for (x, &index) in row.iter().enumerate() {
                frame.put_pixel(x as u32, y as u32, image::Rgb(decoder.palette_rgb(index)));
            }
        }
        let path = args.out.join(format!("frame_{exported:04}.png"));
        frame
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        decoder.clear_palette_dirty();
        exported += 1;
        if args.limit != 0 && exported >= args.limit {
            break;
        }
    }
    println!("Exported {exported} frame(s) to {}", args.out.display());

    if let Some(path) = &args.audio {
        let stream = audio.context("container has no audio stream")?;
        let mut out =
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut total = 0usize;
        while let Some(buffer) = stream.try_next() {
            out.write_all(&buffer)
                .with_context(|| format!("writing {}", path.display()))?;
            total += buffer.len();
        }
        println!(
            "Wrote {total} PCM bytes ({} Hz, unsigned 8-bit mono) to {}",
            stream.sample_rate(),
            path.display()
        );
    }
    Ok(())
}
