//! Randimg Convert - bulk webp/avif/jpeg conversion of the image sets.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use randimg_convert::{ConvertOptions, TargetFormat, convert_all};

/// Convert the `pc` and `pe` originals into the variants served under `/converted`.
#[derive(Parser, Debug)]
#[command(name = "randimg-convert")]
#[command(about = "Convert wallpaper originals to webp, avif and jpeg", long_about = None)]
struct Args {
    /// Directory containing `pc/` and `pe/` originals.
    #[arg(long, default_value = "./images")]
    input: PathBuf,

    /// Directory receiving `pc/` and `pe/` variant trees.
    #[arg(long, default_value = "./converted")]
    output: PathBuf,

    /// Formats to produce (repeat or comma-separate).
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = TargetFormat::ALL)]
    formats: Vec<TargetFormat>,

    /// AVIF quality (1-100).
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u8).range(1..=100))]
    avif_quality: u8,

    /// AVIF encoder speed (1 slowest, 10 fastest).
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(1..=10))]
    avif_speed: u8,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = 85, value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let options = ConvertOptions {
        formats: args.formats,
        avif_quality: args.avif_quality,
        avif_speed: args.avif_speed,
        jpeg_quality: args.jpeg_quality,
    };

    tracing::info!(
        input = %args.input.display(),
        output = %args.output.display(),
        formats = ?options.formats,
        "starting conversion"
    );

    let started = Instant::now();
    let summary = convert_all(&args.input, &args.output, &options)?;

    tracing::info!(
        written = summary.written,
        failed = summary.failed(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "conversion finished"
    );

    Ok(())
}
