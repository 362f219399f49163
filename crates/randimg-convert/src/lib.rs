//! Randimg Convert - offline variant generation for the image sets
//!
//! Reads originals from `<input>/pc` and `<input>/pe` and writes one file per
//! target format to `<output>/{pc,pe}/{webp,avif,jpeg}/<stem>.<ext>`, the
//! layout the API builds `/converted/...` URLs for.
//!
//! Files are processed in parallel. A file that fails to decode or encode is
//! reported and skipped; it never aborts the run.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use image::DynamicImage;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use randimg_core::{DeviceType, OutputFormat};
use rayon::prelude::*;
use walkdir::WalkDir;

/// Errors produced while converting a single file.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("failed to encode {} as {format}: {source}", path.display())]
    Encode {
        path: PathBuf,
        format: TargetFormat,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A format the converter can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum TargetFormat {
    Webp,
    Avif,
    #[value(alias = "jpg")]
    Jpeg,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 3] = [Self::Webp, Self::Avif, Self::Jpeg];

    /// Directory name under `<output>/<device>/`.
    pub fn dir_name(self) -> &'static str {
        OutputFormat::from(self).as_str()
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Avif => "avif",
            Self::Jpeg => "jpg",
        }
    }
}

impl From<TargetFormat> for OutputFormat {
    fn from(format: TargetFormat) -> Self {
        match format {
            TargetFormat::Webp => OutputFormat::Webp,
            TargetFormat::Avif => OutputFormat::Avif,
            TargetFormat::Jpeg => OutputFormat::Jpeg,
        }
    }
}

impl std::fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Encoder settings shared by every file in a run.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub formats: Vec<TargetFormat>,
    /// AVIF quality, 1-100.
    pub avif_quality: u8,
    /// AVIF encoder speed, 1 (slowest) to 10 (fastest).
    pub avif_speed: u8,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            formats: TargetFormat::ALL.to_vec(),
            avif_quality: 50,
            avif_speed: 6,
            jpeg_quality: 85,
        }
    }
}

/// One source image to convert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub device: DeviceType,
    pub path: PathBuf,
}

impl SourceImage {
    /// Output path of this image's `format` variant under `output`.
    pub fn target_path(&self, output: &Path, format: TargetFormat) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        output
            .join(self.device.as_str())
            .join(format.dir_name())
            .join(format!("{stem}.{}", format.extension()))
    }
}

/// Outcome of one run.
#[derive(Debug, Default)]
pub struct ConvertSummary {
    /// Variants written successfully.
    pub written: usize,
    /// Per-variant failures, in no particular order.
    pub failures: Vec<ConvertError>,
}

impl ConvertSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Create `<output>/{pc,pe}/<format>` for every requested format.
pub fn prepare_output(output: &Path, formats: &[TargetFormat]) -> Result<(), ConvertError> {
    for device in DeviceType::ALL {
        for format in formats {
            let dir = output.join(device.as_str()).join(format.dir_name());
            fs::create_dir_all(&dir).map_err(|source| ConvertError::Io { path: dir, source })?;
        }
    }
    Ok(())
}

/// List the regular, non-hidden files directly inside `<input>/pc` and `<input>/pe`.
///
/// A missing set directory is logged and contributes nothing.
pub fn collect_sources(input: &Path) -> Vec<SourceImage> {
    let mut sources = Vec::new();

    for device in DeviceType::ALL {
        let dir = input.join(device.as_str());
        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "source directory missing, skipping");
            continue;
        }

        let paths: Vec<PathBuf> = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
            .map(|e| e.into_path())
            .collect();

        tracing::info!(device = %device, files = paths.len(), "found source images");
        sources.extend(paths.into_iter().map(|path| SourceImage { device, path }));
    }

    sources
}

/// Convert every source under `input` into `output`.
pub fn convert_all(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> Result<ConvertSummary, ConvertError> {
    prepare_output(output, &options.formats)?;
    let sources = collect_sources(input);

    let results: Vec<Result<(), ConvertError>> = sources
        .par_iter()
        .flat_map_iter(|source| convert_image(source, output, options))
        .collect();

    let mut summary = ConvertSummary::default();
    for result in results {
        match result {
            Ok(()) => summary.written += 1,
            Err(e) => summary.failures.push(e),
        }
    }
    Ok(summary)
}

/// Write every requested variant of one image, one result per format.
///
/// A decode failure is reported once per format so the counts line up.
pub fn convert_image(
    source: &SourceImage,
    output: &Path,
    options: &ConvertOptions,
) -> Vec<Result<(), ConvertError>> {
    let img = match image::open(&source.path) {
        Ok(img) => img,
        Err(e) => {
            tracing::error!(path = %source.path.display(), error = %e, "failed to decode image");
            return options
                .formats
                .iter()
                .map(|_| {
                    Err(ConvertError::Decode {
                        path: source.path.clone(),
                        reason: e.to_string(),
                    })
                })
                .collect();
        }
    };

    options
        .formats
        .iter()
        .map(|&format| {
            let target = source.target_path(output, format);
            let result = encode(&img, &target, format, options);
            match &result {
                Ok(()) => tracing::info!(
                    source = %source.path.display(),
                    target = %target.display(),
                    "converted"
                ),
                Err(e) => tracing::error!(error = %e, "conversion failed"),
            }
            result
        })
        .collect()
}

fn encode(
    img: &DynamicImage,
    target: &Path,
    format: TargetFormat,
    options: &ConvertOptions,
) -> Result<(), ConvertError> {
    let file = File::create(target).map_err(|source| ConvertError::Io {
        path: target.to_path_buf(),
        source,
    })?;
    let writer = BufWriter::new(file);

    // WebP and AVIF keep alpha; JPEG has no alpha channel.
    let encoded = match format {
        TargetFormat::Webp => DynamicImage::ImageRgba8(img.to_rgba8())
            .write_with_encoder(WebPEncoder::new_lossless(writer)),
        TargetFormat::Avif => DynamicImage::ImageRgba8(img.to_rgba8()).write_with_encoder(
            AvifEncoder::new_with_speed_quality(writer, options.avif_speed, options.avif_quality),
        ),
        TargetFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
            .write_with_encoder(JpegEncoder::new_with_quality(writer, options.jpeg_quality)),
    };

    encoded.map_err(|source| ConvertError::Encode {
        path: target.to_path_buf(),
        format,
        source,
    })
}
