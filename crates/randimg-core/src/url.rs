//! Image URL construction.
//!
//! Layout served by the static file host:
//!
//! ```text
//! /images/{pc|pe}/{filename}                       originals
//! /converted/{pc|pe}/{webp|avif|jpeg}/{stem}.{ext}  converter output
//! ```

use std::path::Path;

use crate::device::DeviceType;
use crate::format::OutputFormat;

/// Returns `true` for entries that already point at an absolute HTTP(S) URL.
pub fn is_absolute_url(entry: &str) -> bool {
    let lower = entry.trim_start().to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

/// Build the public URL of an image.
///
/// Absolute entries are returned unchanged. `Auto` is treated like
/// `Original`; callers negotiate it before building URLs.
pub fn build_image_url(
    filename: &str,
    device: DeviceType,
    format: OutputFormat,
    base_origin: &str,
) -> String {
    if is_absolute_url(filename) {
        return filename.trim().to_string();
    }

    let base = base_origin.trim_end_matches('/');
    let filename = filename.trim_start_matches('/');

    match format.extension() {
        Some(ext) => format!(
            "{base}/converted/{device}/{format}/{stem}.{ext}",
            stem = file_stem(filename),
        ),
        None => format!("{base}/images/{device}/{filename}"),
    }
}

/// Filename without its final extension, matching the converter's naming.
fn file_stem(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converted_webp_url() {
        assert_eq!(
            build_image_url("foo", DeviceType::Pc, OutputFormat::Webp, "https://x.test"),
            "https://x.test/converted/pc/webp/foo.webp"
        );
    }

    #[test]
    fn converted_url_replaces_source_extension() {
        assert_eq!(
            build_image_url(
                "100234583_p0.png",
                DeviceType::Pe,
                OutputFormat::Avif,
                "https://x.test"
            ),
            "https://x.test/converted/pe/avif/100234583_p0.avif"
        );
        assert_eq!(
            build_image_url("a.b.webp", DeviceType::Pc, OutputFormat::Jpeg, "https://x.test"),
            "https://x.test/converted/pc/jpeg/a.b.jpg"
        );
    }

    #[test]
    fn original_url_keeps_filename() {
        assert_eq!(
            build_image_url(
                "nachoneko-8276179.webp",
                DeviceType::Pc,
                OutputFormat::Original,
                "https://x.test"
            ),
            "https://x.test/images/pc/nachoneko-8276179.webp"
        );
    }

    #[test]
    fn trailing_slash_on_base_is_ignored() {
        assert_eq!(
            build_image_url("foo.jpg", DeviceType::Pe, OutputFormat::Original, "https://x.test/"),
            "https://x.test/images/pe/foo.jpg"
        );
    }

    #[test]
    fn absolute_entries_pass_through() {
        let external = "https://cdn.example.com/pics/foo.webp";
        assert_eq!(
            build_image_url(external, DeviceType::Pc, OutputFormat::Avif, "https://x.test"),
            external
        );
        assert!(is_absolute_url("HTTP://cdn.example.com/a.png"));
        assert!(!is_absolute_url("ftp://cdn.example.com/a.png"));
        assert!(!is_absolute_url("foo.webp"));
    }
}
