//! Output image formats and `Accept`-based negotiation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Encoding of the image a returned URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Webp,
    Avif,
    Jpeg,
    /// The source file as uploaded, served from `/images`.
    Original,
    /// Chosen per request from the client's `Accept` header.
    Auto,
}

impl OutputFormat {
    /// Parse an `img_format` value. `jpg` is accepted as an alias for `jpeg`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "webp" => Some(Self::Webp),
            "avif" => Some(Self::Avif),
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "original" => Some(Self::Original),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Avif => "avif",
            Self::Jpeg => "jpeg",
            Self::Original => "original",
            Self::Auto => "auto",
        }
    }

    /// File extension of converted variants, `None` for `original` and `auto`.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            Self::Webp => Some("webp"),
            Self::Avif => Some("avif"),
            Self::Jpeg => Some("jpg"),
            Self::Original | Self::Auto => None,
        }
    }

    /// Replace `auto` with the best format the client advertises.
    ///
    /// AVIF is preferred over WebP; clients advertising neither get JPEG.
    /// Concrete formats are returned unchanged.
    pub fn negotiate(self, accept: Option<&str>) -> Self {
        if self != Self::Auto {
            return self;
        }

        let accept = accept.unwrap_or_default().to_ascii_lowercase();
        if accept.contains("image/avif") {
            Self::Avif
        } else if accept.contains("image/webp") {
            Self::Webp
        } else {
            Self::Jpeg
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
