//! Device classification.
//!
//! Maps a User-Agent string (and optionally the `Sec-CH-UA-Mobile` client
//! hint) to one of the two image sets: widescreen (`pc`) or portrait (`pe`).

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Image set a request is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Widescreen images for desktop clients.
    Pc,
    /// Portrait images for phones and tablets.
    Pe,
}

impl DeviceType {
    /// Both image sets, in display order.
    pub const ALL: [DeviceType; 2] = [DeviceType::Pc, DeviceType::Pe];

    /// Parse a set name (`pc` / `pe`), ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pc" => Some(Self::Pc),
            "pe" => Some(Self::Pe),
            _ => None,
        }
    }

    /// Lowercase name used in URLs and JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pc => "pc",
            Self::Pe => "pe",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase substrings that mark a mobile User-Agent.
const MOBILE_KEYWORDS: &[&str] = &[
    "mobile",
    "android",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "windows phone",
    "opera mini",
    "iemobile",
    "mobile safari",
    "webos",
    "kindle",
    "silk",
    "fennec",
    "maemo",
    "tablet",
];

/// Fallback pattern for User-Agents the keyword scan misses.
static MOBILE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)android|webos|iphone|ipad|ipod|blackberry|iemobile|opera mini")
        .expect("mobile regex should compile")
});

/// Returns `true` when the User-Agent looks like a phone or tablet.
///
/// Missing or empty input is treated as a desktop client.
pub fn is_mobile(user_agent: Option<&str>) -> bool {
    let Some(ua) = user_agent.filter(|ua| !ua.trim().is_empty()) else {
        return false;
    };

    let lower = ua.to_lowercase();
    if MOBILE_KEYWORDS.iter().any(|keyword| lower.contains(keyword)) {
        return true;
    }

    MOBILE_REGEX.is_match(ua)
}

/// Pick the image set for a client.
///
/// A `Sec-CH-UA-Mobile: ?1` hint wins outright. Any other hint value leaves
/// the decision to the User-Agent, since `?0` is also sent by tablets that
/// request the desktop site.
pub fn classify(user_agent: Option<&str>, mobile_hint: Option<&str>) -> DeviceType {
    if mobile_hint.map(str::trim) == Some("?1") {
        return DeviceType::Pe;
    }

    if is_mobile(user_agent) {
        DeviceType::Pe
    } else {
        DeviceType::Pc
    }
}
