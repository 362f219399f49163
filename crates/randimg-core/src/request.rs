//! Request parameter resolution.
//!
//! Turns raw query parameters and client signals into a [`SelectionRequest`].
//! Malformed values fall back to defaults; the only rejected input is a
//! `type` that is neither `pc`, `pe` nor `ua`.

use serde::Serialize;

use crate::device::{self, DeviceType};
use crate::error::{Error, Result};
use crate::format::OutputFormat;
use crate::{DEFAULT_MAX_COUNT, HARD_COUNT_CAP};

/// Raw query parameters, exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    /// `pc`, `pe` or `ua`.
    pub kind: Option<String>,
    /// Number of images (default 1).
    pub count: Option<String>,
    /// Response shape: `json`, `text` or `redirect`.
    pub format: Option<String>,
    /// Image encoding: `auto`, `webp`, `avif`, `jpeg` or `original`.
    pub img_format: Option<String>,
    /// `redirect` forces a 302, `json` defers to `format`.
    pub return_mode: Option<String>,
    /// Prefer the configured external origin for image URLs.
    pub external: Option<String>,
    /// Include detection details. Present without a value counts as on.
    pub debug: Option<String>,
}

impl QueryParams {
    /// Collect parameters from decoded query pairs.
    ///
    /// The first occurrence of a repeated key wins; unknown keys are ignored.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "type" => &mut params.kind,
                "count" => &mut params.count,
                "format" => &mut params.format,
                "img_format" => &mut params.img_format,
                "return" => &mut params.return_mode,
                "external" => &mut params.external,
                "debug" => &mut params.debug,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        params
    }
}

/// Request headers that influence resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientSignals<'a> {
    pub user_agent: Option<&'a str>,
    pub accept: Option<&'a str>,
    /// Value of `Sec-CH-UA-Mobile`.
    pub mobile_hint: Option<&'a str>,
}

/// Server-side bounds applied during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Largest accepted `count`, at most [`HARD_COUNT_CAP`].
    pub max_count: usize,
    /// Format used when `img_format` is missing or unrecognized.
    pub default_format: OutputFormat,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_count: DEFAULT_MAX_COUNT,
            default_format: OutputFormat::Original,
        }
    }
}

/// How the image set was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Detection {
    Manual,
    UserAgent,
}

/// Shape of a successful response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseShape {
    Json,
    Text,
    Redirect,
}

/// A fully normalized selection request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRequest {
    pub device: DeviceType,
    pub detected_by: Detection,
    /// Between 1 and the configured maximum; always 1 for redirects.
    pub count: usize,
    pub shape: ResponseShape,
    /// Never [`OutputFormat::Auto`].
    pub format: OutputFormat,
    pub external: bool,
    pub debug: bool,
}

impl SelectionRequest {
    /// `type=ua&debug` asks for the detection result instead of an image.
    pub fn is_detection_probe(&self) -> bool {
        self.debug && self.detected_by == Detection::UserAgent
    }
}

/// Outcome of resolving a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// No `type` given: the caller should render usage help.
    Help,
    Select(SelectionRequest),
}

/// Resolve query parameters into a selection request.
pub fn resolve(
    params: &QueryParams,
    signals: &ClientSignals<'_>,
    limits: &Limits,
) -> Result<Resolved> {
    let kind = normalized(params.kind.as_deref());
    if kind.is_empty() {
        return Ok(Resolved::Help);
    }

    let (device, detected_by) = match kind.as_str() {
        "ua" => (
            device::classify(signals.user_agent, signals.mobile_hint),
            Detection::UserAgent,
        ),
        other => match DeviceType::parse(other) {
            Some(device) => (device, Detection::Manual),
            None => return Err(Error::InvalidType(other.to_string())),
        },
    };

    let shape = resolve_shape(params);
    let count = match shape {
        ResponseShape::Redirect => 1,
        _ => resolve_count(params.count.as_deref(), limits.max_count),
    };

    let format = params
        .img_format
        .as_deref()
        .and_then(OutputFormat::parse)
        .unwrap_or(limits.default_format)
        .negotiate(signals.accept);

    Ok(Resolved::Select(SelectionRequest {
        device,
        detected_by,
        count,
        shape,
        format,
        external: parse_flag(params.external.as_deref()),
        debug: parse_presence(params.debug.as_deref()),
    }))
}

fn normalized(value: Option<&str>) -> String {
    value.unwrap_or_default().trim().to_ascii_lowercase()
}

fn resolve_shape(params: &QueryParams) -> ResponseShape {
    if normalized(params.return_mode.as_deref()) == "redirect" {
        return ResponseShape::Redirect;
    }

    match normalized(params.format.as_deref()).as_str() {
        "text" | "txt" => ResponseShape::Text,
        "redirect" => ResponseShape::Redirect,
        _ => ResponseShape::Json,
    }
}

fn resolve_count(raw: Option<&str>, max_count: usize) -> usize {
    let max_count = max_count.clamp(1, HARD_COUNT_CAP);
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, max_count)
}

/// `true`, `1` and `yes` switch a flag on.
fn parse_flag(raw: Option<&str>) -> bool {
    matches!(normalized(raw).as_str(), "true" | "1" | "yes")
}

/// Any value other than `false` / `0`, including an empty one, switches it on.
fn parse_presence(raw: Option<&str>) -> bool {
    match raw {
        None => false,
        Some(_) => !matches!(normalized(raw).as_str(), "false" | "0"),
    }
}
