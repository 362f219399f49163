//! Response rendering: JSON, plain text, redirects and the usage page.
//!
//! Every response from the API also passes through the no-cache middleware
//! in [`crate::routes`]; image responses additionally get a random `ETag`
//! so intermediaries never match a previous pick.

use axum::Json;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use rand::Rng;
use rand::distr::Alphanumeric;
use randimg_core::{Detection, DeviceType, ImageSet, OutputFormat, SelectionRequest};
use serde::Serialize;

/// User-Agent prefix length echoed back in debug output.
const DEBUG_UA_LEN: usize = 100;

/// One selected image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagePick {
    pub filename: String,
    pub url: String,
}

/// Client details echoed back when `debug` is set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub user_agent: String,
    #[serde(rename = "realIP")]
    pub real_ip: String,
    pub is_mobile: bool,
    pub timestamp: i64,
}

impl DebugInfo {
    pub fn new(user_agent: Option<&str>, real_ip: Option<&str>, device: DeviceType) -> Self {
        Self {
            user_agent: truncate_chars(user_agent.unwrap_or("unknown"), DEBUG_UA_LEN),
            real_ip: real_ip.unwrap_or("unknown").to_string(),
            is_mobile: device == DeviceType::Pe,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Successful JSON payload.
#[derive(Debug, Serialize)]
struct SelectionResponse<'a> {
    success: bool,
    code: u16,
    message: &'static str,
    #[serde(rename = "type")]
    device: DeviceType,
    detected_by: Detection,
    format: OutputFormat,
    count: usize,
    image: Option<&'a ImagePick>,
    images: &'a [ImagePick],
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<DebugInfo>,
}

/// Payload of the `type=ua&debug` detection probe.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectionReport {
    detected: &'static str,
    is_mobile: bool,
    device_type: DeviceType,
    user_agent: String,
    #[serde(rename = "realIP")]
    real_ip: String,
    timestamp: i64,
}

/// JSON body listing the selected images.
pub fn json(request: &SelectionRequest, picks: &[ImagePick], debug: Option<DebugInfo>) -> Response {
    let body = SelectionResponse {
        success: true,
        code: StatusCode::OK.as_u16(),
        message: "Success",
        device: request.device,
        detected_by: request.detected_by,
        format: request.format,
        count: picks.len(),
        image: picks.first(),
        images: picks,
        debug,
    };

    with_etag((StatusCode::OK, Json(body)).into_response())
}

/// Newline-separated image URLs.
pub fn text(picks: &[ImagePick]) -> Response {
    let body = picks
        .iter()
        .map(|pick| pick.url.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    with_etag(
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response(),
    )
}

/// `302 Found` pointing at a single image.
pub fn redirect(url: &str) -> Response {
    match HeaderValue::from_str(url) {
        Ok(location) => {
            let mut headers = HeaderMap::new();
            headers.insert(header::LOCATION, location);
            (StatusCode::FOUND, headers).into_response()
        }
        Err(_) => {
            tracing::warn!(url = %url, "image URL is not a valid Location header");
            crate::error::ApiError::Internal(anyhow::anyhow!("invalid redirect target"))
                .into_response()
        }
    }
}

/// Detection result for `type=ua&debug`.
pub fn detection(
    device: DeviceType,
    user_agent: Option<&str>,
    real_ip: Option<&str>,
) -> Response {
    let report = DetectionReport {
        detected: "ua",
        is_mobile: device == DeviceType::Pe,
        device_type: device,
        user_agent: truncate_chars(user_agent.unwrap_or("unknown"), DEBUG_UA_LEN),
        real_ip: real_ip.unwrap_or("unknown").to_string(),
        timestamp: chrono::Utc::now().timestamp_millis(),
    };

    (StatusCode::OK, Json(report)).into_response()
}

/// Plain-text usage page shown when `type` is missing.
pub fn help(set: &ImageSet, max_count: usize) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        help_text(set, max_count),
    )
        .into_response()
}

pub fn help_text(set: &ImageSet, max_count: usize) -> String {
    format!(
        "Random Image API

Usage:
  ?type=pc          widescreen images
  ?type=pe          portrait images
  ?type=ua          pick by User-Agent

Parameters:
  count=1-{max_count}        number of images (default 1)
  format=json|text|redirect
  img_format=auto|webp|avif|jpeg|original
  return=redirect   302 to a single image
  external=true     use the external image origin
  debug             include client detection details

Images:
  pc: {pc}
  pe: {pe}
  time: {time}
",
        pc = set.pc.len(),
        pe = set.pe.len(),
        time = chrono::Utc::now().to_rfc3339(),
    )
}

fn with_etag(mut response: Response) -> Response {
    let tag: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();

    if let Ok(value) = HeaderValue::from_str(&format!("\"{tag}\"")) {
        response.headers_mut().insert(header::ETAG, value);
    }
    response
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
