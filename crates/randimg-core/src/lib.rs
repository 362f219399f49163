//! Core selection logic for the random image API.
//!
//! This crate provides:
//! - Device classification from User-Agent strings and client hints
//! - Request parameter resolution into a normalized [`SelectionRequest`]
//! - Anti-repeat random sampling over image sets
//! - Image URL construction for original and converted variants
//! - Image set manifests (directory scans and text manifests)
//! - Prometheus metrics helpers
//! - Shared error types

pub mod device;
mod error;
pub mod format;
pub mod history;
pub mod manifest;
pub mod metrics;
pub mod request;
pub mod sampler;
pub mod url;

// ═══════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════

/// Hard upper bound on the number of images returned by one request.
pub const HARD_COUNT_CAP: usize = 100;

/// Default per-request count limit.
pub const DEFAULT_MAX_COUNT: usize = 20;

/// Default number of recently served indices remembered per image set.
pub const DEFAULT_HISTORY_SIZE: usize = 50;

pub use device::{DeviceType, classify, is_mobile};
pub use error::{Error, Result};
pub use format::OutputFormat;
pub use history::RecentHistory;
pub use manifest::ImageSet;
pub use request::{
    ClientSignals, Detection, Limits, QueryParams, Resolved, ResponseShape, SelectionRequest,
    resolve,
};
pub use sampler::{Sampler, SamplerConfig};
pub use url::build_image_url;
