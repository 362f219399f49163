//! Application state shared across all request handlers.

use std::sync::Arc;

use parking_lot::Mutex;
use randimg_core::{ImageSet, Limits, RecentHistory, Sampler, SamplerConfig};

use crate::config::Config;
use crate::library::{ImageLibrary, LibrarySource};

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,

    /// Cached image lists.
    pub library: ImageLibrary,

    /// Recently served indices per image set. Locked only for one
    /// sample-and-record step, never across an await.
    pub history: Arc<Mutex<RecentHistory>>,

    /// Selection policy.
    pub sampler: Arc<Sampler>,
}

impl AppState {
    /// Create application state, picking the image source from configuration.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let source = LibrarySource::from_location(
            config.manifest.as_deref(),
            config.image_dir.clone(),
            config.fetch_timeout,
        )?;
        let library = ImageLibrary::new(source, config.manifest_ttl);
        Ok(Self::with_library(config, library))
    }

    /// Create application state serving a fixed image set.
    pub fn with_image_set(config: Config, set: ImageSet) -> Self {
        Self::with_library(config, ImageLibrary::fixed(set))
    }

    fn with_library(config: Config, library: ImageLibrary) -> Self {
        let sampler_config = if config.history_size > 0 {
            SamplerConfig::default()
        } else {
            SamplerConfig::without_history()
        };

        tracing::info!(
            history_size = config.history_size,
            avoid_recent = sampler_config.avoid_recent,
            manifest_ttl_secs = config.manifest_ttl.as_secs(),
            "application state initialized"
        );

        Self {
            history: Arc::new(Mutex::new(RecentHistory::new(config.history_size))),
            sampler: Arc::new(Sampler::new(sampler_config)),
            config: Arc::new(config),
            library,
        }
    }

    pub fn limits(&self) -> Limits {
        self.config.limits()
    }
}
