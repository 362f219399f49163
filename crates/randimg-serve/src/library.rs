//! Image list loading with TTL caching and stale fallback.
//!
//! The current [`ImageSet`] is kept in a single-entry moka cache. When the
//! entry expires the next request reloads it from its source. If the reload
//! fails, the last successfully loaded list is served again (and re-cached
//! for another TTL) so a flaky manifest host does not take the API down.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use parking_lot::RwLock;
use randimg_core::metrics::{record_refresh, set_library_size};
use randimg_core::{DeviceType, ImageSet};

use crate::error::ApiError;

/// Where image lists come from.
#[derive(Debug, Clone)]
pub enum LibrarySource {
    /// A fixed list supplied at startup.
    Static(Arc<ImageSet>),
    /// `<dir>/pc` and `<dir>/pe` on the local filesystem.
    Directory(PathBuf),
    /// A manifest file on the local filesystem.
    ManifestFile(PathBuf),
    /// A manifest served over HTTP(S).
    Remote { url: String, client: reqwest::Client },
}

impl LibrarySource {
    /// Pick a source from configuration: a manifest location wins over the
    /// image directory.
    pub fn from_location(
        manifest: Option<&str>,
        image_dir: PathBuf,
        fetch_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let Some(location) = manifest else {
            return Ok(Self::Directory(image_dir));
        };

        if randimg_core::url::is_absolute_url(location) {
            let client = reqwest::Client::builder()
                .timeout(fetch_timeout)
                .user_agent(concat!("randimg/", env!("CARGO_PKG_VERSION")))
                .build()?;
            Ok(Self::Remote {
                url: location.to_string(),
                client,
            })
        } else {
            Ok(Self::ManifestFile(PathBuf::from(location)))
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Static(_) => "static".to_string(),
            Self::Directory(dir) => format!("dir:{}", dir.display()),
            Self::ManifestFile(path) => format!("file:{}", path.display()),
            Self::Remote { url, .. } => url.clone(),
        }
    }

    async fn load(&self) -> Result<Arc<ImageSet>, ApiError> {
        match self {
            Self::Static(set) => Ok(set.clone()),
            Self::Directory(dir) => {
                let dir = dir.clone();
                let set = tokio::task::spawn_blocking(move || ImageSet::from_directory(&dir))
                    .await
                    .map_err(anyhow::Error::from)??;
                Ok(Arc::new(set))
            }
            Self::ManifestFile(path) => {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .map_err(randimg_core::Error::from)?;
                Ok(Arc::new(ImageSet::parse_manifest(&text)?))
            }
            Self::Remote { url, client } => {
                let text = client
                    .get(url)
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await?;
                Ok(Arc::new(ImageSet::parse_manifest(&text)?))
            }
        }
    }
}

/// Shared, cached access to the current image lists.
#[derive(Clone)]
pub struct ImageLibrary {
    source: Arc<LibrarySource>,
    cache: Cache<(), Arc<ImageSet>>,
    last_good: Arc<RwLock<Option<Arc<ImageSet>>>>,
}

impl ImageLibrary {
    pub fn new(source: LibrarySource, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();

        Self {
            source: Arc::new(source),
            cache,
            last_good: Arc::new(RwLock::new(None)),
        }
    }

    /// A library that always serves `set`.
    pub fn fixed(set: ImageSet) -> Self {
        Self::new(LibrarySource::Static(Arc::new(set)), Duration::from_secs(3600))
    }

    /// Return the current image lists, reloading them if the cached copy expired.
    ///
    /// Concurrent callers that find the entry expired share a single reload.
    pub async fn current(&self) -> Result<Arc<ImageSet>, ApiError> {
        self.cache
            .try_get_with((), self.reload())
            .await
            .map_err(|err| {
                Arc::try_unwrap(err)
                    .unwrap_or_else(|shared| ApiError::Internal(anyhow::anyhow!("{shared}")))
            })
    }

    /// Load from the source, falling back to the last good copy on failure.
    async fn reload(&self) -> Result<Arc<ImageSet>, ApiError> {
        tracing::debug!(source = %self.source.describe(), "image list expired, reloading");

        match self.source.load().await {
            Ok(set) => {
                for device in DeviceType::ALL {
                    set_library_size(device, set.len(device));
                }
                record_refresh("ok");
                tracing::info!(
                    source = %self.source.describe(),
                    pc = set.pc.len(),
                    pe = set.pe.len(),
                    "image list loaded"
                );

                *self.last_good.write() = Some(set.clone());
                Ok(set)
            }
            Err(err) => {
                let stale = self.last_good.read().clone();
                match stale {
                    Some(stale) => {
                        record_refresh("stale");
                        tracing::warn!(
                            source = %self.source.describe(),
                            error = %err,
                            "image list reload failed, serving stale copy"
                        );
                        Ok(stale)
                    }
                    None => {
                        record_refresh("error");
                        Err(err)
                    }
                }
            }
        }
    }
}
