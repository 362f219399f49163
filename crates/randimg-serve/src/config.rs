//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use randimg_core::{
    DEFAULT_HISTORY_SIZE, DEFAULT_MAX_COUNT, HARD_COUNT_CAP, Limits, OutputFormat,
};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080").
    pub bind_addr: String,

    /// Directory holding `pc/` and `pe/` originals, scanned when no manifest is set.
    pub image_dir: PathBuf,

    /// Manifest location: an `http(s)://` URL or a local file path.
    pub manifest: Option<String>,

    /// How long a loaded image list is served before reloading.
    pub manifest_ttl: Duration,

    /// Timeout for remote manifest fetches.
    pub fetch_timeout: Duration,

    /// Origin used in image URLs. Derived from the `Host` header when unset.
    pub public_base_url: Option<String>,

    /// Origin used when a request sets `external=true`.
    pub external_base_url: Option<String>,

    /// Largest `count` a request may ask for.
    pub max_count: usize,

    /// Recently served images remembered per set; 0 disables anti-repeat.
    pub history_size: usize,

    /// Format used when `img_format` is missing or unrecognized.
    pub default_format: OutputFormat,

    /// Prometheus exporter port, disabled when unset.
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            image_dir: PathBuf::from("./images"),
            manifest: None,
            manifest_ttl: Duration::from_secs(300),
            fetch_timeout: Duration::from_secs(5),
            public_base_url: None,
            external_base_url: None,
            max_count: DEFAULT_MAX_COUNT,
            history_size: DEFAULT_HISTORY_SIZE,
            default_format: OutputFormat::Original,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - None (all have defaults for local development)
    ///
    /// Optional:
    /// - `RANDIMG_BIND_ADDR`: Server bind address (default: "0.0.0.0:8080")
    /// - `RANDIMG_IMAGE_DIR`: Image directory (default: "./images")
    /// - `RANDIMG_MANIFEST_URL`: Manifest URL or file path (default: directory scan)
    /// - `RANDIMG_MANIFEST_TTL_SECS`: Image list cache TTL (default: 300)
    /// - `RANDIMG_FETCH_TIMEOUT_SECS`: Manifest fetch timeout (default: 5)
    /// - `RANDIMG_PUBLIC_BASE_URL`: Origin for image URLs (default: from Host header)
    /// - `RANDIMG_EXTERNAL_BASE_URL`: Origin for `external=true` requests
    /// - `RANDIMG_MAX_COUNT`: Per-request image limit, 1-100 (default: 20)
    /// - `RANDIMG_HISTORY_SIZE`: Anti-repeat history per set (default: 50)
    /// - `RANDIMG_DEFAULT_FORMAT`: auto|webp|avif|jpeg|original (default: original)
    /// - `RANDIMG_METRICS_PORT`: Prometheus exporter port (default: disabled)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let bind_addr = std::env::var("RANDIMG_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let image_dir = std::env::var("RANDIMG_IMAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.image_dir);

        let manifest = non_empty_var("RANDIMG_MANIFEST_URL");

        let manifest_ttl = parse_var::<u64>("RANDIMG_MANIFEST_TTL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.manifest_ttl);

        let fetch_timeout = parse_var::<u64>("RANDIMG_FETCH_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.fetch_timeout);

        let public_base_url = non_empty_var("RANDIMG_PUBLIC_BASE_URL").map(strip_trailing_slash);
        let external_base_url =
            non_empty_var("RANDIMG_EXTERNAL_BASE_URL").map(strip_trailing_slash);

        let max_count = parse_var::<usize>("RANDIMG_MAX_COUNT")?
            .unwrap_or(defaults.max_count)
            .clamp(1, HARD_COUNT_CAP);

        let history_size =
            parse_var::<usize>("RANDIMG_HISTORY_SIZE")?.unwrap_or(defaults.history_size);

        let default_format = match non_empty_var("RANDIMG_DEFAULT_FORMAT") {
            Some(raw) => OutputFormat::parse(&raw).with_context(|| {
                format!("RANDIMG_DEFAULT_FORMAT '{raw}' is not one of auto, webp, avif, jpeg, original")
            })?,
            None => defaults.default_format,
        };

        let metrics_port = parse_var::<u16>("RANDIMG_METRICS_PORT")?.filter(|port| *port > 0);

        tracing::info!(
            bind_addr = %bind_addr,
            image_dir = %image_dir.display(),
            manifest = ?manifest,
            manifest_ttl_secs = manifest_ttl.as_secs(),
            max_count,
            history_size,
            default_format = %default_format,
            "configuration loaded"
        );

        Ok(Self {
            bind_addr,
            image_dir,
            manifest,
            manifest_ttl,
            fetch_timeout,
            public_base_url,
            external_base_url,
            max_count,
            history_size,
            default_format,
            metrics_port,
        })
    }

    /// Resolution bounds derived from this configuration.
    pub fn limits(&self) -> Limits {
        Limits {
            max_count: self.max_count,
            default_format: self.default_format,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    non_empty_var(key)
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("{key} has invalid value '{raw}'"))
        })
        .transpose()
}

fn strip_trailing_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize config tests that manipulate env vars.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_KEYS: &[&str] = &[
        "RANDIMG_BIND_ADDR",
        "RANDIMG_IMAGE_DIR",
        "RANDIMG_MANIFEST_URL",
        "RANDIMG_MANIFEST_TTL_SECS",
        "RANDIMG_FETCH_TIMEOUT_SECS",
        "RANDIMG_PUBLIC_BASE_URL",
        "RANDIMG_EXTERNAL_BASE_URL",
        "RANDIMG_MAX_COUNT",
        "RANDIMG_HISTORY_SIZE",
        "RANDIMG_DEFAULT_FORMAT",
        "RANDIMG_METRICS_PORT",
    ];

    /// Helper to run config tests with isolated env vars.
    fn with_env_vars<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let saved: Vec<_> = ENV_KEYS
            .iter()
            .map(|k| (*k, std::env::var(k).ok()))
            .collect();

        // SAFETY: Serialized by mutex; only test code touches these vars.
        unsafe {
            for k in ENV_KEYS {
                std::env::remove_var(k);
            }
            for (k, v) in vars {
                std::env::set_var(k, v);
            }
        }

        f();

        // SAFETY: Restoring original env state.
        unsafe {
            for (k, v) in &saved {
                match v {
                    Some(val) => std::env::set_var(k, val),
                    None => std::env::remove_var(k),
                }
            }
        }
    }

    #[test]
    fn config_defaults() {
        with_env_vars(&[], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.bind_addr, "0.0.0.0:8080");
            assert_eq!(config.image_dir, PathBuf::from("./images"));
            assert_eq!(config.manifest, None);
            assert_eq!(config.manifest_ttl, Duration::from_secs(300));
            assert_eq!(config.max_count, 20);
            assert_eq!(config.history_size, 50);
            assert_eq!(config.default_format, OutputFormat::Original);
            assert_eq!(config.metrics_port, None);
        });
    }

    #[test]
    fn config_custom_values() {
        with_env_vars(
            &[
                ("RANDIMG_BIND_ADDR", "127.0.0.1:9090"),
                ("RANDIMG_MANIFEST_URL", "https://x.test/images.txt"),
                ("RANDIMG_MANIFEST_TTL_SECS", "60"),
                ("RANDIMG_PUBLIC_BASE_URL", "https://img.example.com/"),
                ("RANDIMG_EXTERNAL_BASE_URL", "https://cdn.example.com"),
                ("RANDIMG_HISTORY_SIZE", "0"),
                ("RANDIMG_DEFAULT_FORMAT", "auto"),
                ("RANDIMG_METRICS_PORT", "9091"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.bind_addr, "127.0.0.1:9090");
                assert_eq!(config.manifest.as_deref(), Some("https://x.test/images.txt"));
                assert_eq!(config.manifest_ttl, Duration::from_secs(60));
                assert_eq!(
                    config.public_base_url.as_deref(),
                    Some("https://img.example.com")
                );
                assert_eq!(
                    config.external_base_url.as_deref(),
                    Some("https://cdn.example.com")
                );
                assert_eq!(config.history_size, 0);
                assert_eq!(config.default_format, OutputFormat::Auto);
                assert_eq!(config.metrics_port, Some(9091));
            },
        );
    }

    #[test]
    fn config_max_count_clamped() {
        with_env_vars(&[("RANDIMG_MAX_COUNT", "500")], || {
            assert_eq!(Config::from_env().unwrap().max_count, HARD_COUNT_CAP);
        });
        with_env_vars(&[("RANDIMG_MAX_COUNT", "0")], || {
            assert_eq!(Config::from_env().unwrap().max_count, 1);
        });
    }

    #[test]
    fn config_rejects_invalid_numbers() {
        with_env_vars(&[("RANDIMG_MAX_COUNT", "many")], || {
            let err = Config::from_env().unwrap_err();
            assert!(err.to_string().contains("RANDIMG_MAX_COUNT"));
        });
    }

    #[test]
    fn config_rejects_unknown_format() {
        with_env_vars(&[("RANDIMG_DEFAULT_FORMAT", "gif")], || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn config_blank_values_use_defaults() {
        with_env_vars(&[("RANDIMG_MANIFEST_URL", "  "), ("RANDIMG_METRICS_PORT", "0")], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.manifest, None);
            assert_eq!(config.metrics_port, None);
        });
    }
}
