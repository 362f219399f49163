//! Image sets and the manifests they are loaded from.
//!
//! Two manifest encodings are accepted:
//!
//! ```text
//! # plain text: one entry per line, grouped by section
//! [pc]
//! 100234583_p0.webp
//! [pe]
//! 100605558_p0.webp
//! https://cdn.example.com/portrait/abc.webp
//! ```
//!
//! ```json
//! {"pc": ["100234583_p0.webp"], "pe": ["100605558_p0.webp"]}
//! ```
//!
//! An image directory is laid out as `<dir>/pc/*` and `<dir>/pe/*`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::device::DeviceType;
use crate::error::{Error, Result};

/// Filenames (or absolute URLs) available for each device type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSet {
    #[serde(default)]
    pub pc: Vec<String>,
    #[serde(default)]
    pub pe: Vec<String>,
}

impl ImageSet {
    pub fn new(pc: Vec<String>, pe: Vec<String>) -> Self {
        Self { pc, pe }
    }

    /// Entries for one device type.
    pub fn get(&self, device: DeviceType) -> &[String] {
        match device {
            DeviceType::Pc => &self.pc,
            DeviceType::Pe => &self.pe,
        }
    }

    pub fn len(&self, device: DeviceType) -> usize {
        self.get(device).len()
    }

    /// Parse a text or JSON manifest.
    pub fn parse_manifest(text: &str) -> Result<Self> {
        if text.trim_start().starts_with('{') {
            return serde_json::from_str(text).map_err(|e| Error::Manifest {
                line: e.line(),
                reason: e.to_string(),
            });
        }

        let mut set = Self::default();
        let mut section: Option<DeviceType> = None;

        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = Some(DeviceType::parse(name).ok_or_else(|| Error::Manifest {
                    line: number + 1,
                    reason: format!("unknown section [{}]", name.trim()),
                })?);
                continue;
            }

            match section {
                Some(DeviceType::Pc) => set.pc.push(line.to_string()),
                Some(DeviceType::Pe) => set.pe.push(line.to_string()),
                None => {
                    return Err(Error::Manifest {
                        line: number + 1,
                        reason: "entry before any [pc] or [pe] section".to_string(),
                    });
                }
            }
        }

        Ok(set)
    }

    /// Scan `<dir>/pc` and `<dir>/pe` for regular files.
    ///
    /// Entries are sorted by name so indices are stable between scans.
    /// A missing subdirectory yields an empty set for that device.
    pub fn from_directory(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("image directory {} does not exist", dir.display()),
            )));
        }

        Ok(Self {
            pc: list_files(&dir.join(DeviceType::Pc.as_str()))?,
            pe: list_files(&dir.join(DeviceType::Pe.as_str()))?,
        })
    }
}

fn list_files(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "image subdirectory missing, treating as empty");
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') {
                names.push(name.to_string());
            }
        }
    }

    names.sort();
    Ok(names)
}
