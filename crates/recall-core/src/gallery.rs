//! Named descriptor gallery with JSON file persistence.

use crate::types::{Candidate, Descriptor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const GALLERY_FORMAT_VERSION: u32 = 1;

/// Deduplicate `names`, keeping first-seen order.
pub fn distinct_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut distinct: Vec<String> = Vec::new();
    for name in names {
        if !distinct.iter().any(|n| n == name) {
            distinct.push(name.to_string());
        }
    }
    distinct
}

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("gallery file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("gallery i/o on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("gallery file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("unsupported gallery version {0}")]
    UnsupportedVersion(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub name: String,
    pub descriptor: Descriptor,
}

#[derive(Serialize, Deserialize)]
struct GalleryFile {
    version: u32,
    saved_at: DateTime<Utc>,
    entries: Vec<GalleryEntry>,
}

/// Ordered set of (descriptor, name) pairs. Names may repeat.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn add(&mut self, descriptor: Descriptor, name: &str) {
        self.entries.push(GalleryEntry {
            name: name.to_string(),
            descriptor,
        });
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|e| e.name.as_str())
    }

    /// Rename one entry. Returns false if `index` is out of range.
    pub fn rename(&mut self, index: usize, name: &str) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.name = name.to_string();
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Distinct names in first-seen order.
    pub fn distinct_names(&self) -> Vec<String> {
        distinct_names(self.entries.iter().map(|e| e.name.as_str()))
    }

    /// The `limit` most similar entries, best first. Ties keep gallery order.
    pub fn search(&self, probe: &Descriptor, limit: usize) -> Vec<Candidate> {
        let mut ranked: Vec<Candidate> = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, e)| Candidate {
                name: e.name.clone(),
                similarity: probe.similarity(&e.descriptor),
                index,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(limit);
        ranked
    }

    /// Read a gallery file, replacing nothing on failure.
    pub async fn load(path: &Path) -> Result<Self, GalleryError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GalleryError::NotFound(path.to_path_buf()))
            }
            Err(source) => {
                return Err(GalleryError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let file: GalleryFile = serde_json::from_slice(&bytes)?;
        if file.version != GALLERY_FORMAT_VERSION {
            return Err(GalleryError::UnsupportedVersion(file.version));
        }

        tracing::debug!(path = %path.display(), entries = file.entries.len(), "gallery read");
        Ok(Self {
            entries: file.entries,
        })
    }

    /// Write the gallery atomically (temp file + rename), creating parent directories.
    pub async fn save(&self, path: &Path) -> Result<(), GalleryError> {
        let io_err = |source: std::io::Error| GalleryError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let file = GalleryFile {
            version: GALLERY_FORMAT_VERSION,
            saved_at: Utc::now(),
            entries: self.entries.clone(),
        };
        let json = serde_json::to_vec(&file)?;

        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, &json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;

        tracing::debug!(path = %path.display(), entries = self.entries.len(), "gallery written");
        Ok(())
    }
}
