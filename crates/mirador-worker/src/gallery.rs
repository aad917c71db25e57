//! Bounded, disk-persisted gallery of enrolled faces.
//!
//! Owned and mutated exclusively by the recognition worker; any other
//! component wanting a view of the gallery goes through a channel message.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use mirador_core::{Embedding, StoredFace, Thumbnail};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("gallery io at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed gallery file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
    #[error("gallery encoding failed: {0}")]
    Encode(#[source] bincode::Error),
}

/// Insertion-ordered collection of enrolled faces, trimmed to a capacity on
/// every persist and flushed to a single binary file.
pub struct FaceGallery {
    path: PathBuf,
    capacity: usize,
    faces: Vec<StoredFace>,
    /// Size of the most recent registration batch. In-memory only: after a
    /// restart there is no batch to unregister.
    last_batch: usize,
}

impl FaceGallery {
    /// Load the gallery from `path`, or start empty when no file exists yet.
    ///
    /// An existing file that cannot be read or decoded is a startup error;
    /// it is never silently replaced.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Result<Self, GalleryError> {
        let path = path.into();

        let faces = if path.exists() {
            let bytes = fs::read(&path).map_err(|source| GalleryError::Io {
                path: path.clone(),
                source,
            })?;
            let faces: Vec<StoredFace> =
                bincode::deserialize(&bytes).map_err(|source| GalleryError::Corrupt {
                    path: path.clone(),
                    source,
                })?;
            tracing::info!(count = faces.len(), path = %path.display(), "gallery loaded");
            faces
        } else {
            tracing::info!(path = %path.display(), "no gallery file yet, starting empty");
            Vec::new()
        };

        Ok(Self {
            path,
            capacity,
            faces,
            last_batch: 0,
        })
    }

    pub fn faces(&self) -> &[StoredFace] {
        &self.faces
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Append one face stamped with the current time. Storage is untouched
    /// until the next [`persist`](Self::persist).
    pub fn append(&mut self, features: Embedding, image: Thumbnail) {
        self.faces.push(StoredFace {
            timestamp: Utc::now(),
            features,
            image,
        });
        self.last_batch = 1;
    }

    /// Append several faces as one registration batch and return the stored
    /// records. The whole batch can be undone by
    /// [`remove_most_recent`](Self::remove_most_recent).
    pub fn append_batch(&mut self, entries: Vec<(Embedding, Thumbnail)>) -> Vec<StoredFace> {
        let start = self.faces.len();
        for (features, image) in entries {
            self.faces.push(StoredFace {
                timestamp: Utc::now(),
                features,
                image,
            });
        }
        self.last_batch = self.faces.len() - start;
        self.faces[start..].to_vec()
    }

    /// Remove and return the most recently registered batch.
    ///
    /// Returns an empty vec when nothing has been registered since startup
    /// or since the previous unregistration.
    pub fn remove_most_recent(&mut self) -> Vec<StoredFace> {
        let n = self.last_batch.min(self.faces.len());
        self.last_batch = 0;

        let removed = self.faces.split_off(self.faces.len() - n);
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "unregistered most recent batch");
        }
        removed
    }

    /// Trim to the `capacity` newest entries (oldest discarded first), then
    /// atomically replace the backing file: write a temp file in the same
    /// directory and rename it over the target, so a concurrent reader never
    /// observes a partial write.
    pub fn persist(&mut self) -> Result<(), GalleryError> {
        if self.faces.len() > self.capacity {
            let excess = self.faces.len() - self.capacity;
            self.faces.drain(..excess);
            self.last_batch = self.last_batch.min(self.faces.len());
        }

        let bytes = bincode::serialize(&self.faces).map_err(GalleryError::Encode)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| GalleryError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &bytes).map_err(|source| GalleryError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| GalleryError::Io {
            path: self.path.clone(),
            source,
        })?;

        tracing::info!(count = self.faces.len(), path = %self.path.display(), "gallery persisted");
        Ok(())
    }
}
