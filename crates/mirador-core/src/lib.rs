//! mirador-core — Domain types for the live face-recognition pipeline.
//!
//! Carries the camera frame and per-detection working entities, the gallery
//! record types, and the model-stack capability the recognition worker
//! drives. Detection, alignment, and feature extraction themselves live
//! behind the [`ModelStack`] trait and are supplied by the host.

pub mod face;
pub mod frame;
pub mod models;
pub mod types;

pub use face::Face;
pub use frame::Frame;
pub use models::{ModelError, ModelFactory, ModelStack};
pub use types::{AlignedCrop, BoundingBox, Embedding, FaceMatch, Landmarks, StoredFace, Thumbnail};
