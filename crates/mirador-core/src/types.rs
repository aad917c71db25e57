use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box for a detected face, in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

/// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
pub type Landmarks = [(f32, f32); 5];

/// Face embedding vector (fixed-length for a given model stack).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    /// Compute cosine similarity between two embeddings.
    ///
    /// Returns a value in [-1, 1]. Higher = more similar.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 { dot / denom } else { 0.0 }
    }
}

/// BGR pixel crop taken at detection time, kept for operator review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Normalized aligned face crop produced by the alignment stage, ready for
/// feature extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedCrop {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// A face enrolled in the gallery. Immutable once created; the gallery only
/// appends new entries or trims the oldest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFace {
    pub timestamp: DateTime<Utc>,
    pub features: Embedding,
    pub image: Thumbnail,
}

/// One gallery candidate for a probe face.
#[derive(Debug, Clone)]
pub struct FaceMatch {
    pub person: StoredFace,
    /// Cosine similarity in [-1, 1].
    pub score: f32,
}
