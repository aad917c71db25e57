//! Model-stack capability consumed by the recognition worker.
//!
//! Detection, landmarking, alignment, and feature extraction are provided
//! by an external model stack; the worker drives them through this trait
//! and never loads models itself.

use std::cmp::Ordering;

use thiserror::Error;

use crate::types::{AlignedCrop, BoundingBox, Embedding, FaceMatch, Landmarks, StoredFace};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model load failed: {0}")]
    LoadFailed(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("model returned {got} embeddings for {expected} crops")]
    BatchMismatch { expected: usize, got: usize },
}

/// The full stack of face models the recognition pipeline drives.
///
/// Image buffers are packed RGB (`width * height * 3` bytes). The
/// `extract_features` call is batched: one invocation per frame, embeddings
/// returned in the order the crops were submitted.
pub trait ModelStack: Send {
    fn detect_faces(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<BoundingBox>, ModelError>;

    fn find_landmarks(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
        face: &BoundingBox,
    ) -> Result<Landmarks, ModelError>;

    fn crop_aligned(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
        landmarks: &Landmarks,
    ) -> Result<AlignedCrop, ModelError>;

    fn extract_features(&mut self, crops: &[AlignedCrop]) -> Result<Vec<Embedding>, ModelError>;

    /// Rank every gallery entry against the probe, best first.
    ///
    /// The default ranks by cosine similarity; the stable sort keeps gallery
    /// insertion order for tied scores, earliest entry first.
    fn match_faces(&self, probe: &Embedding, gallery: &[StoredFace]) -> Vec<FaceMatch> {
        let mut matches: Vec<FaceMatch> = gallery
            .iter()
            .map(|person| FaceMatch {
                score: probe.similarity(&person.features),
                person: person.clone(),
            })
            .collect();
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        matches
    }
}

/// Deferred model-stack constructor, invoked on the worker thread at first
/// use so process startup stays cheap.
pub type ModelFactory = Box<dyn FnMut() -> Result<Box<dyn ModelStack>, ModelError> + Send>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::types::Thumbnail;

    /// Stack that only exercises the default `match_faces`.
    struct RankOnly;

    impl ModelStack for RankOnly {
        fn detect_faces(
            &mut self,
            _rgb: &[u8],
            _width: u32,
            _height: u32,
        ) -> Result<Vec<BoundingBox>, ModelError> {
            unimplemented!()
        }

        fn find_landmarks(
            &mut self,
            _rgb: &[u8],
            _width: u32,
            _height: u32,
            _face: &BoundingBox,
        ) -> Result<Landmarks, ModelError> {
            unimplemented!()
        }

        fn crop_aligned(
            &mut self,
            _rgb: &[u8],
            _width: u32,
            _height: u32,
            _landmarks: &Landmarks,
        ) -> Result<AlignedCrop, ModelError> {
            unimplemented!()
        }

        fn extract_features(
            &mut self,
            _crops: &[AlignedCrop],
        ) -> Result<Vec<Embedding>, ModelError> {
            unimplemented!()
        }
    }

    fn stored(values: Vec<f32>) -> StoredFace {
        StoredFace {
            timestamp: Utc::now(),
            features: Embedding { values },
            image: Thumbnail {
                data: Vec::new(),
                width: 0,
                height: 0,
            },
        }
    }

    #[test]
    fn test_match_faces_descending_scores() {
        let probe = Embedding {
            values: vec![1.0, 0.0],
        };
        let gallery = vec![
            stored(vec![0.0, 1.0]),  // orthogonal
            stored(vec![1.0, 0.0]),  // identical
            stored(vec![1.0, 1.0]),  // in between
        ];

        let matches = RankOnly.match_faces(&probe, &gallery);
        assert_eq!(matches.len(), 3);
        assert!((matches[0].score - 1.0).abs() < 1e-6);
        assert!(matches[0].score >= matches[1].score);
        assert!(matches[1].score >= matches[2].score);
    }

    #[test]
    fn test_match_faces_ties_keep_insertion_order() {
        let probe = Embedding {
            values: vec![1.0, 0.0],
        };
        let first = stored(vec![2.0, 0.0]); // same direction as probe
        let second = stored(vec![3.0, 0.0]); // same direction, later entry
        let gallery = vec![first.clone(), second.clone()];

        let matches = RankOnly.match_faces(&probe, &gallery);
        assert_eq!(matches[0].person, first);
        assert_eq!(matches[1].person, second);
    }

    #[test]
    fn test_match_faces_empty_gallery() {
        let probe = Embedding {
            values: vec![1.0, 0.0],
        };
        assert!(RankOnly.match_faces(&probe, &[]).is_empty());
    }
}
