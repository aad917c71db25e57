use crate::types::{AlignedCrop, BoundingBox, Embedding, FaceMatch, Landmarks, Thumbnail};

/// Per-detection working entity, filled in as it advances through the
/// recognition stages.
///
/// Detection sets the box and thumbnail; alignment adds landmarks and the
/// normalized crop; extraction adds the embedding; matching adds the ranked
/// gallery candidates. A face whose alignment failed keeps `None` stage
/// fields and is excluded from the later stages.
#[derive(Debug, Clone)]
pub struct Face {
    pub bounding_box: BoundingBox,
    pub thumbnail: Thumbnail,
    pub landmarks: Option<Landmarks>,
    pub crop: Option<AlignedCrop>,
    pub features: Option<Embedding>,
    pub matches: Vec<FaceMatch>,
}

impl Face {
    pub fn new(bounding_box: BoundingBox, thumbnail: Thumbnail) -> Self {
        Self {
            bounding_box,
            thumbnail,
            landmarks: None,
            crop: None,
            features: None,
            matches: Vec::new(),
        }
    }

    /// Whether the alignment stage produced a usable crop.
    pub fn is_aligned(&self) -> bool {
        self.crop.is_some()
    }
}
