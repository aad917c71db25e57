//! Camera frame type and pixel helpers — BGR/RGB conversion and patch cropping.

use crate::types::{BoundingBox, Thumbnail};

const CHANNELS: usize = 3;

/// A BGR camera frame submitted for recognition.
///
/// The capture source delivers BGR; the pipeline keeps the BGR copy for
/// thumbnail crops and derives an RGB copy for model inference.
#[derive(Clone)]
pub struct Frame {
    /// Packed BGR pixel data (width * height * 3 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Wrapping per-source frame counter.
    pub sequence: u32,
}

impl Frame {
    /// Derive the RGB copy used for model inference.
    pub fn to_rgb(&self) -> Result<Vec<u8>, FrameError> {
        bgr_to_rgb(&self.data, self.width, self.height)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid BGR length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Convert packed BGR to RGB by swapping the blue and red channels.
pub fn bgr_to_rgb(bgr: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = width as usize * height as usize * CHANNELS;
    if bgr.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: bgr.len(),
        });
    }

    let mut rgb = Vec::with_capacity(expected);
    for px in bgr[..expected].chunks_exact(CHANNELS) {
        rgb.extend_from_slice(&[px[2], px[1], px[0]]);
    }
    Ok(rgb)
}

/// Crop the face region from a BGR frame.
///
/// The box is clamped to the frame bounds; a box entirely outside the frame
/// yields an empty thumbnail.
pub fn crop_patch(bgr: &[u8], width: u32, height: u32, bbox: &BoundingBox) -> Thumbnail {
    let w = width as usize;
    let h = height as usize;

    let x0 = (bbox.x.max(0.0) as usize).min(w);
    let y0 = (bbox.y.max(0.0) as usize).min(h);
    let x1 = ((bbox.x + bbox.width).ceil().max(0.0) as usize).min(w);
    let y1 = ((bbox.y + bbox.height).ceil().max(0.0) as usize).min(h);

    if x1 <= x0 || y1 <= y0 {
        return Thumbnail {
            data: Vec::new(),
            width: 0,
            height: 0,
        };
    }

    let mut data = Vec::with_capacity((x1 - x0) * (y1 - y0) * CHANNELS);
    for y in y0..y1 {
        let start = (y * w + x0) * CHANNELS;
        let end = (y * w + x1) * CHANNELS;
        data.extend_from_slice(&bgr[start..end]);
    }

    Thumbnail {
        data,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
    }
}
