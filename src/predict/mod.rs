// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Inference model boundary.
//!
//! The actual inference engine (model format, GPU/CPU placement, batching)
//! is out of scope for this crate; `Predictor` is the narrow trait the rest
//! of the pipeline depends on so any engine can be plugged in behind it.

pub mod mock;
pub mod noop;
pub mod pool;

use crate::error::Result;
use crate::frame::Frame;

/// An axis-aligned bounding box in frame-pixel coordinates.
#[derive(Debug, Clone, Copy)]
pub struct BBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

/// A single instance-segmentation mask, same dimensions as the source
/// frame, one byte per pixel (nonzero = covered).
#[derive(Debug, Clone)]
pub struct InstanceMask {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// One detected object.
#[derive(Debug, Clone)]
pub struct Detection {
    pub class_id: i32,
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BBox,
    /// Present when the model produces instance segmentation masks, absent
    /// for bounding-box-only models (callers fall back to bbox/ROI
    /// intersection in that case).
    pub mask: Option<InstanceMask>,
}

/// The full result of running one frame through a model.
#[derive(Debug, Clone, Default)]
pub struct Prediction {
    pub detections: Vec<Detection>,
}

/// A loaded inference model. Implementations are expected to be `Send +
/// Sync`; the pool serializes calls to a given model with its own lock so
/// implementations don't need to be internally thread-safe for concurrent
/// calls, only safe to call from different threads sequentially.
pub trait Predictor: Send + Sync {
    /// Run inference on `frame`, returning only detections at or above
    /// `confidence_threshold`.
    fn predict(&self, frame: &Frame, confidence_threshold: f32) -> Result<Prediction>;

    /// The model's class id -> name table, used to resolve which class ids
    /// correspond to "person" and "coal" at load time.
    fn class_names(&self) -> &[String];
}

/// Resolve the class id for `target`, falling back to `fallback` and
/// logging a warning when no class name loosely matches. Mirrors
/// `_find_class_id` from the original model loader: a case-insensitive
/// substring match against any of `candidates`.
pub fn resolve_class_id(class_names: &[String], candidates: &[&str], fallback: i32) -> i32 {
    for (id, name) in class_names.iter().enumerate() {
        let lower = name.to_lowercase();
        if candidates.iter().any(|c| lower.contains(&c.to_lowercase())) {
            return id as i32;
        }
    }
    tracing::warn!(
        candidates = ?candidates,
        fallback,
        "no class name matched, falling back to positional class id"
    );
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_matching_class_name() {
        let names = vec!["coal".to_string(), "person".to_string()];
        assert_eq!(resolve_class_id(&names, &["person"], 0), 1);
        assert_eq!(resolve_class_id(&names, &["coal", "material"], 1), 0);
    }

    #[test]
    fn falls_back_when_nothing_matches() {
        let names = vec!["cat".to_string(), "dog".to_string()];
        assert_eq!(resolve_class_id(&names, &["person"], 0), 0);
    }
}
