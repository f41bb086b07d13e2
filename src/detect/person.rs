// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Person-in-zone detector (§4.5).
//!
//! A detection counts as "in zone" if any person-class detection
//! intersects the person ROI mask: via its instance mask when the
//! predictor supplies one, otherwise via a bounding-box/mask intersection
//! test (the fallback exercised when a model returns boxes only).

use crate::detect::{edge_from, DetectionOutcome};
use crate::hysteresis::HysteresisState;
use crate::predict::Prediction;
use crate::roi::RoiMask;

#[derive(Debug, Clone)]
pub struct PersonDetectorConfig {
    pub person_class_id: i32,
    pub on_threshold: u32,
    pub off_threshold: u32,
}

/// Hysteretic person-in-zone detector for one camera.
pub struct PersonDetector {
    config: PersonDetectorConfig,
    state: HysteresisState,
}

impl PersonDetector {
    pub fn new(config: PersonDetectorConfig) -> Self {
        Self { config, state: HysteresisState::new() }
    }

    pub fn armed(&self) -> bool {
        self.state.armed()
    }

    /// Feed one frame's prediction through the detector.
    pub fn update(&mut self, prediction: &Prediction, roi: &RoiMask) -> DetectionOutcome {
        let in_zone = prediction
            .detections
            .iter()
            .filter(|d| d.class_id == self.config.person_class_id)
            .any(|d| match &d.mask {
                Some(mask) if mask.width == roi.width && mask.height == roi.height => {
                    roi.intersection_count(&mask.data) > 0
                }
                _ => roi.intersects_bbox(d.bbox.x0, d.bbox.y0, d.bbox.x1, d.bbox.y1),
            });

        let metric = if in_zone { 1.0 } else { 0.0 };
        let flipped = self.state.update(in_zone, metric, self.config.on_threshold, self.config.off_threshold);

        DetectionOutcome {
            armed: self.state.armed(),
            edge: edge_from(flipped, self.state.armed()),
            metric,
        }
    }
}
