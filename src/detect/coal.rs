// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Coal blockage ratio detector (§4.6).
//!
//! Unions every coal-class instance mask into one reusable scratch buffer
//! (no per-frame allocation once the camera's frame size stabilizes, per
//! the mask-union design note), intersects it with the coal ROI mask, and
//! expresses the overlap as an integer-popcount percentage. When
//! administratively disabled, the detector still advances its off-streak
//! every frame so a stale armed state decays to off instead of sticking.

use crate::detect::{edge_from, DetectionOutcome};
use crate::hysteresis::HysteresisState;
use crate::predict::Prediction;
use crate::roi::RoiMask;

#[derive(Debug, Clone)]
pub struct CoalDetectorConfig {
    pub coal_class_id: i32,
    pub ratio_threshold: f64,
    pub on_threshold: u32,
    pub off_threshold: u32,
    pub enabled: bool,
}

/// Hysteretic coal-blockage-ratio detector for one camera.
pub struct CoalDetector {
    config: CoalDetectorConfig,
    state: HysteresisState,
    /// Reusable union-mask scratch buffer, resized lazily to match the
    /// camera's current frame resolution.
    union_buf: Vec<u8>,
}

impl CoalDetector {
    pub fn new(config: CoalDetectorConfig) -> Self {
        Self { config, state: HysteresisState::new(), union_buf: Vec::new() }
    }

    pub fn armed(&self) -> bool {
        self.state.armed()
    }

    /// Feed one frame's prediction through the detector.
    pub fn update(&mut self, prediction: &Prediction, roi: &RoiMask) -> DetectionOutcome {
        if !self.config.enabled {
            let flipped = self.state.decay(self.config.off_threshold);
            return DetectionOutcome {
                armed: self.state.armed(),
                edge: edge_from(flipped, self.state.armed()),
                metric: 0.0,
            };
        }

        let ratio = self.coal_ratio(prediction, roi);
        let hit = ratio >= self.config.ratio_threshold;
        let flipped = self.state.update(hit, ratio, self.config.on_threshold, self.config.off_threshold);

        DetectionOutcome {
            armed: self.state.armed(),
            edge: edge_from(flipped, self.state.armed()),
            metric: ratio,
        }
    }

    /// `100 * popcount(coal_mask_union & roi_mask) / popcount(roi_mask)`,
    /// defined as 0 when the ROI has no area.
    fn coal_ratio(&mut self, prediction: &Prediction, roi: &RoiMask) -> f64 {
        if roi.area == 0 {
            return 0.0;
        }

        let size = (roi.width as usize) * (roi.height as usize);
        if self.union_buf.len() != size {
            self.union_buf = vec![0u8; size];
        } else {
            self.union_buf.iter_mut().for_each(|b| *b = 0);
        }

        for detection in &prediction.detections {
            if detection.class_id != self.config.coal_class_id {
                continue;
            }
            if let Some(mask) = &detection.mask {
                if mask.width == roi.width && mask.height == roi.height {
                    for (dst, src) in self.union_buf.iter_mut().zip(mask.data.iter()) {
                        if *src != 0 {
                            *dst = 1;
                        }
                    }
                }
            }
        }

        let overlap = roi.intersection_count(&self.union_buf);
        100.0 * overlap as f64 / roi.area as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::{BBox, Detection, InstanceMask};
    use crate::roi::{Roi, RoiMask};

    fn roi_mask(w: u32, h: u32) -> RoiMask {
        let roi = Roi::new(vec![(0, 0), (w as i32, 0), (w as i32, h as i32), (0, h as i32)]);
        RoiMask::rasterize(&roi, w, h)
    }

    fn coal_detection_covering(w: u32, h: u32, fraction_covered: f64) -> Detection {
        let total = (w as usize) * (h as usize);
        let covered = (total as f64 * fraction_covered / 100.0).round() as usize;
        let mut data = vec![0u8; total];
        for px in data.iter_mut().take(covered) {
            *px = 1;
        }
        Detection {
            class_id: 1,
            class_name: "coal".into(),
            confidence: 0.9,
            bbox: BBox { x0: 0, y0: 0, x1: w as i32 - 1, y1: h as i32 - 1 },
            mask: Some(InstanceMask { width: w, height: h, data }),
        }
    }

    #[test]
    fn ratio_crosses_threshold_per_scenario_two() {
        // distilled spec §8 scenario 2.
        let ratios = [70.0, 71.0, 73.0, 74.0, 75.0, 76.0, 77.0, 50.0, 50.0, 50.0, 50.0, 50.0];
        let mask = roi_mask(10, 10);
        let mut detector = CoalDetector::new(CoalDetectorConfig {
            coal_class_id: 1,
            ratio_threshold: 73.0,
            on_threshold: 5,
            off_threshold: 5,
            enabled: true,
        });

        let mut arm_index = None;
        let mut disarm_index = None;
        for (i, ratio) in ratios.iter().enumerate() {
            let detection = coal_detection_covering(10, 10, *ratio);
            let prediction = Prediction { detections: vec![detection] };
            let outcome = detector.update(&prediction, &mask);
            match outcome.edge {
                Some(crate::detect::Edge::Armed) => arm_index = Some(i),
                Some(crate::detect::Edge::Disarmed) => disarm_index = Some(i),
                None => {}
            }
        }

        assert_eq!(arm_index, Some(6)); // 5th consecutive >=73 (indices 2..=6)
        assert_eq!(disarm_index, Some(11)); // 5th consecutive <73 (indices 7..=11)
    }

    #[test]
    fn empty_roi_has_zero_ratio() {
        let empty = Roi::new(vec![(1, 1), (2, 2)]);
        let mask = RoiMask::rasterize(&empty, 10, 10);
        let mut detector = CoalDetector::new(CoalDetectorConfig {
            coal_class_id: 1,
            ratio_threshold: 73.0,
            on_threshold: 1,
            off_threshold: 1,
            enabled: true,
        });
        let detection = coal_detection_covering(10, 10, 100.0);
        let outcome = detector.update(&Prediction { detections: vec![detection] }, &mask);
        assert_eq!(outcome.metric, 0.0);
        assert!(!outcome.armed);
    }

    #[test]
    fn disabled_detector_decays_armed_state() {
        let mask = roi_mask(10, 10);
        let mut detector = CoalDetector::new(CoalDetectorConfig {
            coal_class_id: 1,
            ratio_threshold: 73.0,
            on_threshold: 1,
            off_threshold: 3,
            enabled: true,
        });
        let detection = coal_detection_covering(10, 10, 100.0);
        detector.update(&Prediction { detections: vec![detection] }, &mask);
        assert!(detector.armed());

        detector.config.enabled = false;
        for _ in 0..2 {
            let outcome = detector.update(&Prediction::default(), &mask);
            assert!(outcome.armed);
        }
        let outcome = detector.update(&Prediction::default(), &mask);
        assert!(!outcome.armed);
    }
}
