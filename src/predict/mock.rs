// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! A deterministic [`Predictor`] for tests: returns whatever detections are
//! queued, in order, one set per call.

use parking_lot::Mutex;

use crate::error::Result;
use crate::frame::Frame;
use crate::predict::{Detection, Prediction, Predictor};

pub struct MockPredictor {
    class_names: Vec<String>,
    queued: Mutex<std::collections::VecDeque<Vec<Detection>>>,
}

impl MockPredictor {
    pub fn new(class_names: Vec<String>) -> Self {
        Self {
            class_names,
            queued: Mutex::new(std::collections::VecDeque::new()),
        }
    }

    /// Queue the detections to return on the next `predict` call. Once the
    /// queue is empty, `predict` returns an empty prediction.
    pub fn push(&self, detections: Vec<Detection>) {
        self.queued.lock().push_back(detections);
    }
}

impl Predictor for MockPredictor {
    fn predict(&self, _frame: &Frame, confidence_threshold: f32) -> Result<Prediction> {
        let detections = self.queued.lock().pop_front().unwrap_or_default();
        let detections = detections
            .into_iter()
            .filter(|d| d.confidence >= confidence_threshold)
            .collect();
        Ok(Prediction { detections })
    }

    fn class_names(&self) -> &[String] {
        &self.class_names
    }
}
