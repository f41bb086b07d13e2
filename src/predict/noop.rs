// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! A [`Predictor`] that never detects anything.
//!
//! No concrete inference engine ships with this crate (§1 out of scope).
//! `NoopPredictor` lets `coalwatch` start and run its full capture/detect/
//! actuate loop without one plugged in, which is useful for bringing up a
//! new deployment's cameras/PLC wiring before an ML backend is attached.
//! Production builds register a real [`Predictor`] per model instead.

use crate::error::Result;
use crate::frame::Frame;
use crate::predict::{Prediction, Predictor};

pub struct NoopPredictor {
    class_names: Vec<String>,
}

impl NoopPredictor {
    pub fn new() -> Self {
        Self { class_names: vec!["person".to_string(), "coal".to_string()] }
    }
}

impl Default for NoopPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for NoopPredictor {
    fn predict(&self, _frame: &Frame, _confidence_threshold: f32) -> Result<Prediction> {
        Ok(Prediction::default())
    }

    fn class_names(&self) -> &[String] {
        &self.class_names
    }
}
