// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Shared pool of loaded models, serializing calls per model while letting
//! distinct models run concurrently.
//!
//! Mirrors the original `MultiModelLoader`: one model may be shared by
//! several cameras, but the underlying inference call is not safe to run
//! from two threads at once, so each model id gets its own lock. Two
//! cameras on two different models proceed in parallel; two cameras on the
//! same model queue behind each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::error::{Result, VisionError};
use crate::frame::Frame;
use crate::predict::{resolve_class_id, Prediction, Predictor};
use crate::stats::StatsCollector;

struct ModelEntry {
    model_id: String,
    predictor: Arc<dyn Predictor>,
    lock: Mutex<()>,
    person_class_id: i32,
    coal_class_id: i32,
}

/// Holds every loaded model and the camera -> model assignment, and runs
/// inference through the right model with the right per-model lock held.
pub struct PredictorPool {
    models: HashMap<String, ModelEntry>,
    camera_to_model: HashMap<String, String>,
    stats: Arc<StatsCollector>,
}

impl PredictorPool {
    pub fn new(stats: Arc<StatsCollector>) -> Self {
        Self {
            models: HashMap::new(),
            camera_to_model: HashMap::new(),
            stats,
        }
    }

    /// Register a loaded model under `model_id`, resolving its person and
    /// coal class ids up front (warning and falling back to positional ids
    /// 0/1 if no class name matches, rather than failing the whole load).
    pub fn register_model(&mut self, model_id: &str, predictor: Arc<dyn Predictor>) {
        let class_names = predictor.class_names();
        let person_class_id = resolve_class_id(class_names, &["person", "human"], 0);
        let coal_class_id = resolve_class_id(class_names, &["coal", "material", "blockage"], 1);

        self.models.insert(
            model_id.to_string(),
            ModelEntry {
                model_id: model_id.to_string(),
                predictor,
                lock: Mutex::new(()),
                person_class_id,
                coal_class_id,
            },
        );
    }

    /// Assign a camera to an already-registered model.
    pub fn assign_camera(&mut self, camera_id: &str, model_id: &str) -> Result<()> {
        if !self.models.contains_key(model_id) {
            return Err(VisionError::ModelLoad {
                model_id: model_id.to_string(),
                reason: "model not registered".into(),
            });
        }
        self.camera_to_model.insert(camera_id.to_string(), model_id.to_string());
        Ok(())
    }

    pub fn person_class_id(&self, camera_id: &str) -> Option<i32> {
        self.model_for_camera(camera_id).map(|m| m.person_class_id)
    }

    pub fn coal_class_id(&self, camera_id: &str) -> Option<i32> {
        self.model_for_camera(camera_id).map(|m| m.coal_class_id)
    }

    fn model_for_camera(&self, camera_id: &str) -> Option<&ModelEntry> {
        let model_id = self.camera_to_model.get(camera_id)?;
        self.models.get(model_id)
    }

    /// Run inference for `camera_id`'s assigned model, holding that model's
    /// lock for the duration of the call and reporting latency to the
    /// shared stats collector.
    pub fn predict(&self, camera_id: &str, frame: &Frame, confidence_threshold: f32) -> Result<Prediction> {
        let entry = self.model_for_camera(camera_id).ok_or_else(|| VisionError::CameraNotFound {
            id: camera_id.to_string(),
        })?;

        let _guard = entry.lock.lock();
        let started = Instant::now();
        let result = entry.predictor.predict(frame, confidence_threshold);
        let elapsed = started.elapsed();
        self.stats.record_inference(camera_id, elapsed);

        tracing::debug!(
            camera_id,
            model_id = %entry.model_id,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "inference complete"
        );

        result
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::mock::MockPredictor;

    #[test]
    fn resolves_class_ids_on_register() {
        let stats = Arc::new(StatsCollector::new());
        let mut pool = PredictorPool::new(stats);
        let predictor = Arc::new(MockPredictor::new(vec!["coal".into(), "person".into()]));
        pool.register_model("m1", predictor);
        pool.assign_camera("cam1", "m1").unwrap();
        assert_eq!(pool.person_class_id("cam1"), Some(1));
        assert_eq!(pool.coal_class_id("cam1"), Some(0));
    }

    #[test]
    fn unassigned_camera_errors() {
        let stats = Arc::new(StatsCollector::new());
        let pool = PredictorPool::new(stats);
        let frame = Frame::new(4, 4, vec![0; 48]);
        assert!(pool.predict("cam1", &frame, 0.5).is_err());
    }

    #[test]
    fn assigning_to_unregistered_model_errors() {
        let stats = Arc::new(StatsCollector::new());
        let mut pool = PredictorPool::new(stats);
        assert!(pool.assign_camera("cam1", "missing").is_err());
    }
}
