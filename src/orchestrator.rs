// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Orchestrator (§4.9): validates configuration, loads models into the
//! Predictor Pool with per-model failure isolation, starts one Camera
//! Supervisor per enabled camera, and tears everything down on `shutdown`.
//!
//! Constructed the same way the teacher's `RecordingManager::new(config)`
//! is: one fallible constructor that does all the startup work and hands
//! back a ready-to-run handle, rather than a separate `start()` step.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::capture::gst_source::GstVideoSource;
use crate::capture::VideoSource;
use crate::config::Config;
use crate::error::{Result, VisionError};
use crate::persistence::event_log::EventLog;
use crate::persistence::snapshot::{PpmEncoder, SnapshotWriter};
use crate::plc::transport::PlcTransport;
use crate::plc::PlcLinkId;
use crate::predict::pool::PredictorPool;
use crate::predict::Predictor;
use crate::stats::StatsCollector;
use crate::supervisor::{self, CameraSupervisorHandle, SupervisorDeps, SupervisorState};

const STOP_DEADLINE: Duration = Duration::from_secs(2);
const DEFAULT_THROTTLE_WINDOW: Duration = Duration::from_secs(5);

/// Loads a concrete model given a path, returning a boxed [`Predictor`].
/// No concrete inference engine is vendored in this crate (§1); production
/// builds plug in a real loader, tests use a stub that always succeeds or
/// is scripted to fail for a given path.
pub trait ModelLoader: Send + Sync {
    fn load(&self, path: &str) -> Result<Arc<dyn Predictor>>;
}

/// Builds a [`PlcTransport`] for a given link identity. No concrete S7
/// client is vendored (§1, §6); production builds plug in a real one.
pub trait PlcTransportFactory: Send + Sync {
    fn build(&self, link_id: PlcLinkId) -> Box<dyn PlcTransport>;
}

/// Aggregated view of every running camera's state and stats, for the
/// `--headless` status line.
#[derive(Debug, Clone)]
pub struct OrchestratorStatus {
    pub cameras_running: usize,
    pub cameras_total: usize,
    pub total_inferences_per_sec: f64,
    pub cpu_usage_percent: f32,
    pub used_memory_mb: u64,
}

/// Owns every running Camera Supervisor, the shared Predictor Pool, and the
/// shared persistence sinks for one configuration.
pub struct Orchestrator {
    config: Config,
    supervisors: HashMap<String, CameraSupervisorHandle>,
    predictor_pool: Arc<PredictorPool>,
    stats: Arc<StatsCollector>,
}

impl Orchestrator {
    /// Validate `config`, load every distinct model (isolating per-model
    /// failures rather than aborting the whole startup), and start one
    /// Camera Supervisor per enabled camera.
    pub fn new(
        config: Config,
        model_loader: &dyn ModelLoader,
        video_source_factory: impl Fn(&str) -> Box<dyn VideoSource>,
        plc_transport_factory: &dyn PlcTransportFactory,
    ) -> Result<Self> {
        config.validate()?;

        let stats = Arc::new(StatsCollector::new());
        let mut pool = PredictorPool::new(stats.clone());

        let mut loaded_any = false;
        for path in config.all_model_paths() {
            match model_loader.load(&path) {
                Ok(predictor) => {
                    pool.register_model(&path, predictor);
                    loaded_any = true;
                }
                Err(e) => {
                    error!(model_path = %path, error = %e, "failed to load model, cameras assigned to it will be skipped");
                }
            }
        }
        if !loaded_any {
            return Err(VisionError::ModelLoad { model_id: "*".to_string(), reason: "no model loaded successfully".to_string() });
        }

        for camera in &config.cameras {
            if !camera.enabled {
                continue;
            }
            let model_path = config.model_path_for_camera(camera.camera_number);
            if let Err(e) = pool.assign_camera(&camera.camera_id, &model_path) {
                warn!(camera_id = %camera.camera_id, error = %e, "camera's model not loaded, camera will not start");
            }
        }

        let predictor_pool = Arc::new(pool);
        let event_log = Arc::new(EventLog::new(&config.logs_dir, DEFAULT_THROTTLE_WINDOW));
        let snapshot_writer = Arc::new(SnapshotWriter::new(
            &config.artifacts_dir,
            Box::new(PpmEncoder),
            DEFAULT_THROTTLE_WINDOW,
        ));

        let mut supervisors = HashMap::new();
        for camera in &config.cameras {
            if !camera.enabled {
                continue;
            }
            if predictor_pool.person_class_id(&camera.camera_id).is_none() {
                continue;
            }

            let video_source = video_source_factory(camera.video_source());
            let link_id = PlcLinkId { host: camera.plc.ip.clone(), port: camera.plc.port, rack: camera.plc.rack, slot: camera.plc.slot };
            let transport = plc_transport_factory.build(link_id);

            let deps = SupervisorDeps {
                predictor_pool: predictor_pool.clone(),
                event_log: event_log.clone(),
                snapshot_writer: snapshot_writer.clone(),
                stats: stats.clone(),
            };

            match supervisor::start(camera.clone(), video_source, transport, deps) {
                Ok(handle) => {
                    info!(camera_id = %camera.camera_id, "camera supervisor running");
                    supervisors.insert(camera.camera_id.clone(), handle);
                }
                Err(e) => {
                    error!(camera_id = %camera.camera_id, error = %e, "failed to start camera supervisor");
                }
            }
        }

        Ok(Self { config, supervisors, predictor_pool, stats })
    }

    /// Convenience constructor wiring in the production collaborators:
    /// GStreamer capture and (for now) no PLC transport factory provided by
    /// the caller is required explicitly, since no concrete S7 client ships
    /// with this crate.
    pub fn new_with_gstreamer(
        config: Config,
        model_loader: &dyn ModelLoader,
        plc_transport_factory: &dyn PlcTransportFactory,
    ) -> Result<Self> {
        Self::new(
            config,
            model_loader,
            |source| Box::new(GstVideoSource::new(source)) as Box<dyn VideoSource>,
            plc_transport_factory,
        )
    }

    pub fn status(&self) -> OrchestratorStatus {
        self.stats.refresh_system(Duration::from_secs(5));
        let system = self.stats.system_snapshot();

        let cameras_running = self
            .supervisors
            .values()
            .filter(|h| h.state() == SupervisorState::Running)
            .count();

        let total_inferences_per_sec: f64 = self
            .stats
            .all_camera_ids()
            .iter()
            .filter_map(|id| self.stats.snapshot(id))
            .map(|s| s.inference_fps)
            .sum();

        OrchestratorStatus {
            cameras_running,
            cameras_total: self.config.cameras.iter().filter(|c| c.enabled).count(),
            total_inferences_per_sec,
            cpu_usage_percent: system.cpu_usage_percent,
            used_memory_mb: system.used_memory_mb,
        }
    }

    pub fn camera_ids(&self) -> Vec<String> {
        self.supervisors.keys().cloned().collect()
    }

    pub fn model_count(&self) -> usize {
        self.predictor_pool.model_count()
    }

    /// Stop every supervisor in parallel, each bounded by a 2 s deadline,
    /// then release the predictor pool. Consumes `self` (the teacher's
    /// `RecordingManager::shutdown(self)` pattern) so shutdown cannot be
    /// invoked twice by construction.
    pub async fn shutdown(self) {
        let stops = self.supervisors.into_values().map(|handle| handle.stop(STOP_DEADLINE));
        futures_join_all(stops).await;
        info!("orchestrator shutdown complete");
    }
}

/// Small local stand-in for `futures::future::join_all` so this crate
/// doesn't need to add the `futures` dependency for a single call site;
/// `tokio::task::JoinSet` gives the same "run concurrently, wait for all"
/// behavior the teacher's multi-worker shutdown paths use elsewhere.
async fn futures_join_all<F: std::future::Future<Output = ()>>(futs: impl Iterator<Item = F>) {
    let mut set = tokio::task::JoinSet::new();
    for fut in futs {
        set.spawn(fut);
    }
    while set.join_next().await.is_some() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::mock::{MockVideoSource, ReadOutcome};
    use crate::config::Config;
    use crate::plc::transport::SharedMockTransport;
    use crate::predict::mock::MockPredictor;

    struct StubLoader;
    impl ModelLoader for StubLoader {
        fn load(&self, _path: &str) -> Result<Arc<dyn Predictor>> {
            Ok(Arc::new(MockPredictor::new(vec!["person".into(), "coal".into()])))
        }
    }

    struct FailingLoader;
    impl ModelLoader for FailingLoader {
        fn load(&self, path: &str) -> Result<Arc<dyn Predictor>> {
            Err(VisionError::ModelLoad { model_id: path.to_string(), reason: "stub failure".into() })
        }
    }

    struct StubPlcFactory;
    impl PlcTransportFactory for StubPlcFactory {
        fn build(&self, link_id: PlcLinkId) -> Box<dyn PlcTransport> {
            Box::new(SharedMockTransport::new(link_id))
        }
    }

    fn video_source_factory(_source: &str) -> Box<dyn VideoSource> {
        Box::new(MockVideoSource::new().push_read(ReadOutcome::Frame(4, 4, vec![0; 48])))
    }

    #[tokio::test]
    async fn starts_one_supervisor_per_enabled_camera() {
        let config = Config::sample(2);
        let orchestrator = Orchestrator::new(config, &StubLoader, video_source_factory, &StubPlcFactory).unwrap();
        assert_eq!(orchestrator.camera_ids().len(), 2);
        assert_eq!(orchestrator.model_count(), 1);
        orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn model_load_failure_skips_dependent_cameras_but_does_not_fail_startup() {
        let config = Config::sample(1);
        let result = Orchestrator::new(config, &FailingLoader, video_source_factory, &StubPlcFactory);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn status_reports_running_cameras() {
        let config = Config::sample(1);
        let orchestrator = Orchestrator::new(config, &StubLoader, video_source_factory, &StubPlcFactory).unwrap();
        let status = orchestrator.status();
        assert_eq!(status.cameras_total, 1);
        assert_eq!(status.cameras_running, 1);
        orchestrator.shutdown().await;
    }
}
