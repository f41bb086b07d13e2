// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Camera Supervisor (§4.8): owns one camera's capture task and detection
//! task, wiring the Predictor Pool, both hysteresis detectors, the Alarm
//! Actuator, and the persistence sinks together for a single camera.
//!
//! Mirrors the teacher's per-camera worker split (`CameraWorker` driving
//! capture while a separate consumer processes segments): here the capture
//! task only decodes and publishes frames, while the detection task is the
//! one that actually looks at them, at its own slower cadence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::capture::{CaptureConfig, CaptureWorker, VideoSource};
use crate::config::CameraConfig;
use crate::detect::coal::{CoalDetector, CoalDetectorConfig};
use crate::detect::person::{PersonDetector, PersonDetectorConfig};
use crate::detect::Edge;
use crate::error::Result;
use crate::frame::{HandoffQueue, LatestSlot};
use crate::persistence::event_log::{AlertLogEntry, EventLog, Severity};
use crate::persistence::snapshot::SnapshotWriter;
use crate::plc::actuator::AlarmActuator;
use crate::plc::transport::PlcTransport;
use crate::plc::{AlarmAddress, AlarmKind};
use crate::predict::pool::PredictorPool;
use crate::roi::RoiMaskCache;
use crate::stats::StatsCollector;

/// How often the detection task looks at the newest available frame.
const DETECTION_PERIOD: Duration = Duration::from_millis(500);
/// Non-blocking suspension granularity while waiting for a frame (§5).
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const HANDOFF_CAPACITY: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Error,
}

/// Shared collaborators a supervisor needs beyond its own camera config:
/// one predictor pool and one pair of persistence sinks per process, handed
/// to every supervisor the orchestrator starts.
pub struct SupervisorDeps {
    pub predictor_pool: Arc<PredictorPool>,
    pub event_log: Arc<EventLog>,
    pub snapshot_writer: Arc<SnapshotWriter>,
    pub stats: Arc<StatsCollector>,
}

/// A running camera supervisor: capture task, detection task, and the
/// shared state the orchestrator polls/stops through.
pub struct CameraSupervisorHandle {
    camera_id: String,
    stop: Arc<AtomicBool>,
    state: Arc<Mutex<SupervisorState>>,
    capture_task: JoinHandle<()>,
    detect_task: JoinHandle<()>,
}

impl CameraSupervisorHandle {
    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.lock()
    }

    /// Signal both tasks to stop and wait up to `deadline` for a clean
    /// exit; forces an abort past the deadline rather than blocking
    /// shutdown on a wedged task (§5 cancellation).
    pub async fn stop(self, deadline: Duration) {
        *self.state.lock() = SupervisorState::Stopping;
        self.stop.store(true, Ordering::Relaxed);

        let capture_abort = self.capture_task.abort_handle();
        let detect_abort = self.detect_task.abort_handle();
        let camera_id = self.camera_id.clone();

        let joined = tokio::time::timeout(deadline, async move {
            let _ = self.capture_task.await;
            let _ = self.detect_task.await;
        })
        .await;

        if joined.is_err() {
            warn!(camera_id = %camera_id, "stop deadline exceeded, aborting capture/detection tasks");
            capture_abort.abort();
            detect_abort.abort();
        }

        *self.state.lock() = SupervisorState::Stopped;
    }
}

/// Start capture and detection tasks for one camera. Fails only if the PLC
/// link cannot be connected up front; per-frame errors thereafter are
/// handled locally and never tear the supervisor down (§7).
pub fn start(
    camera: CameraConfig,
    video_source: Box<dyn VideoSource>,
    plc_transport: Box<dyn PlcTransport>,
    deps: SupervisorDeps,
) -> Result<CameraSupervisorHandle> {
    let state = Arc::new(Mutex::new(SupervisorState::Starting));
    let stop = Arc::new(AtomicBool::new(false));

    let latest_slot = Arc::new(LatestSlot::new());
    let handoff_queue = Arc::new(HandoffQueue::new(HANDOFF_CAPACITY));

    let person_address = AlarmAddress {
        data_block: camera.plc.db_number,
        byte_offset: camera.plc.person_alarm_byte,
        bit_offset: camera.plc.person_alarm_bit,
    };
    let coal_address = AlarmAddress {
        data_block: camera.plc.db_number,
        byte_offset: camera.plc.coal_alarm_byte,
        bit_offset: camera.plc.coal_alarm_bit,
    };
    let mut actuator = AlarmActuator::new(plc_transport, person_address, coal_address);
    if camera.plc.enabled {
        actuator.connect()?;
    }

    let person_class_id = deps.predictor_pool.person_class_id(&camera.camera_id).unwrap_or(0);
    let coal_class_id = deps.predictor_pool.coal_class_id(&camera.camera_id).unwrap_or(1);

    let mut roi_cache = RoiMaskCache::new(camera.roi.reference_resolution);
    roi_cache.set_definition("person", camera.roi.roi_person.clone());
    roi_cache.set_definition("coal", camera.roi.roi_coal.clone());

    let person_detector = PersonDetector::new(PersonDetectorConfig {
        person_class_id,
        on_threshold: camera.detection.person_consecutive_threshold,
        off_threshold: camera.detection.person_no_detection_threshold,
    });
    let coal_detector = CoalDetector::new(CoalDetectorConfig {
        coal_class_id,
        ratio_threshold: camera.detection.coal_ratio_threshold,
        on_threshold: camera.detection.coal_consecutive_threshold,
        off_threshold: camera.detection.coal_no_blockage_threshold,
        enabled: camera.detection.coal_detection_enabled,
    });

    let capture_config = CaptureConfig {
        camera_id: camera.camera_id.clone(),
        source: camera.video_source().to_string(),
        target_fps: camera.target_fps,
        grab_skip_enabled: true,
    };

    let capture_worker = CaptureWorker::new(
        capture_config,
        video_source,
        latest_slot.clone(),
        handoff_queue.clone(),
        deps.stats.clone(),
        stop.clone(),
    );

    let capture_task = {
        let mut worker = capture_worker;
        tokio::spawn(async move {
            worker.run().await;
        })
    };

    let detect_task = {
        let ctx = DetectionContext {
            camera_id: camera.camera_id.clone(),
            camera_ip: plc_host_as_camera_ip(&camera),
            location: camera.name.clone(),
            person_detection_enabled: camera.detection.person_detection_enabled,
            confidence_threshold: camera.detection.confidence_threshold,
            handoff_queue,
            latest_slot,
            predictor_pool: deps.predictor_pool,
            roi_cache,
            person_detector,
            coal_detector,
            actuator,
            event_log: deps.event_log,
            snapshot_writer: deps.snapshot_writer,
            stats: deps.stats,
            stop: stop.clone(),
            state: state.clone(),
        };
        tokio::spawn(detection_loop(ctx))
    };

    *state.lock() = SupervisorState::Running;
    info!(camera_id = %camera.camera_id, "camera supervisor started");
    deps.event_log.record(
        &AlertLogEntry {
            alert_type: "system".to_string(),
            camera_id: camera.camera_id.clone(),
            severity: Severity::Info,
            description: "camera supervisor started".to_string(),
            location: camera.name.clone(),
            camera_ip: camera.plc.ip.clone(),
            action_taken: "none".to_string(),
            extras: std::collections::BTreeMap::new(),
        },
        true,
    );

    Ok(CameraSupervisorHandle {
        camera_id: camera.camera_id,
        stop,
        state,
        capture_task,
        detect_task,
    })
}

fn plc_host_as_camera_ip(camera: &CameraConfig) -> String {
    camera.plc.ip.clone()
}

struct DetectionContext {
    camera_id: String,
    camera_ip: String,
    location: String,
    person_detection_enabled: bool,
    confidence_threshold: f32,
    handoff_queue: Arc<HandoffQueue>,
    latest_slot: Arc<LatestSlot>,
    predictor_pool: Arc<PredictorPool>,
    roi_cache: RoiMaskCache,
    person_detector: PersonDetector,
    coal_detector: CoalDetector,
    actuator: AlarmActuator,
    event_log: Arc<EventLog>,
    snapshot_writer: Arc<SnapshotWriter>,
    stats: Arc<StatsCollector>,
    stop: Arc<AtomicBool>,
    state: Arc<Mutex<SupervisorState>>,
}

async fn detection_loop(mut ctx: DetectionContext) {
    while !ctx.stop.load(Ordering::Relaxed) {
        let cycle_start = tokio::time::Instant::now();

        let frame = wait_for_frame(&ctx).await;
        if let Some(frame) = frame {
            run_detection_cycle(&mut ctx, frame);
        }

        if ctx.stop.load(Ordering::Relaxed) {
            break;
        }
        let elapsed = cycle_start.elapsed();
        if elapsed < DETECTION_PERIOD {
            tokio::time::sleep(DETECTION_PERIOD - elapsed).await;
        }
    }

    ctx.actuator.shutdown();
    ctx.event_log.record(
        &AlertLogEntry {
            alert_type: "system".to_string(),
            camera_id: ctx.camera_id.clone(),
            severity: Severity::Info,
            description: "camera supervisor stopped".to_string(),
            location: ctx.location.clone(),
            camera_ip: ctx.camera_ip.clone(),
            action_taken: "alarm bits cleared".to_string(),
            extras: std::collections::BTreeMap::new(),
        },
        true,
    );
    *ctx.state.lock() = SupervisorState::Stopped;
    info!(camera_id = %ctx.camera_id, "detection task stopped");
}

/// Poll the handoff queue for up to one detection period, in `POLL_INTERVAL`
/// steps, falling back to a plain peek at the latest slot if the handoff
/// queue never produced anything this cycle (so a very slow capture rate
/// still gets looked at once per period instead of being starved).
async fn wait_for_frame(ctx: &DetectionContext) -> Option<crate::frame::Frame> {
    let deadline = tokio::time::Instant::now() + DETECTION_PERIOD;
    loop {
        if let Some(frame) = ctx.handoff_queue.drain_to_latest() {
            return Some(frame);
        }
        if ctx.stop.load(Ordering::Relaxed) || tokio::time::Instant::now() >= deadline {
            return ctx.latest_slot.peek_copy();
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn run_detection_cycle(ctx: &mut DetectionContext, frame: crate::frame::Frame) {
    let prediction = match ctx.predictor_pool.predict(&ctx.camera_id, &frame, ctx.confidence_threshold) {
        Ok(p) => p,
        Err(e) => {
            warn!(camera_id = %ctx.camera_id, error = %e, "inference failed, skipping cycle");
            return;
        }
    };

    // Disjoint field borrows: each block below borrows `ctx.roi_cache`
    // only for as long as it takes to call the matching detector's
    // `update`, so the two can't overlap even though both hang off `ctx`.
    let person_outcome = if ctx.person_detection_enabled {
        match ctx.roi_cache.get("person", frame.width, frame.height) {
            Some(mask) => Some(ctx.person_detector.update(&prediction, mask)),
            None => None,
        }
    } else {
        None
    };
    let coal_outcome = match ctx.roi_cache.get("coal", frame.width, frame.height) {
        Some(mask) => Some(ctx.coal_detector.update(&prediction, mask)),
        None => None,
    };

    if let Some(outcome) = &person_outcome {
        apply_outcome(ctx, AlarmKind::Person, "person_detection", outcome, &frame);
    }
    if let Some(outcome) = &coal_outcome {
        apply_outcome(ctx, AlarmKind::Coal, "coal_blockage", outcome, &frame);
    }
}

fn apply_outcome(
    ctx: &mut DetectionContext,
    kind: AlarmKind,
    alert_type: &str,
    outcome: &crate::detect::DetectionOutcome,
    frame: &crate::frame::Frame,
) {
    if let Err(e) = ctx.actuator.set(kind, outcome.armed) {
        warn!(camera_id = %ctx.camera_id, ?kind, error = %e, "failed to actuate alarm bit");
    }

    match outcome.edge {
        Some(Edge::Armed) => {
            let mut extras = std::collections::BTreeMap::new();
            extras.insert("metric".to_string(), outcome.metric);
            let entry = AlertLogEntry {
                alert_type: alert_type.to_string(),
                camera_id: ctx.camera_id.clone(),
                severity: Severity::Warning,
                description: format!("{alert_type} alarm raised"),
                location: ctx.location.clone(),
                camera_ip: ctx.camera_ip.clone(),
                action_taken: "PLC alarm bit set".to_string(),
                extras,
            };
            ctx.event_log.record(&entry, false);
            let copy = frame.deep_copy();
            ctx.snapshot_writer.save(&ctx.camera_id, alert_type, copy, None, None, false);
        }
        Some(Edge::Disarmed) => {
            let entry = AlertLogEntry {
                alert_type: alert_type.to_string(),
                camera_id: ctx.camera_id.clone(),
                severity: Severity::Info,
                description: format!("{alert_type} alarm cleared"),
                location: ctx.location.clone(),
                camera_ip: ctx.camera_ip.clone(),
                action_taken: "PLC alarm bit cleared".to_string(),
                extras: std::collections::BTreeMap::new(),
            };
            ctx.event_log.record(&entry, false);
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::mock::{MockVideoSource, ReadOutcome};
    use crate::config::{DetectionConfig, PlcConfig, RoiConfig};
    use crate::plc::transport::SharedMockTransport;
    use crate::plc::PlcLinkId;
    use crate::predict::mock::MockPredictor;
    use crate::predict::{BBox, Detection};
    use std::sync::Arc;

    fn camera_config() -> CameraConfig {
        CameraConfig {
            camera_id: "camera_1".into(),
            camera_number: 1,
            name: "Camera 1".into(),
            rtsp_url: "rtsp://demo".into(),
            video_path: None,
            target_fps: 1000,
            max_reconnect_attempts: 0,
            enabled: true,
            plc: PlcConfig {
                ip: "192.168.0.4".into(),
                port: 102,
                rack: 0,
                slot: 2,
                db_number: 300,
                person_alarm_byte: 6,
                person_alarm_bit: 0,
                coal_alarm_byte: 6,
                coal_alarm_bit: 1,
                enabled: true,
                reconnect_attempts: 3,
                health_check_interval: 10.0,
            },
            roi: RoiConfig {
                reference_resolution: (10, 10),
                roi_person: vec![(2, 2), (8, 2), (8, 8), (2, 8)],
                roi_coal: vec![(0, 0), (10, 0), (10, 10), (0, 10)],
            },
            detection: DetectionConfig {
                confidence_threshold: 0.5,
                person_detection_enabled: true,
                person_consecutive_threshold: 1,
                person_no_detection_threshold: 5,
                coal_detection_enabled: true,
                coal_ratio_threshold: 50.0,
                coal_consecutive_threshold: 1,
                coal_no_blockage_threshold: 5,
            },
        }
    }

    #[tokio::test]
    async fn starts_and_stops_cleanly() {
        let camera = camera_config();
        let stats = Arc::new(StatsCollector::new());
        let mut pool = PredictorPool::new(stats.clone());
        let predictor = Arc::new(MockPredictor::new(vec!["person".into(), "coal".into()]));
        pool.register_model("m1", predictor);
        pool.assign_camera(&camera.camera_id, "m1").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let deps = SupervisorDeps {
            predictor_pool: Arc::new(pool),
            event_log: Arc::new(EventLog::new(dir.path().join("logs"), Duration::from_secs(5))),
            snapshot_writer: Arc::new(SnapshotWriter::new(
                dir.path().join("artifacts"),
                Box::new(crate::persistence::snapshot::PpmEncoder),
                Duration::from_secs(5),
            )),
            stats,
        };

        let source = MockVideoSource::new().push_read(ReadOutcome::Frame(10, 10, vec![0; 300]));
        let transport = SharedMockTransport::new(PlcLinkId { host: "10.0.0.1".into(), port: 102, rack: 0, slot: 2 });

        let handle = start(camera, Box::new(source), Box::new(transport), deps).unwrap();
        assert_eq!(handle.state(), SupervisorState::Running);

        handle.stop(Duration::from_secs(2)).await;
    }

    #[tokio::test]
    async fn start_and_stop_emit_forced_system_log_lines() {
        // §4.10: system start/stop events bypass the throttle (`force=true`)
        // even with a long throttle window.
        let camera = camera_config();
        let stats = Arc::new(StatsCollector::new());
        let mut pool = PredictorPool::new(stats.clone());
        let predictor = Arc::new(MockPredictor::new(vec!["person".into(), "coal".into()]));
        pool.register_model("m1", predictor);
        pool.assign_camera(&camera.camera_id, "m1").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let event_log = Arc::new(EventLog::new(dir.path().join("logs"), Duration::from_secs(600)));
        let deps = SupervisorDeps {
            predictor_pool: Arc::new(pool),
            event_log: event_log.clone(),
            snapshot_writer: Arc::new(SnapshotWriter::new(
                dir.path().join("artifacts"),
                Box::new(crate::persistence::snapshot::PpmEncoder),
                Duration::from_secs(600),
            )),
            stats,
        };

        let source = MockVideoSource::new().push_read(ReadOutcome::Frame(10, 10, vec![0; 300]));
        let transport = SharedMockTransport::new(PlcLinkId { host: "10.0.0.1".into(), port: 102, rack: 0, slot: 2 });

        let handle = start(camera, Box::new(source), Box::new(transport), deps).unwrap();
        handle.stop(Duration::from_secs(2)).await;

        let logs_dir = dir.path().join("logs");
        let path = std::fs::read_dir(&logs_dir).unwrap().next().unwrap().unwrap().path();
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.contains("alert_type=system"));
        assert_eq!(contents.lines().count(), 2, "expected one start line and one stop line");
    }

    #[tokio::test]
    async fn person_arm_edge_writes_event_log_and_snapshot() {
        let mut camera = camera_config();
        camera.detection.coal_detection_enabled = false;

        let stats = Arc::new(StatsCollector::new());
        let mut pool = PredictorPool::new(stats.clone());
        let predictor = Arc::new(MockPredictor::new(vec!["person".into(), "coal".into()]));
        predictor.push(vec![Detection {
            class_id: 0,
            class_name: "person".into(),
            confidence: 0.9,
            bbox: BBox { x0: 3, y0: 3, x1: 5, y1: 5 },
            mask: None,
        }]);
        pool.register_model("m1", predictor);
        pool.assign_camera(&camera.camera_id, "m1").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let event_log = Arc::new(EventLog::new(dir.path().join("logs"), Duration::from_millis(0)));
        let deps = SupervisorDeps {
            predictor_pool: Arc::new(pool),
            event_log: event_log.clone(),
            snapshot_writer: Arc::new(SnapshotWriter::new(
                dir.path().join("artifacts"),
                Box::new(crate::persistence::snapshot::PpmEncoder),
                Duration::from_millis(0),
            )),
            stats,
        };

        let source = MockVideoSource::new().push_read(ReadOutcome::Frame(10, 10, vec![0; 300]));
        let transport = SharedMockTransport::new(PlcLinkId { host: "10.0.0.1".into(), port: 102, rack: 0, slot: 2 });

        let handle = start(camera, Box::new(source), Box::new(transport), deps).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop(Duration::from_secs(2)).await;

        let logs_dir = dir.path().join("logs");
        let has_logs = std::fs::read_dir(&logs_dir).map(|mut d| d.next().is_some()).unwrap_or(false);
        assert!(has_logs);
    }
}
