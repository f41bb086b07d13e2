// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Rolling performance statistics, aggregated across cameras and models.
//!
//! Everything here is advisory: it informs log lines and an optional
//! headless status line, never a control decision. The host GPU/CPU/memory
//! probe in particular runs on its own coarse interval and must never sit
//! on the per-frame detection path.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sysinfo::System;

const INFERENCE_WINDOW: usize = 100;
const CAPTURE_WINDOW: usize = 50;

#[derive(Debug, Clone, Default)]
pub struct RollingLatency {
    samples: VecDeque<Duration>,
    capacity: usize,
}

impl RollingLatency {
    fn with_capacity(capacity: usize) -> Self {
        Self { samples: VecDeque::with_capacity(capacity), capacity }
    }

    fn push(&mut self, d: Duration) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(d);
    }

    pub fn last(&self) -> Option<Duration> {
        self.samples.back().copied()
    }

    pub fn min(&self) -> Option<Duration> {
        self.samples.iter().min().copied()
    }

    pub fn max(&self) -> Option<Duration> {
        self.samples.iter().max().copied()
    }

    pub fn avg(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        Some(total / self.samples.len() as u32)
    }

    /// Frames per second implied by the average sample latency over the
    /// current window.
    pub fn fps(&self) -> f64 {
        match self.avg() {
            Some(d) if d.as_secs_f64() > 0.0 => 1.0 / d.as_secs_f64(),
            _ => 0.0,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

#[derive(Debug, Default)]
struct CameraStats {
    inference: RollingLatency,
    capture: RollingLatency,
}

/// A point-in-time snapshot of one camera's performance, for logging or a
/// headless status line.
#[derive(Debug, Clone)]
pub struct CameraStatsSnapshot {
    pub camera_id: String,
    pub inference_last_ms: f64,
    pub inference_avg_ms: f64,
    pub inference_fps: f64,
    pub capture_avg_ms: f64,
    pub capture_fps: f64,
}

/// A point-in-time snapshot of host resource usage, populated by the
/// advisory `sysinfo` probe.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    pub cpu_usage_percent: f32,
    pub used_memory_mb: u64,
    pub total_memory_mb: u64,
}

/// Collects rolling per-camera inference/capture latency and an advisory
/// system resource snapshot. Cheap to update on the hot path; the system
/// probe is only refreshed when `refresh_system` is called, which the
/// orchestrator does on its own coarse interval.
pub struct StatsCollector {
    cameras: Mutex<HashMap<String, CameraStats>>,
    system: Mutex<System>,
    system_snapshot: Mutex<SystemSnapshot>,
    last_system_refresh: Mutex<Option<Instant>>,
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            cameras: Mutex::new(HashMap::new()),
            system: Mutex::new(System::new()),
            system_snapshot: Mutex::new(SystemSnapshot::default()),
            last_system_refresh: Mutex::new(None),
        }
    }

    pub fn record_inference(&self, camera_id: &str, duration: Duration) {
        let mut cameras = self.cameras.lock();
        let entry = cameras.entry(camera_id.to_string()).or_insert_with(|| {
            CameraStats {
                inference: RollingLatency::with_capacity(INFERENCE_WINDOW),
                capture: RollingLatency::with_capacity(CAPTURE_WINDOW),
            }
        });
        entry.inference.push(duration);
    }

    pub fn record_capture(&self, camera_id: &str, duration: Duration) {
        let mut cameras = self.cameras.lock();
        let entry = cameras.entry(camera_id.to_string()).or_insert_with(|| {
            CameraStats {
                inference: RollingLatency::with_capacity(INFERENCE_WINDOW),
                capture: RollingLatency::with_capacity(CAPTURE_WINDOW),
            }
        });
        entry.capture.push(duration);
    }

    pub fn snapshot(&self, camera_id: &str) -> Option<CameraStatsSnapshot> {
        let cameras = self.cameras.lock();
        let stats = cameras.get(camera_id)?;
        Some(CameraStatsSnapshot {
            camera_id: camera_id.to_string(),
            inference_last_ms: stats.inference.last().map(|d| d.as_secs_f64() * 1000.0).unwrap_or(0.0),
            inference_avg_ms: stats.inference.avg().map(|d| d.as_secs_f64() * 1000.0).unwrap_or(0.0),
            inference_fps: stats.inference.fps(),
            capture_avg_ms: stats.capture.avg().map(|d| d.as_secs_f64() * 1000.0).unwrap_or(0.0),
            capture_fps: stats.capture.fps(),
        })
    }

    pub fn all_camera_ids(&self) -> Vec<String> {
        self.cameras.lock().keys().cloned().collect()
    }

    /// Refresh the host resource snapshot, but only if at least
    /// `min_interval` has elapsed since the last refresh. Cheap no-op
    /// otherwise, so callers can invoke it every tick without worrying
    /// about probe cost.
    pub fn refresh_system(&self, min_interval: Duration) {
        let mut last = self.last_system_refresh.lock();
        if let Some(t) = *last {
            if t.elapsed() < min_interval {
                return;
            }
        }
        let mut system = self.system.lock();
        system.refresh_cpu_usage();
        system.refresh_memory();

        let mut snapshot = self.system_snapshot.lock();
        snapshot.cpu_usage_percent = system.global_cpu_usage();
        snapshot.used_memory_mb = system.used_memory() / (1024 * 1024);
        snapshot.total_memory_mb = system.total_memory() / (1024 * 1024);

        *last = Some(Instant::now());
    }

    pub fn system_snapshot(&self) -> SystemSnapshot {
        self.system_snapshot.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_latency_evicts_oldest_beyond_capacity() {
        let mut rl = RollingLatency::with_capacity(3);
        for ms in [10, 20, 30, 40] {
            rl.push(Duration::from_millis(ms));
        }
        assert_eq!(rl.sample_count(), 3);
        assert_eq!(rl.last(), Some(Duration::from_millis(40)));
        assert_eq!(rl.min(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn fps_derived_from_average_latency() {
        let mut rl = RollingLatency::with_capacity(10);
        rl.push(Duration::from_millis(100));
        rl.push(Duration::from_millis(100));
        assert!((rl.fps() - 10.0).abs() < 0.001);
    }

    #[test]
    fn snapshot_absent_for_unknown_camera() {
        let stats = StatsCollector::new();
        assert!(stats.snapshot("cam1").is_none());
    }

    #[test]
    fn snapshot_present_after_recording() {
        let stats = StatsCollector::new();
        stats.record_inference("cam1", Duration::from_millis(50));
        let snap = stats.snapshot("cam1").unwrap();
        assert_eq!(snap.inference_last_ms, 50.0);
    }
}
