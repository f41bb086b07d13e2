// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Append-only structured event log, one file per (day, camera).
//!
//! Each record is one line of `key=value` pairs (§6 event log format).
//! Field set and throttling follow `AlertLogEntry`/`alerting/alert_logger.py`
//! in the original source: `timestamp, alert_type, camera_id, severity,
//! description, location, camera_ip, action_taken`, plus free-form numeric
//! extras (`frames_detected`, `threshold`, `coal_ratio`, …).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use crate::persistence::Throttle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
    High,
}

impl Severity {
    fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::High => "HIGH",
        }
    }
}

/// A single alert record, ready to be serialized to the log file.
#[derive(Debug, Clone)]
pub struct AlertLogEntry {
    pub alert_type: String,
    pub camera_id: String,
    pub severity: Severity,
    pub description: String,
    pub location: String,
    pub camera_ip: String,
    pub action_taken: String,
    /// Free-form numeric extras (`frames_detected`, `threshold`,
    /// `coal_ratio`, …). A `BTreeMap` keeps the rendered line
    /// deterministic for tests.
    pub extras: BTreeMap<String, f64>,
}

impl AlertLogEntry {
    fn render(&self, timestamp: chrono::DateTime<Utc>) -> String {
        let mut line = format!(
            "timestamp={} alert_type={} camera_id={} severity={} description=\"{}\" location=\"{}\" camera_ip={} action_taken=\"{}\"",
            timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.alert_type,
            self.camera_id,
            self.severity.as_str(),
            self.description,
            self.location,
            self.camera_ip,
            self.action_taken,
        );
        for (key, value) in &self.extras {
            line.push_str(&format!(" {key}={value}"));
        }
        line
    }
}

/// Event log sink: one append-only file per (day, camera), throttled per
/// (camera, alert kind).
pub struct EventLog {
    logs_dir: PathBuf,
    throttle: Throttle,
    default_window: Duration,
}

impl EventLog {
    pub fn new(logs_dir: impl Into<PathBuf>, default_window: Duration) -> Self {
        Self { logs_dir: logs_dir.into(), throttle: Throttle::new(), default_window }
    }

    /// Append `entry` to today's file for its camera, unless suppressed by
    /// the per-(camera, alert_type) throttle. `force` bypasses the
    /// throttle (system start/stop events). Filesystem failures are
    /// logged and swallowed (§7 persistence errors).
    pub fn record(&self, entry: &AlertLogEntry, force: bool) {
        let key = format!("{}:{}", entry.camera_id, entry.alert_type);
        if !self.throttle.allow(&key, self.default_window, force) {
            return;
        }

        let now = Utc::now();
        if let Err(e) = self.write_line(entry, now) {
            warn!(camera_id = %entry.camera_id, error = %e, "failed to write event log entry");
        }
    }

    fn write_line(&self, entry: &AlertLogEntry, now: chrono::DateTime<Utc>) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.logs_dir)?;
        let path = self.file_path(&entry.camera_id, now);
        let line = entry.render(now);
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{line}")
    }

    fn file_path(&self, camera_id: &str, now: chrono::DateTime<Utc>) -> PathBuf {
        self.logs_dir.join(format!("{camera_id}_{}.log", now.format("%Y%m%d")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn entry() -> AlertLogEntry {
        let mut extras = BTreeMap::new();
        extras.insert("frames_detected".to_string(), 3.0);
        extras.insert("threshold".to_string(), 3.0);
        AlertLogEntry {
            alert_type: "person_detection".into(),
            camera_id: "camera_1".into(),
            severity: Severity::Warning,
            description: "Person detected in danger zone".into(),
            location: "Conveyor Belt 3".into(),
            camera_ip: "192.168.1.181".into(),
            action_taken: "PLC alarm bit set".into(),
            extras,
        }
    }

    #[test]
    fn writes_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::new(dir.path(), Duration::from_secs(5));
        log.record(&entry(), false);

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let path = files[0].as_ref().unwrap().path();
        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("alert_type=person_detection"));
        assert!(contents.contains("frames_detected=3"));
    }

    #[test]
    fn throttles_repeated_records() {
        // distilled spec §8 scenario 4: fire 10 edges within the throttle
        // window, expect exactly 1 line (unless force=true).
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::new(dir.path(), Duration::from_secs(5));
        for _ in 0..10 {
            log.record(&entry(), false);
        }

        let path = std::fs::read_dir(dir.path()).unwrap().next().unwrap().unwrap().path();
        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn force_bypasses_throttle() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::new(dir.path(), Duration::from_secs(5));
        log.record(&entry(), false);
        log.record(&entry(), true);

        let path = std::fs::read_dir(dir.path()).unwrap().next().unwrap().unwrap().path();
        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
