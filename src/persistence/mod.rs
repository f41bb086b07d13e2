// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Structured event log and snapshot image persistence (§4.10).
//!
//! Both sinks are throttled independently per `(camera, alert kind)` and
//! tolerate filesystem failure without breaking the detection loop (§7).

pub mod event_log;
pub mod snapshot;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Per-key (camera, alert kind) throttle: returns `true` at most once per
/// `window`, unless `force` bypasses the throttle entirely (used for
/// system start/stop events).
#[derive(Default)]
pub struct Throttle {
    last_fired: Mutex<HashMap<String, Instant>>,
}

impl Throttle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(&self, key: &str, window: Duration, force: bool) -> bool {
        if force {
            self.last_fired.lock().insert(key.to_string(), Instant::now());
            return true;
        }

        let mut last_fired = self.last_fired.lock();
        let now = Instant::now();
        match last_fired.get(key) {
            Some(t) if now.duration_since(*t) < window => false,
            _ => {
                last_fired.insert(key.to_string(), now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttle_suppresses_within_window() {
        let throttle = Throttle::new();
        assert!(throttle.allow("cam1:person", Duration::from_secs(5), false));
        assert!(!throttle.allow("cam1:person", Duration::from_secs(5), false));
    }

    #[test]
    fn throttle_force_always_fires() {
        let throttle = Throttle::new();
        assert!(throttle.allow("cam1:person", Duration::from_secs(5), false));
        assert!(throttle.allow("cam1:person", Duration::from_secs(5), true));
    }

    #[test]
    fn throttle_keys_are_independent() {
        let throttle = Throttle::new();
        assert!(throttle.allow("cam1:person", Duration::from_secs(5), false));
        assert!(throttle.allow("cam1:coal", Duration::from_secs(5), false));
    }
}
