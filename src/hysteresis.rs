// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Shared consecutive-hit/consecutive-miss hysteresis state machine.
//!
//! Both the person detector and the coal detector arm on N consecutive
//! positive frames and disarm on M consecutive negative frames, with the
//! streak counters kept independent of each other (a positive frame resets
//! the miss streak but does not clear the hit streak, and vice versa). This
//! mirrors the arming logic in the original person/coal detectors.

/// Consecutive-hit/consecutive-miss hysteresis with independently tracked
/// on/off streaks and a single armed/disarmed flag.
#[derive(Debug, Clone, Default)]
pub struct HysteresisState {
    on_streak: u32,
    off_streak: u32,
    armed: bool,
    last_metric: f64,
}

impl HysteresisState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn armed(&self) -> bool {
        self.armed
    }

    pub fn last_metric(&self) -> f64 {
        self.last_metric
    }

    pub fn on_streak(&self) -> u32 {
        self.on_streak
    }

    pub fn off_streak(&self) -> u32 {
        self.off_streak
    }

    /// Feed one frame's outcome through the state machine.
    ///
    /// `hit` is whatever crossed the trigger condition this frame (e.g.
    /// "a person intersects the ROI" or "the coal ratio exceeds the
    /// threshold"). `metric` is recorded for diagnostics regardless of
    /// outcome. Returns `true` if this call flipped `armed`.
    pub fn update(&mut self, hit: bool, metric: f64, on_threshold: u32, off_threshold: u32) -> bool {
        self.last_metric = metric;
        let was_armed = self.armed;

        if hit {
            self.on_streak += 1;
            self.off_streak = 0;
            if !self.armed && self.on_streak >= on_threshold {
                self.armed = true;
                self.on_streak = 0;
            }
        } else {
            self.off_streak += 1;
            self.on_streak = 0;
            if self.armed && self.off_streak >= off_threshold {
                self.armed = false;
            }
        }

        was_armed != self.armed
    }

    /// Decay the miss streak for a frame that produced no usable signal at
    /// all (e.g. detector disabled, or no masks returned). Counts as a miss
    /// for the purpose of eventually disarming, but never re-arms.
    pub fn decay(&mut self, off_threshold: u32) -> bool {
        let was_armed = self.armed;
        self.off_streak += 1;
        self.on_streak = 0;
        if self.armed && self.off_streak >= off_threshold {
            self.armed = false;
        }
        was_armed != self.armed
    }
}
