// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Per-camera detectors that turn a [`Prediction`](crate::predict::Prediction)
//! plus a cached ROI mask into an arm/disarm decision.
//!
//! Both detectors are thin metric-computation layers wrapped around the
//! shared [`HysteresisState`](crate::hysteresis::HysteresisState); the only
//! difference between them is how they derive `hit` and `last_metric` for a
//! given frame (§4.5/§4.6).

pub mod coal;
pub mod person;

/// Outcome of feeding one frame through a detector: whether this call
/// flipped `armed`, and which way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Armed,
    Disarmed,
}

/// Result of running a detector against one frame.
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    pub armed: bool,
    pub edge: Option<Edge>,
    pub metric: f64,
}

fn edge_from(flipped: bool, armed: bool) -> Option<Edge> {
    if !flipped {
        None
    } else if armed {
        Some(Edge::Armed)
    } else {
        Some(Edge::Disarmed)
    }
}
