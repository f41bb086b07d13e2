// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

pub mod capture;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod hysteresis;
pub mod orchestrator;
pub mod persistence;
pub mod plc;
pub mod predict;
pub mod roi;
pub mod stats;
pub mod supervisor;
