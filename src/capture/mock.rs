// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Deterministic [`VideoSource`] test double.
//!
//! Drives [`CaptureWorker`](crate::capture::CaptureWorker) through exact
//! failure/success sequences without a real decoder, so the reconnect
//! backoff schedule and grab-skip bookkeeping can be asserted precisely.

use std::collections::VecDeque;

use crate::capture::VideoSource;
use crate::error::{Result, VisionError};

/// One scripted outcome for a single `read()` call.
#[derive(Debug, Clone)]
pub enum ReadOutcome {
    Frame(u32, u32, Vec<u8>),
    Failure,
}

/// A scriptable `VideoSource`: queues of outcomes for `open`, `grab`, and
/// `read`, consumed in order. Once a queue is drained, `open` keeps
/// succeeding and `grab`/`read` keep repeating the last scripted outcome
/// (or fail, if the queue was never populated), so short scripts don't need
/// padding for every call the worker makes.
pub struct MockVideoSource {
    open_results: VecDeque<Result<(u32, u32)>>,
    grab_results: VecDeque<bool>,
    read_results: VecDeque<ReadOutcome>,
    last_grab: bool,
    last_read: Option<ReadOutcome>,
    opens: u32,
    closes: u32,
    seeks: u32,
}

impl MockVideoSource {
    pub fn new() -> Self {
        Self {
            open_results: VecDeque::new(),
            grab_results: VecDeque::new(),
            read_results: VecDeque::new(),
            last_grab: true,
            last_read: None,
            opens: 0,
            closes: 0,
            seeks: 0,
        }
    }

    pub fn push_open(mut self, result: Result<(u32, u32)>) -> Self {
        self.open_results.push_back(result);
        self
    }

    pub fn push_grab(mut self, ok: bool) -> Self {
        self.grab_results.push_back(ok);
        self
    }

    pub fn push_read(mut self, outcome: ReadOutcome) -> Self {
        self.read_results.push_back(outcome);
        self
    }

    /// Push `count` consecutive read failures, the shape scenario 3 (§8)
    /// needs: "returning failure for 5 consecutive reads, then success".
    pub fn push_read_failures(mut self, count: u32) -> Self {
        for _ in 0..count {
            self.read_results.push_back(ReadOutcome::Failure);
        }
        self
    }

    pub fn opens(&self) -> u32 {
        self.opens
    }

    pub fn closes(&self) -> u32 {
        self.closes
    }

    pub fn seeks(&self) -> u32 {
        self.seeks
    }
}

impl Default for MockVideoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSource for MockVideoSource {
    fn open(&mut self) -> Result<(u32, u32)> {
        self.opens += 1;
        self.open_results
            .pop_front()
            .unwrap_or(Ok((640, 480)))
    }

    fn grab(&mut self) -> bool {
        let ok = self.grab_results.pop_front().unwrap_or(self.last_grab);
        self.last_grab = ok;
        ok
    }

    fn read(&mut self) -> Option<(u32, u32, Vec<u8>)> {
        let outcome = self.read_results.pop_front().or_else(|| self.last_read.clone());
        self.last_read = outcome.clone();
        match outcome {
            Some(ReadOutcome::Frame(w, h, data)) => Some((w, h, data)),
            Some(ReadOutcome::Failure) | None => None,
        }
    }

    fn seek_to_start(&mut self) {
        self.seeks += 1;
    }

    fn close(&mut self) {
        self.closes += 1;
    }
}

/// A source whose `open()` always fails, for exercising the `Connecting`
/// → `Error` path (§4.2, §8 boundary case: initial connect failure).
pub struct AlwaysFailsToOpen;

impl VideoSource for AlwaysFailsToOpen {
    fn open(&mut self) -> Result<(u32, u32)> {
        Err(VisionError::CameraConnection { id: "mock".into(), reason: "simulated open failure".into() })
    }

    fn grab(&mut self) -> bool {
        false
    }

    fn read(&mut self) -> Option<(u32, u32, Vec<u8>)> {
        None
    }

    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeats_last_scripted_read_once_queue_drains() {
        let mut source = MockVideoSource::new().push_read(ReadOutcome::Frame(2, 2, vec![1; 12]));
        assert_eq!(source.read().unwrap().2, vec![1; 12]);
        assert_eq!(source.read().unwrap().2, vec![1; 12]);
    }

    #[test]
    fn counts_opens_and_closes() {
        let mut source = MockVideoSource::new();
        source.open().unwrap();
        source.open().unwrap();
        source.close();
        assert_eq!(source.opens(), 2);
        assert_eq!(source.closes(), 1);
    }
}
