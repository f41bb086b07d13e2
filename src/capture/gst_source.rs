// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! GStreamer-backed [`VideoSource`].
//!
//! Builds a decode pipeline (`rtspsrc`/`filesrc` → `decodebin` →
//! `videoconvert` → `appsink`) that always exposes raw BGR frames, unlike
//! the teacher's `CameraStream` which muxes to MPEG-TS for storage. The
//! appsink is pulled synchronously rather than driven by callbacks: `grab`
//! pulls and discards a sample (the cheap "advance past stale buffered
//! frames" primitive of §4.2), `read` pulls and copies one out as a
//! decoded [`Frame`](crate::frame::Frame).

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;

use crate::capture::VideoSource;
use crate::error::{Result, VisionError};

pub struct GstVideoSource {
    url_or_path: String,
    request_buffer_size: u32,
    pipeline: Option<gst::Pipeline>,
    appsink: Option<gst_app::AppSink>,
    width: u32,
    height: u32,
}

impl GstVideoSource {
    pub fn new(url_or_path: impl Into<String>) -> Self {
        Self {
            url_or_path: url_or_path.into(),
            request_buffer_size: 1,
            pipeline: None,
            appsink: None,
            width: 0,
            height: 0,
        }
    }

    fn build_pipeline_string(&self) -> String {
        let source_element = if self.url_or_path.starts_with("rtsp://") {
            format!("rtspsrc location={} latency=200 protocols=tcp", self.url_or_path)
        } else if self.url_or_path.starts_with("http://") || self.url_or_path.starts_with("https://") {
            format!("souphttpsrc location={}", self.url_or_path)
        } else {
            format!("filesrc location={}", self.url_or_path)
        };

        format!(
            "{source_element} ! decodebin ! videoconvert ! video/x-raw,format=BGR ! \
             appsink name=sink emit-signals=false max-buffers={buf} drop=true sync=false",
            buf = self.request_buffer_size,
        )
    }
}

impl VideoSource for GstVideoSource {
    fn open(&mut self) -> Result<(u32, u32)> {
        gst::init().map_err(|e| VisionError::CameraConnection {
            id: self.url_or_path.clone(),
            reason: format!("gst::init: {e}"),
        })?;

        let pipeline_str = self.build_pipeline_string();
        let pipeline = gst::parse::launch(&pipeline_str)
            .map_err(|e| VisionError::CameraConnection { id: self.url_or_path.clone(), reason: format!("parse_launch: {e}") })?
            .downcast::<gst::Pipeline>()
            .map_err(|_| VisionError::CameraConnection { id: self.url_or_path.clone(), reason: "not a pipeline".into() })?;

        let appsink: gst_app::AppSink = pipeline
            .by_name("sink")
            .ok_or_else(|| VisionError::CameraConnection { id: self.url_or_path.clone(), reason: "appsink not found".into() })?
            .downcast::<gst_app::AppSink>()
            .map_err(|_| VisionError::CameraConnection { id: self.url_or_path.clone(), reason: "cast to AppSink failed".into() })?;

        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| VisionError::CameraConnection { id: self.url_or_path.clone(), reason: format!("set_state Playing: {e}") })?;

        // Block briefly for the first sample so width/height are known
        // before the caller starts its capture loop.
        if let Ok(sample) = appsink.try_pull_sample(gst::ClockTime::from_seconds(5)) {
            if let Some(sample) = sample {
                if let Some(caps) = sample.caps() {
                    if let Some(s) = caps.structure(0) {
                        self.width = s.get::<i32>("width").unwrap_or(0) as u32;
                        self.height = s.get::<i32>("height").unwrap_or(0) as u32;
                    }
                }
            }
        }

        self.pipeline = Some(pipeline);
        self.appsink = Some(appsink);
        Ok((self.width, self.height))
    }

    fn grab(&mut self) -> bool {
        match &self.appsink {
            Some(sink) => sink.try_pull_sample(gst::ClockTime::ZERO).ok().flatten().is_some(),
            None => false,
        }
    }

    fn read(&mut self) -> Option<(u32, u32, Vec<u8>)> {
        let sink = self.appsink.as_ref()?;
        let sample = sink.try_pull_sample(gst::ClockTime::from_mseconds(500)).ok().flatten()?;
        let buffer = sample.buffer()?;
        let map = buffer.map_readable().ok()?;

        let (width, height) = sample
            .caps()
            .and_then(|c| c.structure(0).map(|s| (s.get::<i32>("width").unwrap_or(self.width as i32), s.get::<i32>("height").unwrap_or(self.height as i32))))
            .unwrap_or((self.width as i32, self.height as i32));

        Some((width as u32, height as u32, map.as_slice().to_vec()))
    }

    fn close(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            let _ = pipeline.set_state(gst::State::Null);
        }
        self.appsink = None;
    }
}

impl Drop for GstVideoSource {
    fn drop(&mut self) {
        self.close();
    }
}
