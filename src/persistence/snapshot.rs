// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Snapshot image sink (§4.10).
//!
//! Before handing a frame to the [`ImageEncoder`] boundary, the writer
//! overlays the two ROI polygons, a red border, and the info-panel
//! background the original deployment paints behind its metrics text.
//! Glyph rendering itself is a drawing-tool concern (§1 out of scope,
//! alongside the interactive ROI editor) — the panel's title/metrics/
//! timestamp are carried in the filename and the paired event-log line
//! instead of being rasterized into the image.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use crate::error::Result;
use crate::frame::Frame;
use crate::persistence::Throttle;
use crate::roi::RoiMask;

/// Opaque image-codec boundary (§1): this crate never embeds a concrete
/// JPEG encoder. Production deployments plug in a real codec; tests use
/// [`PpmEncoder`].
pub trait ImageEncoder: Send + Sync {
    fn encode(&self, frame: &Frame) -> Result<Vec<u8>>;
    fn extension(&self) -> &str;
}

/// Reference encoder for tests/demos: writes an uncompressed binary PPM
/// (P6), not a JPEG codec.
pub struct PpmEncoder;

impl ImageEncoder for PpmEncoder {
    fn encode(&self, frame: &Frame) -> Result<Vec<u8>> {
        let mut out = format!("P6\n{} {}\n255\n", frame.width, frame.height).into_bytes();
        out.extend_from_slice(&frame.data);
        Ok(out)
    }

    fn extension(&self) -> &str {
        "ppm"
    }
}

const BORDER_COLOR: [u8; 3] = [0, 0, 255]; // BGR red
const PERSON_ROI_COLOR: [u8; 3] = [0, 200, 0];
const COAL_ROI_COLOR: [u8; 3] = [0, 165, 255];
const INFO_PANEL_HEIGHT: u32 = 24;
const INFO_PANEL_COLOR: [u8; 3] = [40, 40, 40];
const BORDER_THICKNESS: u32 = 3;

/// Draw a filled info-panel band across the top of the frame and a solid
/// border around its edges, then overlay the two ROI masks as a tinted
/// outline. Mutates `frame.data` in place; assumes 3-byte-per-pixel
/// layout matching `frame.width * frame.height * 3`.
pub fn overlay(frame: &mut Frame, person_roi: Option<&RoiMask>, coal_roi: Option<&RoiMask>) {
    let width = frame.width as usize;
    let height = frame.height as usize;
    if frame.data.len() < width * height * 3 {
        return;
    }

    for y in 0..height.min(INFO_PANEL_HEIGHT as usize) {
        for x in 0..width {
            set_pixel(&mut frame.data, width, x, y, INFO_PANEL_COLOR);
        }
    }

    if let Some(roi) = person_roi {
        overlay_mask_outline(frame, roi, PERSON_ROI_COLOR);
    }
    if let Some(roi) = coal_roi {
        overlay_mask_outline(frame, roi, COAL_ROI_COLOR);
    }

    draw_border(&mut frame.data, width, height, BORDER_COLOR, BORDER_THICKNESS as usize);
}

fn overlay_mask_outline(frame: &mut Frame, roi: &RoiMask, color: [u8; 3]) {
    let width = frame.width as usize;
    if roi.width != frame.width || roi.height != frame.height {
        return;
    }
    for y in 0..roi.height as usize {
        for x in 0..roi.width as usize {
            if !roi.contains(x as u32, y as u32) {
                continue;
            }
            let on_edge = [(x.wrapping_sub(1), y), (x + 1, y), (x, y.wrapping_sub(1)), (x, y + 1)]
                .iter()
                .any(|(nx, ny)| *nx < roi.width as usize && *ny < roi.height as usize && !roi.contains(*nx as u32, *ny as u32));
            if on_edge {
                set_pixel(&mut frame.data, width, x, y, color);
            }
        }
    }
}

fn draw_border(data: &mut [u8], width: usize, height: usize, color: [u8; 3], thickness: usize) {
    for t in 0..thickness {
        for x in 0..width {
            set_pixel(data, width, x, t, color);
            if height > t {
                set_pixel(data, width, x, height - 1 - t, color);
            }
        }
        for y in 0..height {
            set_pixel(data, width, t, y, color);
            if width > t {
                set_pixel(data, width, width - 1 - t, y, color);
            }
        }
    }
}

fn set_pixel(data: &mut [u8], width: usize, x: usize, y: usize, color: [u8; 3]) {
    let idx = (y * width + x) * 3;
    if idx + 2 < data.len() {
        data[idx] = color[0];
        data[idx + 1] = color[1];
        data[idx + 2] = color[2];
    }
}

/// Snapshot writer: one per-day directory under `artifacts_dir`, throttled
/// per (camera, alert kind), filenames formatted per §6.
pub struct SnapshotWriter {
    artifacts_dir: PathBuf,
    encoder: Box<dyn ImageEncoder>,
    throttle: Throttle,
    default_window: Duration,
}

impl SnapshotWriter {
    pub fn new(artifacts_dir: impl Into<PathBuf>, encoder: Box<dyn ImageEncoder>, default_window: Duration) -> Self {
        Self { artifacts_dir: artifacts_dir.into(), encoder, throttle: Throttle::new(), default_window }
    }

    /// Write `frame` as a snapshot for `(camera_id, alert_type)`, applying
    /// the ROI/border overlay first, unless throttled. Returns the path
    /// written, if any. Filesystem errors are logged, never propagated.
    pub fn save(
        &self,
        camera_id: &str,
        alert_type: &str,
        mut frame: Frame,
        person_roi: Option<&RoiMask>,
        coal_roi: Option<&RoiMask>,
        force: bool,
    ) -> Option<PathBuf> {
        let key = format!("{camera_id}:{alert_type}");
        if !self.throttle.allow(&key, self.default_window, force) {
            return None;
        }

        overlay(&mut frame, person_roi, coal_roi);

        let now = Utc::now();
        let day_dir = self.artifacts_dir.join(now.format("%Y%m%d").to_string());
        let filename = format!(
            "{alert_type}_{camera_id}_{}.{}",
            now.format("%Y%m%d_%H%M%S_%6f"),
            self.encoder.extension()
        );
        let path = day_dir.join(filename);

        match self.write(&day_dir, &path, &frame) {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(camera_id, alert_type, error = %e, "failed to write snapshot");
                None
            }
        }
    }

    fn write(&self, day_dir: &std::path::Path, path: &std::path::Path, frame: &Frame) -> Result<()> {
        std::fs::create_dir_all(day_dir)?;
        let bytes = self.encoder.encode(frame)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roi::Roi;

    fn frame(w: u32, h: u32) -> Frame {
        Frame::new(w, h, vec![128u8; (w * h * 3) as usize])
    }

    #[test]
    fn writes_snapshot_with_expected_filename_shape() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path(), Box::new(PpmEncoder), Duration::from_secs(5));
        let path = writer.save("camera_1", "person_detection", frame(16, 16), None, None, false).unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("person_detection_camera_1_"));
        assert!(name.ends_with(".ppm"));
    }

    #[test]
    fn throttles_repeated_snapshots() {
        // distilled spec §8 scenario 4: at most 1 snapshot within the
        // throttle window.
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path(), Box::new(PpmEncoder), Duration::from_secs(5));
        let mut written = 0;
        for _ in 0..10 {
            if writer.save("camera_1", "person_detection", frame(8, 8), None, None, false).is_some() {
                written += 1;
            }
        }
        assert_eq!(written, 1);
    }

    #[test]
    fn overlay_draws_border_without_panicking() {
        let roi = Roi::new(vec![(2, 2), (8, 2), (8, 8), (2, 8)]);
        let mask = RoiMask::rasterize(&roi, 16, 16);
        let mut f = frame(16, 16);
        overlay(&mut f, Some(&mask), None);
        assert_eq!(f.data[0], BORDER_COLOR[0]);
    }
}
