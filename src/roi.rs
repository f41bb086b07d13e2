// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Region-of-interest polygons and their rasterized masks.
//!
//! ROI polygons are authored against a reference resolution and linearly
//! scaled to the camera's actual frame size (matching `ROIConfig.scale_roi`:
//! truncating integer scaling, not rounding). The scaled polygon is then
//! rasterized into a binary mask once and cached until the frame size or
//! polygon changes.

/// A polygon in frame-pixel coordinates.
#[derive(Debug, Clone)]
pub struct Roi {
    pub points: Vec<(i32, i32)>,
}

impl Roi {
    pub fn new(points: Vec<(i32, i32)>) -> Self {
        Self { points }
    }

    /// Scale a polygon authored at `reference_resolution` to `(width,
    /// height)`. Uses truncating integer multiplication, matching the
    /// original `int(x * scale_x)` scaling so mask areas line up exactly
    /// with deployments carried over from the original config.
    pub fn scaled(
        points: &[(i32, i32)],
        reference_resolution: (u32, u32),
        width: u32,
        height: u32,
    ) -> Roi {
        let scale_x = width as f64 / reference_resolution.0 as f64;
        let scale_y = height as f64 / reference_resolution.1 as f64;
        let scaled = points
            .iter()
            .map(|(x, y)| ((*x as f64 * scale_x) as i32, (*y as f64 * scale_y) as i32))
            .collect();
        Roi::new(scaled)
    }
}

/// A rasterized binary mask: one byte per pixel, nonzero = inside the ROI.
pub struct RoiMask {
    pub width: u32,
    pub height: u32,
    pub mask: Vec<u8>,
    pub area: u64,
}

impl RoiMask {
    /// Rasterize `roi` into a `width x height` mask via scanline polygon
    /// fill. Polygons with fewer than 3 vertices rasterize to an empty
    /// mask with area 0 (degenerate ROI, never intersects anything).
    pub fn rasterize(roi: &Roi, width: u32, height: u32) -> RoiMask {
        let mut mask = vec![0u8; (width as usize) * (height as usize)];
        let mut area: u64 = 0;

        if roi.points.len() < 3 || width == 0 || height == 0 {
            return RoiMask { width, height, mask, area };
        }

        for y in 0..height as i32 {
            let mut crossings: Vec<i32> = Vec::new();
            let n = roi.points.len();
            for i in 0..n {
                let (x1, y1) = roi.points[i];
                let (x2, y2) = roi.points[(i + 1) % n];
                if (y1 <= y && y2 > y) || (y2 <= y && y1 > y) {
                    let t = (y - y1) as f64 / (y2 - y1) as f64;
                    let x_at_y = x1 as f64 + t * (x2 - x1) as f64;
                    crossings.push(x_at_y.round() as i32);
                }
            }
            crossings.sort_unstable();

            let row_offset = (y as usize) * (width as usize);
            let mut i = 0;
            while i + 1 < crossings.len() {
                let start = crossings[i].max(0);
                let end = crossings[i + 1].min(width as i32 - 1);
                if start <= end {
                    for x in start..=end {
                        mask[row_offset + x as usize] = 1;
                        area += 1;
                    }
                }
                i += 2;
            }
        }

        RoiMask { width, height, mask, area }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.mask[(y as usize) * (self.width as usize) + x as usize] != 0
    }

    /// Intersection test against a detection's bounding box: true if any
    /// pixel inside the box also falls inside the mask. Used as the
    /// cheaper fallback when a detector only has a bounding box, not a
    /// per-instance mask.
    pub fn intersects_bbox(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> bool {
        let x0 = x0.max(0) as u32;
        let y0 = y0.max(0) as u32;
        let x1 = (x1.max(0) as u32).min(self.width.saturating_sub(1));
        let y1 = (y1.max(0) as u32).min(self.height.saturating_sub(1));
        if x0 > x1 || y0 > y1 {
            return false;
        }
        for y in y0..=y1 {
            for x in x0..=x1 {
                if self.contains(x, y) {
                    return true;
                }
            }
        }
        false
    }

    /// Count mask pixels that are also set in `other`, the instance mask
    /// of a single detection. Used by the coal detector, which unions
    /// several instance masks before intersecting with the ROI.
    pub fn intersection_count(&self, other: &[u8]) -> u64 {
        self.mask
            .iter()
            .zip(other.iter())
            .filter(|(a, b)| **a != 0 && **b != 0)
            .count() as u64
    }
}

/// Per-camera cache of rasterized masks, one per named ROI ("person",
/// "coal"), rebuilt lazily when the frame size changes.
pub struct RoiMaskCache {
    reference_resolution: (u32, u32),
    definitions: std::collections::HashMap<String, Vec<(i32, i32)>>,
    masks: std::collections::HashMap<String, (u32, u32, RoiMask)>,
}

impl RoiMaskCache {
    pub fn new(reference_resolution: (u32, u32)) -> Self {
        Self {
            reference_resolution,
            definitions: std::collections::HashMap::new(),
            masks: std::collections::HashMap::new(),
        }
    }

    pub fn set_definition(&mut self, name: &str, points: Vec<(i32, i32)>) {
        self.definitions.insert(name.to_string(), points);
        self.masks.remove(name);
    }

    /// Fetch the mask for `name` at `(width, height)`, rebuilding if this
    /// is the first call or the frame size changed since the last build.
    pub fn get(&mut self, name: &str, width: u32, height: u32) -> Option<&RoiMask> {
        let points = self.definitions.get(name)?;

        let needs_rebuild = match self.masks.get(name) {
            Some((w, h, _)) => *w != width || *h != height,
            None => true,
        };

        if needs_rebuild {
            let roi = Roi::scaled(points, self.reference_resolution, width, height);
            let mask = RoiMask::rasterize(&roi, width, height);
            self.masks.insert(name.to_string(), (width, height, mask));
        }

        self.masks.get(name).map(|(_, _, mask)| mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rasterizes_a_square() {
        let roi = Roi::new(vec![(2, 2), (8, 2), (8, 8), (2, 8)]);
        let mask = RoiMask::rasterize(&roi, 10, 10);
        assert!(mask.area > 0);
        assert!(mask.contains(5, 5));
        assert!(!mask.contains(0, 0));
        assert!(!mask.contains(9, 9));
    }

    #[test]
    fn degenerate_polygon_is_empty() {
        let roi = Roi::new(vec![(1, 1), (2, 2)]);
        let mask = RoiMask::rasterize(&roi, 10, 10);
        assert_eq!(mask.area, 0);
        assert!(!mask.contains(1, 1));
    }

    #[test]
    fn scaling_is_truncating() {
        let points = vec![(393, 333)];
        let scaled = Roi::scaled(&points, (1920, 1080), 960, 540);
        assert_eq!(scaled.points[0], (196, 166));
    }

    #[test]
    fn cache_rebuilds_only_on_size_change() {
        let mut cache = RoiMaskCache::new((1920, 1080));
        cache.set_definition("person", vec![(0, 0), (100, 0), (100, 100), (0, 100)]);
        let area_first = cache.get("person", 1920, 1080).unwrap().area;
        let area_same = cache.get("person", 1920, 1080).unwrap().area;
        assert_eq!(area_first, area_same);
        let area_rescaled = cache.get("person", 960, 540).unwrap().area;
        assert!(area_rescaled < area_first);
    }

    #[test]
    fn bbox_intersection() {
        let roi = Roi::new(vec![(2, 2), (8, 2), (8, 8), (2, 8)]);
        let mask = RoiMask::rasterize(&roi, 10, 10);
        assert!(mask.intersects_bbox(5, 5, 6, 6));
        assert!(!mask.intersects_bbox(0, 0, 1, 1));
    }
}
