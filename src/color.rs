//! Pixel-evidence correction for red/green label confusion.
//!
//! The detection model occasionally misreads a red light as green (and vice
//! versa) under difficult lighting. This stage crops each red/green
//! detection's ROI, measures how many pixels fall into the claimed color's
//! hue/saturation/value band, and swaps the label when evidence strongly
//! contradicts it. Everything not labeled red/green passes through untouched.

use crate::detect::{BoundingBox, Detection};
use crate::frame::PixelBuffer;

/// Band fractions at or below this are "no evidence" for a color.
const EVIDENCE_FLOOR: f32 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ColorBand {
    Red,
    Green,
}

impl ColorBand {
    fn from_label(label: &str) -> Option<Self> {
        if label.eq_ignore_ascii_case("red") {
            Some(ColorBand::Red)
        } else if label.eq_ignore_ascii_case("green") {
            Some(ColorBand::Green)
        } else {
            None
        }
    }

    fn opposite(self) -> Self {
        match self {
            ColorBand::Red => ColorBand::Green,
            ColorBand::Green => ColorBand::Red,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ColorBand::Red => "red",
            ColorBand::Green => "green",
        }
    }

    /// Hue in degrees, saturation and value in [0, 1].
    fn matches(self, h: f32, s: f32, v: f32) -> bool {
        match self {
            ColorBand::Green => (50.0..=200.0).contains(&h) && s >= 0.10 && v >= 0.15,
            ColorBand::Red => (h <= 20.0 || h >= 340.0) && s >= 0.20 && v >= 0.20,
        }
    }
}

/// Validate red/green labels against pixel evidence, swapping where the
/// claimed color is absent and the opposite color is present. Cardinality,
/// ordering and scores are preserved.
pub fn correct_colors(frame: &PixelBuffer, detections: Vec<Detection>) -> Vec<Detection> {
    detections
        .into_iter()
        .map(|det| correct_one(frame, det))
        .collect()
}

fn correct_one(frame: &PixelBuffer, mut det: Detection) -> Detection {
    let Some(band) = ColorBand::from_label(&det.label) else {
        return det;
    };
    let Some(roi) = crop_region(frame, &det.bbox) else {
        return det;
    };

    let own = band_ratio(frame, roi, band);
    det.color_ratio = Some(own);

    if own <= EVIDENCE_FLOOR {
        let other = band_ratio(frame, roi, band.opposite());
        if other > EVIDENCE_FLOOR {
            log::debug!(
                "relabel {} -> {} (own ratio {:.3}, opposite {:.3})",
                det.label,
                band.opposite().label(),
                own,
                other
            );
            det.label = band.opposite().label().to_string();
            det.color_ratio = Some(other);
        }
    }
    det
}

/// Pixel-space crop for a normalized box: clamped inside the image and to
/// at least 1x1. `None` only when the frame itself is degenerate.
fn crop_region(frame: &PixelBuffer, bbox: &BoundingBox) -> Option<(u32, u32, u32, u32)> {
    if frame.width() == 0 || frame.height() == 0 {
        return None;
    }
    let fw = frame.width() as i64;
    let fh = frame.height() as i64;
    let x = ((bbox.left * fw as f32) as i64).clamp(0, fw - 1);
    let y = ((bbox.top * fh as f32) as i64).clamp(0, fh - 1);
    let w = ((bbox.width() * fw as f32) as i64).clamp(1, fw - x);
    let h = ((bbox.height() * fh as f32) as i64).clamp(1, fh - y);
    Some((x as u32, y as u32, w as u32, h as u32))
}

/// Fraction of ROI pixels inside the band.
fn band_ratio(frame: &PixelBuffer, (x, y, w, h): (u32, u32, u32, u32), band: ColorBand) -> f32 {
    let total = (w as usize) * (h as usize);
    if total == 0 {
        return 0.0;
    }
    let mut matched = 0usize;
    for row in y..y + h {
        for col in x..x + w {
            let [r, g, b] = frame.pixel(col, row);
            let (hue, sat, val) = rgb_to_hsv(r, g, b);
            if band.matches(hue, sat, val) {
                matched += 1;
            }
        }
    }
    matched as f32 / total as f32
}

fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max == 0.0 { 0.0 } else { delta / max };
    (h, s, max)
}
