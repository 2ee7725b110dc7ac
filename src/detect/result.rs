/// Axis-aligned box in normalized coordinates relative to the analyzed frame.
///
/// Invariant: `left <= right`, `top <= bottom`, all coordinates in [0, 1].
/// The decoder enforces this via [`BoundingBox::clamp_unit`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center_x(&self) -> f32 {
        (self.left + self.right) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }

    /// Clamp all corners into [0, 1] and restore corner ordering.
    pub fn clamp_unit(self) -> Self {
        let left = self.left.clamp(0.0, 1.0);
        let top = self.top.clamp(0.0, 1.0);
        let right = self.right.clamp(0.0, 1.0);
        let bottom = self.bottom.clamp(0.0, 1.0);
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right,
            bottom,
        }
    }

    /// Intersection-over-union with another box.
    ///
    /// Non-overlapping boxes score 0. A zero union (both boxes degenerate)
    /// is defined as 0 rather than dividing by zero.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right.min(other.right);
        let bottom = self.bottom.min(other.bottom);

        if left >= right || top >= bottom {
            return 0.0;
        }

        let intersection = (right - left) * (bottom - top);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// A single labeled detection, created fresh each frame by the decoder.
///
/// The color corrector may swap the label and record a diagnostic band
/// ratio; the pipeline flags the selected target. Nothing outlives the
/// frame except the tracker's copy of the matched box.
#[derive(Clone, Debug)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub label: String,
    /// Model confidence in (0, 1].
    pub score: f32,
    /// Fraction of ROI pixels matching the decisive color band, when red/green
    /// evidence was computed for this detection.
    pub color_ratio: Option<f32>,
    /// Set when this detection is the frame's selected traffic-light target.
    pub is_target: bool,
}

impl Detection {
    pub fn new(bbox: BoundingBox, label: impl Into<String>, score: f32) -> Self {
        Self {
            bbox,
            label: label.into(),
            score,
            color_ratio: None,
            is_target: false,
        }
    }

    /// True for the two traffic-light labels the tracker cares about.
    pub fn is_light(&self) -> bool {
        self.label.eq_ignore_ascii_case("red") || self.label.eq_ignore_ascii_case("green")
    }
}
