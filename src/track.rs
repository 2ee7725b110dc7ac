//! Target selection and cross-frame tracking.
//!
//! Exactly one traffic-light detection per frame drives the state machine.
//! When several lights are visible, identity continuity (IoU with last
//! frame's target) wins over raw relevance score, so the selection does not
//! flicker between two candidate lights.

use crate::detect::Detection;

/// Minimum IoU for a candidate to count as the same physical light.
const TRACK_IOU_THRESHOLD: f32 = 0.5;

/// Epsilon added to the center distance so centered boxes do not divide by zero.
const CENTER_EPSILON: f32 = 0.1;

/// Relevance of a candidate: large, confident, centered lights score high.
pub fn relevance_score(det: &Detection) -> f32 {
    let dx = det.bbox.center_x() - 0.5;
    let dy = det.bbox.center_y() - 0.5;
    let dist = (dx * dx + dy * dy).sqrt();
    (det.score * det.bbox.area() * 1000.0) / (dist + CENTER_EPSILON)
}

/// Per-session tracker state: the last successfully matched detection.
#[derive(Default)]
pub struct TargetTracker {
    tracked: Option<Detection>,
}

impl TargetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the tracked target, e.g. on model or backend switch.
    pub fn reset(&mut self) {
        self.tracked = None;
    }

    /// Pick this frame's traffic-light target from the corrected detections.
    ///
    /// Returns the selection and its relevance score, or `None` when no
    /// red/green candidate exists (which also clears the tracked target).
    pub fn select_target(&mut self, detections: &[Detection]) -> Option<(Detection, f32)> {
        let lights: Vec<&Detection> = detections.iter().filter(|d| d.is_light()).collect();
        if lights.is_empty() {
            self.tracked = None;
            return None;
        }

        // Continuation: best IoU match against last frame's target.
        if let Some(prev) = &self.tracked {
            let mut best_iou = -1.0f32;
            let mut best_match: Option<&Detection> = None;
            for det in &lights {
                let iou = prev.bbox.iou(&det.bbox);
                if iou > best_iou {
                    best_iou = iou;
                    best_match = Some(det);
                }
            }
            if let Some(matched) = best_match {
                if best_iou >= TRACK_IOU_THRESHOLD {
                    // Score recomputed for display; continuity decided the pick.
                    let score = relevance_score(matched);
                    let matched = (*matched).clone();
                    self.tracked = Some(matched.clone());
                    return Some((matched, score));
                }
            }
        }

        // Fresh selection by relevance score.
        let mut best: Option<&Detection> = None;
        let mut best_score = -1.0f32;
        for det in &lights {
            let score = relevance_score(det);
            if score > best_score {
                best_score = score;
                best = Some(det);
            }
        }
        let chosen = (*best?).clone();
        self.tracked = Some(chosen.clone());
        log::debug!(
            "selected target {} (score {:.1})",
            chosen.label,
            best_score
        );
        Some((chosen, best_score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    fn light(label: &str, score: f32, l: f32, t: f32, r: f32, b: f32) -> Detection {
        Detection::new(BoundingBox::new(l, t, r, b), label, score)
    }

    #[test]
    fn picks_highest_relevance_when_untracked() {
        let mut tracker = TargetTracker::new();
        // Centered and larger beats off-center despite lower confidence.
        let centered = light("red", 0.6, 0.4, 0.4, 0.6, 0.6);
        let corner = light("green", 0.9, 0.0, 0.0, 0.05, 0.05);
        let (sel, _) = tracker
            .select_target(&[corner, centered])
            .expect("a target");
        assert_eq!(sel.label, "red");
    }

    #[test]
    fn continuation_beats_higher_scoring_rival() {
        let mut tracker = TargetTracker::new();
        let first = light("red", 0.9, 0.4, 0.4, 0.6, 0.6);
        tracker.select_target(std::slice::from_ref(&first)).unwrap();

        // Same light drifted slightly (IoU ~0.92) plus a big centered rival.
        let drifted = light("red", 0.5, 0.41, 0.41, 0.61, 0.61);
        let rival = light("green", 0.95, 0.35, 0.35, 0.75, 0.75);
        let (sel, _) = tracker.select_target(&[rival, drifted]).expect("a target");
        assert_eq!(sel.label, "red");
        assert!((sel.bbox.left - 0.41).abs() < 1e-6);
    }

    #[test]
    fn low_iou_match_falls_back_to_fresh_selection() {
        let mut tracker = TargetTracker::new();
        let first = light("red", 0.9, 0.0, 0.0, 0.1, 0.1);
        tracker.select_target(std::slice::from_ref(&first)).unwrap();

        // Far from the old target: fallback picks the best-scoring candidate.
        let new_light = light("green", 0.8, 0.45, 0.45, 0.55, 0.55);
        let (sel, _) = tracker
            .select_target(std::slice::from_ref(&new_light))
            .expect("a target");
        assert_eq!(sel.label, "green");
    }

    #[test]
    fn empty_frame_clears_tracked_target() {
        let mut tracker = TargetTracker::new();
        let first = light("red", 0.9, 0.4, 0.4, 0.6, 0.6);
        tracker.select_target(std::slice::from_ref(&first)).unwrap();

        assert!(tracker.select_target(&[]).is_none());

        // With tracking cleared, the next frame is a fresh selection even at
        // zero IoU with the old target.
        let elsewhere = light("green", 0.8, 0.8, 0.8, 0.9, 0.9);
        let (sel, _) = tracker
            .select_target(std::slice::from_ref(&elsewhere))
            .expect("a target");
        assert_eq!(sel.label, "green");
    }

    #[test]
    fn non_light_labels_are_ignored() {
        let mut tracker = TargetTracker::new();
        let car = light("car", 0.99, 0.4, 0.4, 0.6, 0.6);
        assert!(tracker.select_target(std::slice::from_ref(&car)).is_none());
    }
}
