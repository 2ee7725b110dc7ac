use std::cmp::Ordering;
use std::collections::HashMap;

use crate::detect::result::Detection;

/// Greedy non-max suppression.
///
/// Sorts by descending score (stable for ties), repeatedly keeps the best
/// remaining detection and drops every other detection whose IoU with it
/// exceeds the threshold for the survivor's class (`class_thresholds`
/// override, else `default_threshold`). Single pass, no re-scoring;
/// deterministic given deterministic input order, and idempotent on its
/// own output.
pub fn suppress(
    mut detections: Vec<Detection>,
    default_threshold: f32,
    class_thresholds: &HashMap<String, f32>,
) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut survivors = Vec::with_capacity(detections.len());
    while !detections.is_empty() {
        let best = detections.remove(0);
        let threshold = class_thresholds
            .get(&best.label)
            .copied()
            .unwrap_or(default_threshold);
        detections.retain(|other| best.bbox.iou(&other.bbox) <= threshold);
        survivors.push(best);
    }
    survivors
}
