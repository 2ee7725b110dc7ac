use std::collections::HashMap;

use anyhow::{anyhow, Result};

use crate::detect::result::{BoundingBox, Detection};

/// Label assigned when a class index has no entry in the label list.
pub const UNKNOWN_LABEL: &str = "unknown";

/// The first four channels of every anchor hold cx, cy, w, h.
const BOX_CHANNELS: usize = 4;

/// Resolved orientation of a raw output tensor.
///
/// Exporters do not guarantee which axis carries anchors and which carries
/// channels, so the layout is detected per decode call by comparing
/// dimension sizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputLayout {
    pub channels: usize,
    pub anchors: usize,
    /// True when the flat buffer is anchor-major (`[anchors, channels]`).
    pub anchor_major: bool,
}

impl OutputLayout {
    #[inline]
    fn at(&self, output: &[f32], anchor: usize, channel: usize) -> f32 {
        if self.anchor_major {
            output[anchor * self.channels + channel]
        } else {
            output[channel * self.anchors + anchor]
        }
    }
}

/// Determine which output axis holds anchors and which holds channels.
///
/// Accepts either the two significant dimensions directly or a shape with a
/// leading batch dimension of 1; a leading 1 is always taken as the batch
/// axis, so `[1, n]` has a single significant dimension and is rejected.
/// The larger axis is taken as the anchor count; on a tie the second axis is
/// anchors, matching the usual `[channels, anchors]` export order.
pub fn resolve_layout(dims: &[usize]) -> Result<OutputLayout> {
    let trimmed = match dims {
        [1, rest @ ..] if !rest.is_empty() => rest,
        other => other,
    };
    let (d0, d1) = match *trimmed {
        [d0, d1] => (d0, d1),
        _ => {
            return Err(anyhow!(
                "output shape must have 2 significant dimensions (plus optional batch), got {:?}",
                dims
            ))
        }
    };
    if d0 == 0 || d1 == 0 {
        return Err(anyhow!("output shape has a zero-sized dimension: {:?}", dims));
    }

    if d0 > d1 {
        Ok(OutputLayout {
            channels: d1,
            anchors: d0,
            anchor_major: true,
        })
    } else {
        Ok(OutputLayout {
            channels: d0,
            anchors: d1,
            anchor_major: false,
        })
    }
}

/// Decode raw model output into candidate detections.
///
/// `dims` describes the output tensor shape (see [`resolve_layout`]),
/// `input_size` is the model's expected input resolution used to normalize
/// pixel-unit coordinates, and `class_thresholds` optionally overrides
/// `global_threshold` per label. A detection is emitted only when its best
/// class score strictly exceeds the effective threshold.
pub fn decode(
    output: &[f32],
    dims: &[usize],
    input_size: (u32, u32),
    global_threshold: f32,
    class_thresholds: &HashMap<String, f32>,
    labels: &[String],
) -> Result<Vec<Detection>> {
    let layout = resolve_layout(dims)?;

    let expected = layout
        .channels
        .checked_mul(layout.anchors)
        .ok_or_else(|| anyhow!("output shape overflows: {:?}", dims))?;
    if output.len() < expected {
        return Err(anyhow!(
            "output buffer too short: shape {:?} needs {} values, got {}",
            dims,
            expected,
            output.len()
        ));
    }
    if input_size.0 == 0 || input_size.1 == 0 {
        return Err(anyhow!(
            "model input size must be non-zero, got {}x{}",
            input_size.0,
            input_size.1
        ));
    }

    // No class channels at all: nothing to detect.
    if layout.channels <= BOX_CHANNELS {
        return Ok(Vec::new());
    }
    let num_classes = layout.channels - BOX_CHANNELS;

    let input_w = input_size.0 as f32;
    let input_h = input_size.1 as f32;

    let mut detections = Vec::new();
    for anchor in 0..layout.anchors {
        // Max-scoring class; ties resolve to the lowest class index.
        let mut best_score = 0.0f32;
        let mut best_class = None;
        for class in 0..num_classes {
            let score = layout.at(output, anchor, BOX_CHANNELS + class);
            if score > best_score {
                best_score = score;
                best_class = Some(class);
            }
        }
        let Some(class) = best_class else { continue };

        let label = labels
            .get(class)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LABEL);
        let threshold = class_thresholds
            .get(label)
            .copied()
            .unwrap_or(global_threshold);
        if best_score <= threshold {
            continue;
        }

        let mut cx = layout.at(output, anchor, 0);
        let mut cy = layout.at(output, anchor, 1);
        let mut w = layout.at(output, anchor, 2);
        let mut h = layout.at(output, anchor, 3);

        // Some exports emit pixel-unit boxes. Anything past 1.0 cannot be a
        // normalized coordinate, so rescale by the model input resolution.
        if cx > 1.0 || cy > 1.0 || w > 1.0 || h > 1.0 {
            cx /= input_w;
            cy /= input_h;
            w /= input_w;
            h /= input_h;
        }

        let bbox = BoundingBox::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
            .clamp_unit();
        detections.push(Detection::new(bbox, label, best_score));
    }

    log::trace!(
        "decoded {} candidates from {} anchors",
        detections.len(),
        layout.anchors
    );
    Ok(detections)
}
