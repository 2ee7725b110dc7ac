//! Facade wiring the per-frame stages together.
//!
//! `SignalPipeline` owns the configuration and the only two stateful
//! components (tracker, debouncer). It is designed for exactly one logical
//! caller at a time on a dedicated worker; there is no internal locking and
//! no blocking I/O. Callers that drop frames under load simply skip the
//! `process` call for that frame.

use std::time::Instant;

use anyhow::Result;

use crate::color::correct_colors;
use crate::config::PipelineConfig;
use crate::detect::{decode, suppress, Detection};
use crate::frame::PixelBuffer;
use crate::state::{StateDebouncer, TrafficLightState};
use crate::track::TargetTracker;

/// Everything the renderer needs for one frame.
pub struct FrameVerdict {
    /// Corrected detections for drawing; the selected target is flagged.
    pub detections: Vec<Detection>,
    /// Selected traffic-light candidate and its relevance score.
    pub target: Option<(Detection, f32)>,
    /// Debounced traffic-light state for the status indicator.
    pub state: TrafficLightState,
}

pub struct SignalPipeline {
    config: PipelineConfig,
    tracker: TargetTracker,
    debouncer: StateDebouncer,
}

impl SignalPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            tracker: TargetTracker::new(),
            debouncer: StateDebouncer::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline on one frame's model output and pixels.
    ///
    /// A malformed output shape is a fatal input-contract violation: the
    /// frame is not processed and no state is mutated.
    pub fn process(
        &mut self,
        output: &[f32],
        dims: &[usize],
        frame: &PixelBuffer,
    ) -> Result<FrameVerdict> {
        self.process_at(output, dims, frame, Instant::now())
    }

    /// [`SignalPipeline::process`] with an injected clock for the debouncer.
    pub fn process_at(
        &mut self,
        output: &[f32],
        dims: &[usize],
        frame: &PixelBuffer,
        now: Instant,
    ) -> Result<FrameVerdict> {
        let decoded = decode(
            output,
            dims,
            (self.config.input_width, self.config.input_height),
            self.config.confidence_threshold,
            &self.config.class_confidence,
            &self.config.labels,
        )?;
        let suppressed = suppress(decoded, self.config.iou_threshold, &self.config.class_iou);
        let mut detections = correct_colors(frame, suppressed);

        let target = self.tracker.select_target(&detections);
        if let Some((selected, score)) = &target {
            for det in detections.iter_mut() {
                if det.bbox == selected.bbox && det.label == selected.label {
                    det.is_target = true;
                    break;
                }
            }
            log::debug!(
                "frame target: {} score {:.1} ({} detections)",
                selected.label,
                score,
                detections.len()
            );
        }

        let observed = target
            .as_ref()
            .map(|(det, _)| TrafficLightState::from_label(&det.label))
            .unwrap_or(TrafficLightState::Unknown);
        let state = self.debouncer.update_at(observed, now);

        Ok(FrameVerdict {
            detections,
            target,
            state,
        })
    }

    /// Clear tracker and debouncer state, e.g. after a model or execution
    /// backend switch, so no stale cross-session state leaks through.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.debouncer.reset();
        log::info!("tracking state reset");
    }
}
