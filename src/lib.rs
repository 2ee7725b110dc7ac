//! Traffic Signal Kernel (TSK)
//!
//! This crate implements the post-inference pipeline that turns raw
//! object-detection model output into a stable, human-usable read of
//! traffic-light state (RED / GREEN / UNKNOWN) at camera frame rate.
//!
//! # Pipeline
//!
//! Per frame, raw model output flows through five stages:
//!
//! 1. **Decoder**: raw tensor + shape -> candidate detections
//! 2. **Suppression**: greedy NMS over overlapping candidates
//! 3. **Color Corrector**: pixel-evidence check for red/green confusion
//! 4. **Target Selector/Tracker**: one traffic-light candidate per frame,
//!    kept stable across frames via IoU matching
//! 5. **State Debouncer**: hysteresis + time-bounded persistence into a
//!    debounced state signal
//!
//! Stages 1-3 are pure; the tracker and debouncer hold small mutable state
//! owned by [`SignalPipeline`]. The pipeline runs synchronously on a single
//! worker and never blocks; frame delivery cadence is the caller's concern.
//!
//! # Module Structure
//!
//! - `detect`: decoder, output-layout resolution, NMS, detection types
//! - `color`: HSV band statistics and red/green label correction
//! - `frame`: owned RGB pixel buffer handed in by the capture layer
//! - `track`: target selection and cross-frame tracking
//! - `state`: debounced traffic-light state machine
//! - `pipeline`: facade wiring the stages together
//! - `config`: file + env configuration
//! - `perf`: sliding-window FPS/latency bookkeeping

pub mod color;
pub mod config;
pub mod detect;
pub mod frame;
pub mod perf;
pub mod pipeline;
pub mod state;
pub mod track;

pub use color::correct_colors;
pub use config::PipelineConfig;
pub use detect::{
    decode, resolve_layout, suppress, BoundingBox, Detection, OutputLayout, UNKNOWN_LABEL,
};
pub use frame::PixelBuffer;
pub use perf::PerfTracker;
pub use pipeline::{FrameVerdict, SignalPipeline};
pub use state::{StateDebouncer, TrafficLightState};
pub use track::TargetTracker;
