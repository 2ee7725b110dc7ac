//! demo - synthetic end-to-end run of the Traffic Signal Kernel
//!
//! Simulates a detection session: a red light drifts near the frame center,
//! goes briefly occluded, then turns green. Halfway through, the "model" is
//! swapped to exercise the session reset path. Prints every debounced state
//! transition plus windowed performance figures.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use signal_kernel::{PerfTracker, PipelineConfig, PixelBuffer, SignalPipeline, TrafficLightState};

const FRAME_WIDTH: u32 = 64;
const FRAME_HEIGHT: u32 = 64;
const ANCHORS: usize = 16;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of synthetic frames to process.
    #[arg(long, default_value_t = 120)]
    frames: u32,
    /// Simulated frames per second.
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Deterministic seed for box jitter.
    #[arg(long, default_value_t = 7)]
    seed: u64,
}

/// One scripted frame: which light is visible, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scene {
    Red,
    Green,
    Occluded,
}

fn scene_for(frame: u32, total: u32) -> Scene {
    // red -> brief occlusion -> red -> green for the rest
    let phase = frame * 10 / total.max(1);
    match phase {
        0..=2 => Scene::Red,
        3 => Scene::Occluded,
        4..=5 => Scene::Red,
        _ => Scene::Green,
    }
}

/// Channel-major output buffer with the scripted light in the first anchor.
fn build_output(
    cfg: &PipelineConfig,
    scene: Scene,
    rng: &mut StdRng,
) -> Option<(Vec<f32>, Vec<usize>)> {
    let label = match scene {
        Scene::Red => "red",
        Scene::Green => "green",
        Scene::Occluded => return None,
    };
    let class = cfg.labels.iter().position(|l| l == label)?;
    let channels = 4 + cfg.labels.len();

    let jitter: f32 = rng.gen_range(-0.01..0.01);
    let mut out = vec![0.0f32; channels * ANCHORS];
    out[0] = 0.5 + jitter; // cx
    out[ANCHORS] = 0.4 + jitter; // cy
    out[2 * ANCHORS] = 0.08; // w
    out[3 * ANCHORS] = 0.16; // h
    out[(4 + class) * ANCHORS] = 0.9;
    Some((out, vec![1, channels, ANCHORS]))
}

fn build_frame(scene: Scene) -> PixelBuffer {
    let lit: [u8; 3] = match scene {
        Scene::Red => [220, 30, 30],
        Scene::Green => [30, 220, 80],
        Scene::Occluded => [90, 90, 90],
    };
    PixelBuffer::from_fn(FRAME_WIDTH, FRAME_HEIGHT, move |x, y| {
        // Lamp region roughly matching the synthetic box; asphalt elsewhere.
        let in_lamp = (28..37).contains(&x) && (20..31).contains(&y);
        if in_lamp && scene != Scene::Occluded {
            lit
        } else {
            [70, 70, 70]
        }
    })
}

fn stage(name: &str) {
    println!("== {}", name);
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    if args.fps == 0 {
        return Err(anyhow!("fps must be >= 1"));
    }

    stage("load config");
    let cfg = PipelineConfig::load()?;
    println!(
        "labels: {:?}, confidence {:.2}, iou {:.2}",
        cfg.labels, cfg.confidence_threshold, cfg.iou_threshold
    );

    stage("run synthetic session");
    let mut pipeline = SignalPipeline::new(cfg.clone());
    let mut perf = PerfTracker::new();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let frame_interval = Duration::from_millis(1000 / args.fps as u64);
    let base = Instant::now();
    let empty_output = vec![0.0f32; (4 + cfg.labels.len()) * ANCHORS];
    let empty_dims = vec![1, 4 + cfg.labels.len(), ANCHORS];

    let mut last_state = TrafficLightState::Unknown;
    for frame_index in 0..args.frames {
        let now = base + frame_interval * frame_index;
        let scene = scene_for(frame_index, args.frames);
        let frame = build_frame(scene);

        let started = Instant::now();
        let verdict = match build_output(&cfg, scene, &mut rng) {
            Some((output, dims)) => pipeline.process_at(&output, &dims, &frame, now)?,
            None => pipeline.process_at(&empty_output, &empty_dims, &frame, now)?,
        };
        perf.record(started.elapsed());

        if verdict.state != last_state {
            println!(
                "frame {:>4}: {:?} -> {:?} ({} detections)",
                frame_index,
                last_state,
                verdict.state,
                verdict.detections.len()
            );
            last_state = verdict.state;
        }

        // Mid-session "model switch": tracking and stats must not leak across.
        if frame_index == args.frames / 2 {
            stage("simulate model switch");
            pipeline.reset();
            perf.clear();
            last_state = TrafficLightState::Unknown;
        }
    }

    stage("session stats");
    println!(
        "avg fps {:.2}, avg latency {:?}",
        perf.average_fps(),
        perf.average_latency().unwrap_or_default()
    );
    Ok(())
}
