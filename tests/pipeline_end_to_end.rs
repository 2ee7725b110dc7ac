use std::time::{Duration, Instant};

use signal_kernel::{PipelineConfig, PixelBuffer, SignalPipeline, TrafficLightState};

/// More anchors than channels so the buffer resolves channel-major.
const ANCHORS: usize = 16;

/// Channel-major output buffer with one box per entry: (class, cx, cy, w, h, score).
fn tensor(entries: &[(usize, f32, f32, f32, f32, f32)], channels: usize) -> Vec<f32> {
    let mut out = vec![0.0; channels * ANCHORS];
    for (i, (class, cx, cy, w, h, score)) in entries.iter().enumerate() {
        out[i] = *cx;
        out[ANCHORS + i] = *cy;
        out[2 * ANCHORS + i] = *w;
        out[3 * ANCHORS + i] = *h;
        out[(4 + class) * ANCHORS + i] = *score;
    }
    out
}

fn solid_frame(rgb: [u8; 3]) -> PixelBuffer {
    PixelBuffer::from_fn(32, 32, move |_, _| rgb)
}

fn red_frame() -> PixelBuffer {
    solid_frame([220, 30, 30])
}

struct Session {
    pipeline: SignalPipeline,
    channels: usize,
    red_class: usize,
    green_class: usize,
    base: Instant,
    frame_index: u64,
}

impl Session {
    fn new() -> Self {
        let cfg = PipelineConfig::default();
        let channels = 4 + cfg.labels.len();
        let red_class = cfg.labels.iter().position(|l| l == "red").unwrap();
        let green_class = cfg.labels.iter().position(|l| l == "green").unwrap();
        Session {
            pipeline: SignalPipeline::new(cfg),
            channels,
            red_class,
            green_class,
            base: Instant::now(),
            frame_index: 0,
        }
    }

    /// Feed one frame at a 100 ms cadence, returning the debounced state.
    fn step(&mut self, class: Option<usize>, frame: &PixelBuffer) -> TrafficLightState {
        self.frame_index += 1;
        let now = self.base + Duration::from_millis(100 * self.frame_index);
        let buf = match class {
            Some(c) => tensor(&[(c, 0.5, 0.5, 0.3, 0.3, 0.9)], self.channels),
            None => vec![0.0; self.channels * ANCHORS],
        };
        let dims = [self.channels, ANCHORS];
        self.pipeline
            .process_at(&buf, &dims, frame, now)
            .expect("process frame")
            .state
    }
}

#[test]
fn red_light_confirms_after_three_agreeing_frames() {
    let mut session = Session::new();
    let frame = red_frame();
    let red = session.red_class;

    assert_eq!(session.step(Some(red), &frame), TrafficLightState::Unknown);
    assert_eq!(session.step(Some(red), &frame), TrafficLightState::Unknown);
    assert_eq!(session.step(Some(red), &frame), TrafficLightState::Red);
}

#[test]
fn brief_occlusion_does_not_drop_a_confirmed_state() {
    let mut session = Session::new();
    let frame = red_frame();
    let gray = solid_frame([90, 90, 90]);
    let red = session.red_class;

    for _ in 0..3 {
        session.step(Some(red), &frame);
    }
    // two empty frames, then the light is visible again
    assert_eq!(session.step(None, &gray), TrafficLightState::Red);
    assert_eq!(session.step(None, &gray), TrafficLightState::Red);
    assert_eq!(session.step(Some(red), &frame), TrafficLightState::Red);
}

#[test]
fn mislabeled_green_box_over_red_pixels_confirms_red() {
    let mut session = Session::new();
    let frame = red_frame();
    let green = session.green_class;

    // detector says green, pixels say red; the corrector flips each frame
    let mut state = TrafficLightState::Unknown;
    for _ in 0..3 {
        state = session.step(Some(green), &frame);
    }
    assert_eq!(state, TrafficLightState::Red);
}

#[test]
fn state_change_needs_its_own_confirmation_run() {
    let mut session = Session::new();
    let red_px = red_frame();
    let green_px = solid_frame([30, 220, 80]);
    let red = session.red_class;
    let green = session.green_class;

    for _ in 0..3 {
        session.step(Some(red), &red_px);
    }
    // two green frames are not enough to flip
    assert_eq!(session.step(Some(green), &green_px), TrafficLightState::Red);
    assert_eq!(session.step(Some(green), &green_px), TrafficLightState::Red);
    assert_eq!(session.step(Some(green), &green_px), TrafficLightState::Green);
}

#[test]
fn reset_discards_confirmed_state_and_candidate_run() {
    let mut session = Session::new();
    let frame = red_frame();
    let red = session.red_class;

    for _ in 0..3 {
        session.step(Some(red), &frame);
    }
    session.pipeline.reset();

    assert_eq!(session.step(Some(red), &frame), TrafficLightState::Unknown);
    assert_eq!(session.step(Some(red), &frame), TrafficLightState::Unknown);
    assert_eq!(session.step(Some(red), &frame), TrafficLightState::Red);
}

#[test]
fn tracker_follows_the_established_light_across_frames() {
    let mut session = Session::new();
    let channels = session.channels;
    let red = session.red_class;
    let green = session.green_class;
    let frame = PixelBuffer::from_fn(64, 64, |x, _| {
        // left half red, right half green
        if x < 32 {
            [220, 30, 30]
        } else {
            [30, 220, 80]
        }
    });

    // establish the red light on the left
    let established = tensor(&[(red, 0.25, 0.5, 0.2, 0.2, 0.7)], channels);
    let dims = [channels, ANCHORS];
    let base = Instant::now();
    for i in 1..=3u64 {
        let now = base + Duration::from_millis(100 * i);
        session
            .pipeline
            .process_at(&established, &dims, &frame, now)
            .expect("process frame");
    }

    // a stronger green light appears on the right; overlap keeps the red one
    let contested = tensor(
        &[
            (red, 0.25, 0.5, 0.2, 0.2, 0.7),
            (green, 0.75, 0.5, 0.2, 0.2, 0.95),
        ],
        channels,
    );
    let verdict = session
        .pipeline
        .process_at(&contested, &dims, &frame, base + Duration::from_millis(400))
        .expect("process frame");
    let (target, _) = verdict.target.expect("target present");
    assert_eq!(target.label, "red");
    assert_eq!(verdict.state, TrafficLightState::Red);
}
