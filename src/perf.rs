//! Sliding-window FPS and latency bookkeeping for the detection worker.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Samples older than this fall out of the averages.
const WINDOW: Duration = Duration::from_secs(10);

/// How often the instantaneous FPS figure refreshes.
const FPS_REFRESH: Duration = Duration::from_secs(1);

/// Tracks per-frame latency samples over a 10-second sliding window.
///
/// `clear` on model/backend switch so stale samples do not blend across
/// sessions.
pub struct PerfTracker {
    samples: VecDeque<(Instant, Duration)>,
    frames_since_refresh: u32,
    last_refresh: Instant,
    current_fps: f64,
}

impl PerfTracker {
    pub fn new() -> Self {
        Self::new_at(Instant::now())
    }

    pub fn new_at(now: Instant) -> Self {
        Self {
            samples: VecDeque::new(),
            frames_since_refresh: 0,
            last_refresh: now,
            current_fps: 0.0,
        }
    }

    pub fn clear(&mut self) {
        self.clear_at(Instant::now());
    }

    pub fn clear_at(&mut self, now: Instant) {
        self.samples.clear();
        self.frames_since_refresh = 0;
        self.last_refresh = now;
        self.current_fps = 0.0;
    }

    /// Record one processed frame and its pipeline latency.
    pub fn record(&mut self, latency: Duration) {
        self.record_at(latency, Instant::now());
    }

    pub fn record_at(&mut self, latency: Duration, now: Instant) {
        self.samples.push_back((now, latency));
        while let Some((ts, _)) = self.samples.front() {
            if now.duration_since(*ts) > WINDOW {
                self.samples.pop_front();
            } else {
                break;
            }
        }

        self.frames_since_refresh += 1;
        let elapsed = now.duration_since(self.last_refresh);
        if elapsed >= FPS_REFRESH {
            self.current_fps = self.frames_since_refresh as f64 / elapsed.as_secs_f64();
            self.frames_since_refresh = 0;
            self.last_refresh = now;
        }
    }

    /// FPS over the last refresh interval (0 until the first refresh).
    pub fn current_fps(&self) -> f64 {
        self.current_fps
    }

    /// Average FPS over the sliding window.
    pub fn average_fps_at(&self, now: Instant) -> f64 {
        let Some((oldest, _)) = self.samples.front() else {
            return 0.0;
        };
        let span = now.duration_since(*oldest);
        // A near-empty window would spike the figure; pin short spans to 1s.
        let span = if span < Duration::from_millis(100) {
            Duration::from_secs(1)
        } else {
            span
        };
        self.samples.len() as f64 / span.as_secs_f64()
    }

    pub fn average_fps(&self) -> f64 {
        self.average_fps_at(Instant::now())
    }

    /// Mean pipeline latency over the sliding window.
    pub fn average_latency(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().map(|(_, lat)| *lat).sum();
        Some(total / self.samples.len() as u32)
    }
}

impl Default for PerfTracker {
    fn default() -> Self {
        Self::new()
    }
}
