//! Frame timing and a smoothed FPS readout.

use std::time::Instant;

/// Per-frame timing with an exponential-moving-average FPS readout. Frame
/// pacing itself is left to the surface's Fifo present mode.
pub struct FrameTiming {
    /// Last frame timestamp.
    last_frame: Instant,
    /// Smoothed FPS using exponential moving average.
    smoothed_fps: f32,
    /// Smoothing factor (lower = smoother, 0.0-1.0).
    smoothing: f32,
}

impl FrameTiming {
    /// Create a new frame timer.
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            smoothed_fps: 60.0,
            smoothing: 0.05,
        }
    }

    /// Call after rendering to update timing.
    pub fn end_frame(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.last_frame = now;

        let frame_time = elapsed.as_secs_f32();
        if frame_time > 0.0 {
            let instant_fps = 1.0 / frame_time;
            self.smoothed_fps = self.smoothed_fps * (1.0 - self.smoothing)
                + instant_fps * self.smoothing;
        }
    }

    /// Get the current FPS (smoothed).
    pub fn fps(&self) -> f32 {
        self.smoothed_fps
    }
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fps_tracks_frame_cadence() {
        let mut timing = FrameTiming::new();
        std::thread::sleep(Duration::from_millis(5));
        timing.end_frame();
        // One 5ms frame pulls the 60fps prior toward 200fps.
        assert!(timing.fps() > 60.0);
        assert!(timing.fps() < 200.0);
    }
}
