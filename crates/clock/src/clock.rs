use crate::source::{SystemTimeSource, TimeSource};

/// Timing for one idle-loop iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Seconds since the previous tick, never negative.
    pub dt: f64,
    /// Frames counted in the last completed one-second window.
    pub fps: u32,
    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Frame clock over a high-resolution counter.
///
/// `start()` opens a new elapsed-time window; `tick()` closes it once more
/// than a second has passed and publishes the frame count of that window as
/// the current FPS.
#[derive(Debug, Clone)]
pub struct FrameClock<S = SystemTimeSource> {
    source: S,
    counts_per_second: f64,
    epoch: i64,
    previous: i64,
    frame_delta: f64,
    frame_count: u32,
    fps: u32,
    frame_index: u64,
}

impl FrameClock<SystemTimeSource> {
    pub fn new() -> Self {
        Self::with_source(SystemTimeSource::new())
    }
}

impl Default for FrameClock<SystemTimeSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: TimeSource> FrameClock<S> {
    /// Create a clock reading `source`. The first `frame_delta()` is measured
    /// from this call.
    pub fn with_source(source: S) -> Self {
        let now = source.counter();
        let mut clock = Self {
            source,
            counts_per_second: 1.0,
            epoch: now,
            previous: now,
            frame_delta: 0.0,
            frame_count: 0,
            fps: 0,
            frame_index: 0,
        };
        clock.start();
        clock
    }

    /// Capture the timer frequency and reset the elapsed baseline.
    pub fn start(&mut self) {
        self.counts_per_second = self.source.frequency().max(1) as f64;
        self.epoch = self.source.counter();
    }

    /// Seconds since the last `start()`.
    pub fn elapsed(&self) -> f64 {
        let ticks = self.source.counter().saturating_sub(self.epoch);
        (ticks as f64 / self.counts_per_second).max(0.0)
    }

    /// Seconds since the previous call, clamped to zero if the counter
    /// stepped backwards.
    pub fn frame_delta(&mut self) -> f64 {
        let now = self.source.counter();
        let ticks = now.saturating_sub(self.previous);
        self.previous = now;
        self.frame_delta = (ticks as f64 / self.counts_per_second).max(0.0);
        self.frame_delta
    }

    /// Advance one frame: update the FPS window, then measure the delta.
    pub fn tick(&mut self) -> FrameTick {
        self.frame_count += 1;
        if self.elapsed() > 1.0 {
            self.fps = self.frame_count;
            self.frame_count = 0;
            self.start();
            tracing::debug!(fps = self.fps, "fps window complete");
        }

        let dt = self.frame_delta();
        let tick = FrameTick {
            dt,
            fps: self.fps,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        tick
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Result of the most recent `frame_delta()`.
    pub fn last_frame_delta(&self) -> f64 {
        self.frame_delta
    }

    pub fn counts_per_second(&self) -> f64 {
        self.counts_per_second
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ManualTimeSource;

    fn manual_clock() -> (ManualTimeSource, FrameClock<ManualTimeSource>) {
        let src = ManualTimeSource::new(1000);
        let clock = FrameClock::with_source(src.clone());
        (src, clock)
    }

    #[test]
    fn first_delta_is_relative_to_construction() {
        let (src, mut clock) = manual_clock();
        src.advance(250);
        assert!((clock.frame_delta() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn backwards_timer_clamps_delta_to_zero() {
        let (src, mut clock) = manual_clock();
        src.advance(500);
        assert!(clock.frame_delta() > 0.0);
        src.advance(-800);
        assert_eq!(clock.frame_delta(), 0.0);
        assert_eq!(clock.last_frame_delta(), 0.0);
        // Measurement resumes from the regressed value.
        src.advance(100);
        assert!((clock.frame_delta() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn consecutive_deltas_without_start_are_non_negative() {
        let (src, mut clock) = manual_clock();
        for step in [30, -70, 0, 15, -1, 2] {
            src.advance(step);
            assert!(clock.frame_delta() >= 0.0);
        }
    }

    #[test]
    fn elapsed_resets_on_start() {
        let (src, mut clock) = manual_clock();
        src.advance(2000);
        assert!((clock.elapsed() - 2.0).abs() < 1e-12);
        clock.start();
        assert_eq!(clock.elapsed(), 0.0);
        src.advance(-10);
        assert_eq!(clock.elapsed(), 0.0);
    }

    #[test]
    fn fps_published_after_one_second_window() {
        let (src, mut clock) = manual_clock();
        for _ in 0..10 {
            src.advance(100);
            let tick = clock.tick();
            assert_eq!(tick.fps, 0);
            assert!((tick.dt - 0.1).abs() < 1e-12);
        }
        src.advance(100);
        let tick = clock.tick();
        assert_eq!(tick.fps, 11);
        assert_eq!(tick.frame_index, 10);
        assert_eq!(clock.elapsed(), 0.0);
    }

    #[test]
    fn system_clock_ticks() {
        let mut clock = FrameClock::new();
        let a = clock.tick();
        let b = clock.tick();
        assert!(a.dt >= 0.0 && b.dt >= 0.0);
        assert_eq!(b.frame_index, a.frame_index + 1);
    }
}
