//! Frame timing driven by host timestamps.
//!
//! Components never read the wall clock themselves. The host hands every
//! frame callback a millisecond timestamp (like `requestAnimationFrame`), and
//! the types here turn that into elapsed/delta values and a frame-rate limit.
//! Feeding timestamps in keeps every animation deterministic under test.
//!
//! # Example
//!
//! ```
//! use bioscape::time::{FrameClock, FrameThrottle};
//! use std::time::Duration;
//!
//! let mut clock = FrameClock::new();
//! let mut throttle = FrameThrottle::new(Duration::from_millis(16));
//!
//! for timestamp in [0.0, 10.0, 20.0, 40.0] {
//!     if throttle.ready(timestamp) {
//!         clock.tick(timestamp);
//!     }
//! }
//! assert_eq!(clock.frame(), 2);
//! ```

use std::time::Duration;

/// Time tracking for component animation and viewer statistics.
///
/// Provides elapsed time, delta time, frame counting, and FPS calculation,
/// all derived from the timestamps passed to [`tick`](Self::tick).
#[derive(Debug, Clone)]
pub struct FrameClock {
    /// Timestamp of the first tick, in milliseconds.
    origin_ms: Option<f64>,
    /// Timestamp of the most recent tick.
    last_ms: f64,
    /// Total elapsed time in seconds.
    elapsed_secs: f32,
    /// Time since last tick in seconds.
    delta_secs: f32,
    /// Total ticks since start.
    frame_count: u64,
    /// Calculated FPS (updated periodically).
    fps: f32,
    fps_frame_count: u64,
    fps_window_start_ms: f64,
    fps_update_interval_ms: f64,
}

impl FrameClock {
    /// Create a clock that starts counting at its first tick.
    pub fn new() -> Self {
        Self {
            origin_ms: None,
            last_ms: 0.0,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_window_start_ms: 0.0,
            fps_update_interval_ms: 500.0,
        }
    }

    /// Advance to `timestamp_ms`. Call once per rendered frame.
    ///
    /// Returns `(elapsed_time, delta_time)` in seconds. Timestamps that go
    /// backwards produce a zero delta rather than a negative one.
    pub fn tick(&mut self, timestamp_ms: f64) -> (f32, f32) {
        if self.origin_ms.is_none() {
            self.origin_ms = Some(timestamp_ms);
            self.last_ms = timestamp_ms;
            self.fps_window_start_ms = timestamp_ms;
            self.frame_count = 1;
            self.fps_frame_count = 1;
            return (self.elapsed_secs, 0.0);
        }

        self.delta_secs = ((timestamp_ms - self.last_ms).max(0.0) / 1000.0) as f32;
        self.last_ms = timestamp_ms;
        self.elapsed_secs += self.delta_secs;
        self.frame_count += 1;

        let window_ms = timestamp_ms - self.fps_window_start_ms;
        if window_ms >= self.fps_update_interval_ms {
            let frames = self.frame_count - self.fps_frame_count;
            self.fps = (frames as f64 / (window_ms / 1000.0)) as f32;
            self.fps_frame_count = self.frame_count;
            self.fps_window_start_ms = timestamp_ms;
        }

        (self.elapsed_secs, self.delta_secs)
    }

    /// Total elapsed time in seconds since the first tick.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    /// Time between the last two ticks in seconds.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Total ticks counted.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Calculated frames per second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Drops frames that arrive sooner than a minimum interval after the last
/// accepted one.
///
/// The first accepted frame is measured against timestamp 0, so a host that
/// starts its clock at 0 skips the very first callback.
#[derive(Debug, Clone)]
pub struct FrameThrottle {
    interval_ms: f64,
    last_ms: f64,
}

impl FrameThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: interval.as_secs_f64() * 1000.0,
            last_ms: 0.0,
        }
    }

    /// Returns `true` and records the timestamp when the frame should render.
    pub fn ready(&mut self, timestamp_ms: f64) -> bool {
        if timestamp_ms - self.last_ms < self.interval_ms {
            return false;
        }
        self.last_ms = timestamp_ms;
        true
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_ms / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_new() {
        let clock = FrameClock::new();
        assert_eq!(clock.frame(), 0);
        assert_eq!(clock.elapsed(), 0.0);
    }

    #[test]
    fn test_clock_tick() {
        let mut clock = FrameClock::new();
        clock.tick(1000.0);
        let (elapsed, delta) = clock.tick(1016.0);

        assert!((elapsed - 0.016).abs() < 1e-6);
        assert!((delta - 0.016).abs() < 1e-6);
        assert_eq!(clock.frame(), 2);
    }

    #[test]
    fn test_backwards_timestamp_is_zero_delta() {
        let mut clock = FrameClock::new();
        clock.tick(100.0);
        clock.tick(50.0);
        assert_eq!(clock.delta(), 0.0);
    }

    #[test]
    fn test_fps() {
        let mut clock = FrameClock::new();
        for i in 0..=60 {
            clock.tick(i as f64 * 10.0);
        }
        // 100 Hz ticks
        assert!((clock.fps() - 100.0).abs() < 1.0);
    }

    #[test]
    fn test_throttle_skips_early_frames() {
        let mut throttle = FrameThrottle::new(Duration::from_millis(16));
        assert!(!throttle.ready(0.0));
        assert!(!throttle.ready(15.0));
        assert!(throttle.ready(16.0));
        assert!(!throttle.ready(31.0));
        assert!(throttle.ready(33.0));
    }
}
