//! Device capability heuristics.
//!
//! Weak devices get a cheaper backdrop rather than an error: no
//! antialiasing, pixel ratio 1, and half the frame rate.

use std::time::Duration;

/// Quality tier picked once per mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceMode {
    High,
    Low,
}

impl PerformanceMode {
    /// Inspect the running machine.
    pub fn detect() -> Self {
        let mobile = cfg!(any(target_os = "android", target_os = "ios"));
        let cores = std::thread::available_parallelism().ok().map(|n| n.get());
        Self::from_hints(mobile, cores)
    }

    /// Mobile platforms and machines with fewer than 4 logical cores are Low.
    /// An unknown core count does not count against the device.
    pub fn from_hints(mobile: bool, logical_cores: Option<usize>) -> Self {
        let low_end = logical_cores.is_some_and(|n| n < 4);
        if mobile || low_end {
            PerformanceMode::Low
        } else {
            PerformanceMode::High
        }
    }

    pub fn antialias(self) -> bool {
        self == PerformanceMode::High
    }

    /// Minimum time between rendered frames.
    pub fn frame_interval(self) -> Duration {
        match self {
            PerformanceMode::High => Duration::from_millis(16),
            PerformanceMode::Low => Duration::from_millis(33),
        }
    }

    /// Render pixel ratio for a display with the given device pixel ratio.
    pub fn pixel_ratio(self, device_pixel_ratio: f32) -> f32 {
        match self {
            PerformanceMode::High => device_pixel_ratio.clamp(1.0, 2.0),
            PerformanceMode::Low => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hints() {
        assert_eq!(PerformanceMode::from_hints(false, Some(8)), PerformanceMode::High);
        assert_eq!(PerformanceMode::from_hints(false, Some(2)), PerformanceMode::Low);
        assert_eq!(PerformanceMode::from_hints(true, Some(16)), PerformanceMode::Low);
        assert_eq!(PerformanceMode::from_hints(false, None), PerformanceMode::High);
    }

    #[test]
    fn test_low_mode_degrades() {
        let low = PerformanceMode::Low;
        assert!(!low.antialias());
        assert_eq!(low.pixel_ratio(3.0), 1.0);
        assert_eq!(low.frame_interval(), Duration::from_millis(33));

        let high = PerformanceMode::High;
        assert_eq!(high.pixel_ratio(3.0), 2.0);
        assert_eq!(high.pixel_ratio(1.5), 1.5);
    }
}
