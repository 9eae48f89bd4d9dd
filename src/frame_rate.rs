use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Shortest elapsed time an estimate is computed from, keeps the estimate finite.
const MIN_ELAPSED: Duration = Duration::from_micros(1);
const LOG_INTERVAL: Duration = Duration::from_secs(1);

/// Frame-rate estimate recomputed from the duration of each frame's tracker
/// updates, plus a rolling average that is only used for logging.
#[derive(Debug, Clone)]
pub struct FrameRate {
    history: VecDeque<f64>,
    capacity: usize,
    logged_at: Instant,
}

impl FrameRate {
    pub fn new(hcount: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(hcount),
            capacity: hcount.max(1),
            logged_at: Instant::now(),
        }
    }

    /// Records one frame and returns its estimate, always positive and finite.
    pub fn record(&mut self, elapsed: Duration) -> f64 {
        let fps = 1.0 / elapsed.max(MIN_ELAPSED).as_secs_f64();

        if self.history.len() == self.capacity {
            self.history.pop_back();
        }
        self.history.push_front(fps);

        if self.logged_at.elapsed() > LOG_INTERVAL {
            log::debug!("tracker update rate: {:.1} FPS", self.average());
            self.logged_at = Instant::now();
        }

        fps
    }

    pub fn average(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }

        self.history.iter().sum::<f64>() / self.history.len() as f64
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::new(30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_elapsed_is_finite() {
        let mut rate = FrameRate::default();
        let fps = rate.record(Duration::ZERO);

        assert!(fps.is_finite());
        assert!(fps > 0.0);
        assert_eq!(rate.average(), fps);
    }

    #[test]
    fn estimate_from_elapsed() {
        let mut rate = FrameRate::default();

        assert!((rate.record(Duration::from_millis(20)) - 50.0).abs() < 1e-9);
        assert!((rate.record(Duration::from_millis(40)) - 25.0).abs() < 1e-9);
        assert!((rate.average() - 37.5).abs() < 1e-9);
    }

    #[test]
    fn history_is_bounded() {
        let mut rate = FrameRate::new(3);
        for ms in [10, 10, 10, 20, 20, 20] {
            rate.record(Duration::from_millis(ms));
        }

        assert!((rate.average() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn every_estimate_is_positive_and_finite() {
        let mut rate = FrameRate::new(8);
        for nanos in [0u64, 1, 999, 1_000, 33_000_000, u32::MAX as u64 * 1000] {
            let fps = rate.record(Duration::from_nanos(nanos));
            assert!(fps.is_finite() && fps > 0.0, "{} ns -> {}", nanos, fps);
        }
    }
}
