use std::time::{Duration, Instant};

/// Resettable stopwatch used for the motion linger timer.
///
/// Accumulates elapsed time across start/stop cycles; `reset` zeroes the
/// accumulator without changing whether the watch is running.
#[derive(Debug, Default)]
pub struct Stopwatch {
    accumulated: Duration,
    started_at: Option<Instant>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or continue) measuring. No-op if already running.
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    /// Stop measuring, folding the running interval into the accumulator.
    pub fn stop(&mut self) {
        if let Some(started_at) = self.started_at.take() {
            self.accumulated += started_at.elapsed();
        }
    }

    /// Zero the accumulator. A running watch keeps running from now.
    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        let running = self
            .started_at
            .map(|started_at| started_at.elapsed())
            .unwrap_or_default();
        self.accumulated + running
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    /// Shift the measured interval backwards so timeout logic can be
    /// exercised without sleeping.
    #[cfg(test)]
    pub(crate) fn advance(&mut self, by: Duration) {
        match self.started_at {
            Some(started_at) => match started_at.checked_sub(by) {
                Some(shifted) => self.started_at = Some(shifted),
                None => self.accumulated += by,
            },
            None => self.accumulated += by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_stopwatch_reads_zero() {
        let sw = Stopwatch::new();
        assert!(!sw.is_running());
        assert_eq!(sw.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_start_stop_accumulates() {
        let mut sw = Stopwatch::new();
        sw.start();
        assert!(sw.is_running());
        sw.advance(Duration::from_secs(3));
        sw.stop();
        assert!(!sw.is_running());
        assert!(sw.elapsed_secs() >= 3.0);

        // A second interval adds on top
        sw.start();
        sw.advance(Duration::from_secs(2));
        sw.stop();
        assert!(sw.elapsed_secs() >= 5.0);
    }

    #[test]
    fn test_reset_zeroes_but_keeps_running() {
        let mut sw = Stopwatch::new();
        sw.start();
        sw.advance(Duration::from_secs(10));
        sw.reset();
        assert!(sw.is_running());
        assert!(sw.elapsed_secs() < 1.0);
    }

    #[test]
    fn test_reset_while_stopped_stays_stopped() {
        let mut sw = Stopwatch::new();
        sw.start();
        sw.advance(Duration::from_secs(4));
        sw.stop();
        sw.reset();
        assert!(!sw.is_running());
        assert_eq!(sw.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_start_is_idempotent_while_running() {
        let mut sw = Stopwatch::new();
        sw.start();
        sw.advance(Duration::from_secs(2));
        sw.start();
        assert!(sw.elapsed_secs() >= 2.0);
    }
}
