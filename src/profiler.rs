//! Named query timers and the running total of time spent in queries.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct Profiler {
    running: HashMap<u64, Instant>,
    last_elapsed: Duration,
    total: Duration,
}

impl Profiler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the timer keyed by `id`.
    pub fn start(&mut self, id: u64) {
        self.running.insert(id, Instant::now());
    }

    /// Stop the timer keyed by `id` and add its elapsed time to the total.
    pub fn stop(&mut self, id: u64) -> Duration {
        let elapsed = self
            .running
            .remove(&id)
            .map_or(Duration::ZERO, |started| started.elapsed());
        self.last_elapsed = elapsed;
        self.total += elapsed;
        elapsed
    }

    /// Duration of the most recently stopped timer.
    #[must_use]
    pub fn last_elapsed(&self) -> Duration {
        self.last_elapsed
    }

    #[must_use]
    pub fn total(&self) -> Duration {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_accumulates_total() {
        let mut p = Profiler::new();
        p.start(1);
        std::thread::sleep(Duration::from_millis(2));
        let first = p.stop(1);
        p.start(2);
        let second = p.stop(2);
        assert!(first >= Duration::from_millis(2));
        assert_eq!(p.total(), first + second);
        assert_eq!(p.last_elapsed(), second);
    }

    #[test]
    fn unknown_timer_is_zero() {
        let mut p = Profiler::new();
        assert_eq!(p.stop(9), Duration::ZERO);
    }
}
