use std::time::Duration;
use tokio::time::Instant;

/// Gate for upgrade probes while degraded to polling.
///
/// A probe may start only once `interval` has elapsed since the previous one.
/// With no previous probe recorded the gate is open.
pub struct ProbeTimer {
    interval: Duration,
    last_attempt: Option<Instant>,
}

impl ProbeTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_attempt: None,
        }
    }

    /// Claims a probe slot if the interval has elapsed, recording `now`
    pub fn try_begin(&mut self, now: Instant) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.last_attempt = Some(now);
        true
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_attempt {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    /// Forget the previous attempt
    pub fn reset(&mut self) {
        self.last_attempt = None;
    }

    pub fn last_attempt(&self) -> Option<Instant> {
        self.last_attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_probe_is_due() {
        let mut timer = ProbeTimer::new(Duration::from_secs(30));
        assert!(timer.try_begin(Instant::now()));
    }

    #[test]
    fn test_probe_gated_by_interval() {
        let mut timer = ProbeTimer::new(Duration::from_secs(30));
        let start = Instant::now();
        assert!(timer.try_begin(start));

        assert!(!timer.try_begin(start + Duration::from_secs(5)));
        assert!(!timer.try_begin(start + Duration::from_millis(29_999)));
        assert!(timer.try_begin(start + Duration::from_secs(30)));
        // The claimed slot restarts the interval
        assert!(!timer.try_begin(start + Duration::from_secs(31)));
        assert_eq!(timer.last_attempt(), Some(start + Duration::from_secs(30)));
    }

    #[test]
    fn test_reset_reopens_gate() {
        let mut timer = ProbeTimer::new(Duration::from_secs(30));
        let now = Instant::now();
        assert!(timer.try_begin(now));
        assert!(!timer.is_due(now));

        timer.reset();
        assert!(timer.is_due(now));
    }
}
