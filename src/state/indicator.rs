use std::time::{Duration, Instant};

/// Output line driving a player's LED.
///
/// Implementations must be cheap and non-blocking: the buzz path calls
/// [`Indicator::set`] from the edge handler.
pub trait Indicator: Send + Sync {
    /// Drive the line high (`true`) or low (`false`).
    fn set(&self, on: bool);
}

/// Timed state of one player's LED.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedTimer {
    lit: bool,
    off_at: Option<Instant>,
}

impl LedTimer {
    /// Mark the LED as lit, with an auto-off deadline when `duration` is set.
    pub fn light(&mut self, now: Instant, duration: Option<Duration>) {
        self.lit = true;
        self.off_at = duration.and_then(|duration| now.checked_add(duration));
    }

    /// Consume the deadline if it has passed. Returns `true` exactly once per
    /// deadline; the caller is then responsible for driving the line low.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.off_at {
            Some(deadline) if now >= deadline => {
                self.off_at = None;
                self.lit = false;
                true
            }
            _ => false,
        }
    }

    /// Forget any deadline and mark the LED off.
    pub fn clear(&mut self) {
        self.lit = false;
        self.off_at = None;
    }

    /// Whether the LED is currently lit.
    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Pending auto-off deadline.
    pub fn off_at(&self) -> Option<Instant> {
        self.off_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LED_DURATION: Duration = Duration::from_secs(3);

    #[test]
    fn deadline_fires_once() {
        let now = Instant::now();
        let mut led = LedTimer::default();
        led.light(now, Some(LED_DURATION));

        assert!(!led.expire(now + Duration::from_secs(1)));
        assert!(led.is_lit());
        assert!(led.expire(now + LED_DURATION));
        assert!(!led.is_lit());
        assert!(!led.expire(now + LED_DURATION * 2));
    }

    #[test]
    fn without_duration_stays_lit_until_cleared() {
        let now = Instant::now();
        let mut led = LedTimer::default();
        led.light(now, None);

        assert!(!led.expire(now + Duration::from_secs(3600)));
        assert!(led.is_lit());

        led.clear();
        assert!(!led.is_lit());
        assert_eq!(led.off_at(), None);
    }

    #[test]
    fn cleared_timer_never_expires() {
        let now = Instant::now();
        let mut led = LedTimer::default();
        led.light(now, Some(LED_DURATION));
        led.clear();
        assert!(!led.expire(now + LED_DURATION));
    }
}
